use solana_sdk::pubkey::Pubkey;
use std::result::Result as StdResult;
use thiserror::Error as ThisError;

pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Any(#[from] anyhow::Error),
    #[error(transparent)]
    Execute(#[from] ledger_lib::Error),
    #[error("{}", ledger_lib::solana::verbose_solana_error(.0))]
    SolanaClient(#[from] solana_client::client_error::ClientError),
    #[error(transparent)]
    SolanaProgram(#[from] solana_sdk::program_error::ProgramError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Bundlr(#[from] bundlr_sdk::error::BundlrError),
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),
    #[error("account {0} is not owned by the token program")]
    InvalidAccountOwner(Pubkey),
    #[error("account {0} has an invalid size for its type")]
    InvalidAccountSize(Pubkey),
    #[error("token account mint mismatch, expected={expected}; found={found};")]
    InvalidMint { expected: Pubkey, found: Pubkey },
    #[error("token account owner mismatch, expected={expected}; found={found};")]
    InvalidOwner { expected: Pubkey, found: Pubkey },
    #[error("invalid decimals: {0}, must be at most 9")]
    InvalidDecimals(u8),
    #[error("invalid amount: {0}")]
    Amount(String),
    #[error("invalid keypair in {0}")]
    InvalidKeypair(String),
    #[error("mime type not found")]
    MimeTypeNotFound,
    #[error("bundlr isn't available on solana testnet")]
    BundlrNotAvailableOnTestnet,
    #[error("bundlr api returned an invalid response: {0}")]
    BundlrApiInvalidResponse(String),
    #[error("failed to register funding tx to bundlr. tx_id={0};")]
    BundlrTxRegisterFailed(String),
}

impl Error {
    pub fn custom<E: Into<anyhow::Error>>(e: E) -> Self {
        Error::Any(e.into())
    }
}
