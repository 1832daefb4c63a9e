use crate::solana::verbose_solana_error;
use solana_client::client_error::ClientError;
use solana_sdk::signer::SignerError;
use thiserror::Error as ThisError;

/// Failure while building or submitting a transaction.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{}", verbose_solana_error(.0))]
    Solana(#[from] ClientError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("insufficient solana balance, needed={needed}; have={balance};")]
    InsufficientSolanaBalance { needed: u64, balance: u64 },
    #[error("no instructions to submit")]
    EmptyTransaction,
}
