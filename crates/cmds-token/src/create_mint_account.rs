use crate::prelude::*;
use solana_sdk::{program_pack::Pack, system_instruction};
use spl_token::state::Mint;

/// Largest precision accepted for a new mint.
pub const MAX_DECIMALS: u8 = 9;

#[derive(Debug)]
pub struct Input {
    pub fee_payer: Keypair,
    pub decimals: u8,
    pub mint_authority: Pubkey,
    pub freeze_authority: Option<Pubkey>,
    /// Fresh keypair whose address becomes the mint.
    pub mint_account: Keypair,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Output {
    #[serde_as(as = "DisplayFromStr")]
    pub mint_account: Pubkey,
    pub decimals: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub signature: Signature,
}

pub async fn run(ctx: &Context, input: Input) -> crate::Result<Output> {
    if input.decimals > MAX_DECIMALS {
        return Err(crate::Error::InvalidDecimals(input.decimals));
    }

    let minimum_balance_for_rent_exemption = ctx
        .solana_client()
        .get_minimum_balance_for_rent_exemption(Mint::LEN)
        .await?;

    let mint_account = input.mint_account.pubkey();

    let ins = Instructions {
        fee_payer: input.fee_payer.pubkey(),
        instructions: [
            system_instruction::create_account(
                &input.fee_payer.pubkey(),
                &mint_account,
                minimum_balance_for_rent_exemption,
                Mint::LEN as u64,
                &spl_token::id(),
            ),
            spl_token::instruction::initialize_mint2(
                &spl_token::id(),
                &mint_account,
                &input.mint_authority,
                input.freeze_authority.as_ref(),
                input.decimals,
            )?,
        ]
        .into(),
        signers: [input.fee_payer, input.mint_account].into(),
        minimum_balance_for_rent_exemption,
    };

    let signature = ctx.execute(ins).await?;

    tracing::info!("token mint created: {}", mint_account);
    tracing::info!("token mint: {}", ctx.network.explorer_address_url(mint_account));

    Ok(Output {
        mint_account,
        decimals: input.decimals,
        signature,
    })
}

/// Read and unpack the mint state stored at `mint_account`.
pub async fn get_mint(client: &dyn LedgerClient, mint_account: &Pubkey) -> crate::Result<Mint> {
    let account = client
        .get_account(mint_account)
        .await?
        .ok_or(crate::Error::AccountNotFound(*mint_account))?;

    if account.owner != spl_token::id() {
        return Err(crate::Error::InvalidAccountOwner(*mint_account));
    }
    if account.data.len() != Mint::LEN {
        return Err(crate::Error::InvalidAccountSize(*mint_account));
    }

    let mint = Mint::unpack(&account.data)?;
    tracing::debug!("mint info: {:?}", mint);
    Ok(mint)
}
