use crate::prelude::*;
use ledger_lib::solana::is_account_already_exists;
use solana_sdk::program_pack::Pack;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::state::Account as TokenAccount;

#[derive(Debug)]
pub struct Input {
    pub fee_payer: Keypair,
    pub owner: Pubkey,
    pub mint_account: Pubkey,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Output {
    #[serde_as(as = "DisplayFromStr")]
    pub associated_token_account: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub owner: Pubkey,
    pub amount: u64,
    /// Set when this call created the account.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub signature: Option<Signature>,
}

/// Get the associated token account of `owner` for `mint_account`,
/// creating it when it does not exist yet.
pub async fn run(ctx: &Context, input: Input) -> crate::Result<Output> {
    let address = get_associated_token_address(&input.owner, &input.mint_account);

    let signature = match get_token_account(ctx.solana_client(), &address).await {
        Ok(_) => None,
        Err(crate::Error::AccountNotFound(_) | crate::Error::InvalidAccountOwner(_)) => {
            create(ctx, &input, &address).await?
        }
        Err(e) => return Err(e),
    };

    let account = get_token_account(ctx.solana_client(), &address).await?;
    if account.mint != input.mint_account {
        return Err(crate::Error::InvalidMint {
            expected: input.mint_account,
            found: account.mint,
        });
    }
    if account.owner != input.owner {
        return Err(crate::Error::InvalidOwner {
            expected: input.owner,
            found: account.owner,
        });
    }

    tracing::info!(
        "associated token account: {}",
        ctx.network.explorer_address_url(address)
    );

    Ok(Output {
        associated_token_account: address,
        mint: account.mint,
        owner: account.owner,
        amount: account.amount,
        signature,
    })
}

async fn create(ctx: &Context, input: &Input, address: &Pubkey) -> crate::Result<Option<Signature>> {
    let minimum_balance_for_rent_exemption = ctx
        .solana_client()
        .get_minimum_balance_for_rent_exemption(TokenAccount::LEN)
        .await?;

    let instruction = create_associated_token_account_idempotent(
        &input.fee_payer.pubkey(),
        &input.owner,
        &input.mint_account,
        &spl_token::id(),
    );

    let ins = Instructions {
        fee_payer: input.fee_payer.pubkey(),
        signers: [input.fee_payer.insecure_clone()].into(),
        minimum_balance_for_rent_exemption,
        instructions: [instruction].into(),
    };

    match ctx.execute(ins).await {
        Ok(signature) => {
            tracing::info!("created associated token account {}", address);
            Ok(Some(signature))
        }
        Err(ledger_lib::Error::Solana(e)) if is_account_already_exists(&e) => {
            tracing::warn!(
                "associated token account {} was created concurrently: {}",
                address,
                e
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read and unpack the token account stored at `address`.
pub async fn get_token_account(
    client: &dyn LedgerClient,
    address: &Pubkey,
) -> crate::Result<TokenAccount> {
    let account = client
        .get_account(address)
        .await?
        .ok_or(crate::Error::AccountNotFound(*address))?;

    if account.owner != spl_token::id() {
        return Err(crate::Error::InvalidAccountOwner(*address));
    }
    if account.data.len() != TokenAccount::LEN {
        return Err(crate::Error::InvalidAccountSize(*address));
    }

    Ok(TokenAccount::unpack(&account.data)?)
}
