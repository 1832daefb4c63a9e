use crate::{create_mint_account::get_mint, prelude::*};
use spl_token::instruction::burn_checked;

#[derive(Debug)]
pub struct Input {
    pub fee_payer: Keypair,
    pub mint_account: Pubkey,
    /// Token account to burn from.
    pub source: Pubkey,
    pub owner: Keypair,
    /// UI amount, scaled by the mint's decimals like mint and transfer.
    pub amount: Decimal,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub amount: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub signature: Signature,
}

pub async fn run(ctx: &Context, input: Input) -> crate::Result<Output> {
    let decimals = get_mint(ctx.solana_client(), &input.mint_account)
        .await?
        .decimals;
    let amount = ui_amount_to_amount(input.amount, decimals)?;

    let ins = Instructions {
        fee_payer: input.fee_payer.pubkey(),
        signers: [input.fee_payer.insecure_clone(), input.owner.insecure_clone()].into(),
        instructions: [burn_checked(
            &spl_token::id(),
            &input.source,
            &input.mint_account,
            &input.owner.pubkey(),
            &[],
            amount,
            decimals,
        )?]
        .into(),
        minimum_balance_for_rent_exemption: 0,
    };

    let signature = ctx.execute(ins).await?;

    tracing::info!("burned {} base units from {}", amount, input.source);
    tracing::info!("burn transaction: {}", ctx.network.explorer_tx_url(signature));

    Ok(Output { amount, signature })
}
