use crate::{create_mint_account::get_mint, prelude::*};
use spl_token::instruction::mint_to_checked;

#[derive(Debug)]
pub struct Input {
    pub fee_payer: Keypair,
    pub mint_authority: Keypair,
    pub mint_account: Pubkey,
    /// Token account receiving the new supply.
    pub recipient: Pubkey,
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
        signers: [input.fee_payer.insecure_clone(), input.mint_authority.insecure_clone()].into(),
        instructions: [mint_to_checked(
            &spl_token::id(),
            &input.mint_account,
            &input.recipient,
            &input.mint_authority.pubkey(),
            &[],
            amount,
            decimals,
        )?]
        .into(),
        minimum_balance_for_rent_exemption: 0,
    };

    let signature = ctx.execute(ins).await?;

    tracing::info!("minted {} base units to {}", amount, input.recipient);
    tracing::info!("mint transaction: {}", ctx.network.explorer_tx_url(signature));

    Ok(Output { amount, signature })
}
