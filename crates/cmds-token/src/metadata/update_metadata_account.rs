use super::{data_v2, upload_assets, PublishedMetadata, Storage, TokenMetadataInput};
use crate::prelude::*;
use mpl_token_metadata::{
    accounts::Metadata,
    instructions::{UpdateMetadataAccountV2, UpdateMetadataAccountV2InstructionArgs},
};

#[derive(Debug)]
pub struct Input {
    /// Current update authority, also pays the fee.
    pub fee_payer: Keypair,
    pub mint_account: Pubkey,
    pub metadata: TokenMetadataInput,
}

/// Upload fresh assets and point an existing metadata account at them.
pub async fn run(ctx: &Context, storage: &dyn Storage, input: Input) -> crate::Result<PublishedMetadata> {
    let assets = upload_assets(storage, &input.metadata).await?;

    let (metadata_account, _) = Metadata::find_pda(&input.mint_account);
    let authority = input.fee_payer.pubkey();

    let update_ix = UpdateMetadataAccountV2 {
        metadata: metadata_account,
        update_authority: authority,
    };

    let args = UpdateMetadataAccountV2InstructionArgs {
        data: Some(data_v2(&input.metadata, assets.metadata_uri.clone())),
        new_update_authority: Some(authority),
        primary_sale_happened: Some(true),
        is_mutable: Some(true),
    };

    let signature = ctx
        .execute(Instructions {
            fee_payer: authority,
            signers: [input.fee_payer].into(),
            instructions: [update_ix.instruction(args)].into(),
            minimum_balance_for_rent_exemption: 0,
        })
        .await?;

    tracing::info!(
        "update metadata transaction: {}",
        ctx.network.explorer_tx_url(signature)
    );

    Ok(PublishedMetadata {
        metadata_account,
        image_uri: assets.image_uri,
        metadata_uri: assets.metadata_uri,
        signature,
    })
}
