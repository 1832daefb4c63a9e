use super::{data_v2, upload_assets, PublishedMetadata, Storage, TokenMetadataInput};
use crate::prelude::*;
use mpl_token_metadata::{
    accounts::Metadata,
    instructions::{CreateMetadataAccountV3, CreateMetadataAccountV3InstructionArgs},
};
use solana_sdk::system_program;

#[derive(Debug)]
pub struct Input {
    /// Pays for the account and acts as mint and update authority.
    pub fee_payer: Keypair,
    pub mint_account: Pubkey,
    pub metadata: TokenMetadataInput,
}

/// Upload the image and JSON document, then create the metadata account
/// pointing at them.
pub async fn run(ctx: &Context, storage: &dyn Storage, input: Input) -> crate::Result<PublishedMetadata> {
    let assets = upload_assets(storage, &input.metadata).await?;

    let (metadata_account, _) = Metadata::find_pda(&input.mint_account);

    let minimum_balance_for_rent_exemption = ctx
        .solana_client()
        .get_minimum_balance_for_rent_exemption(std::mem::size_of::<Metadata>())
        .await?;

    let authority = input.fee_payer.pubkey();
    let create_ix = CreateMetadataAccountV3 {
        metadata: metadata_account,
        mint: input.mint_account,
        mint_authority: authority,
        payer: authority,
        update_authority: (authority, true),
        system_program: system_program::id(),
        rent: None,
    };

    let args = CreateMetadataAccountV3InstructionArgs {
        data: data_v2(&input.metadata, assets.metadata_uri.clone()),
        is_mutable: true,
        collection_details: None,
    };

    let ins = Instructions {
        fee_payer: authority,
        signers: [input.fee_payer].into(),
        instructions: [create_ix.instruction(args)].into(),
        minimum_balance_for_rent_exemption,
    };

    let signature = ctx.execute(ins).await?;

    tracing::info!(
        "metadata account created: {}",
        ctx.network.explorer_address_url(metadata_account)
    );
    tracing::info!(
        "create metadata transaction: {}",
        ctx.network.explorer_tx_url(signature)
    );

    Ok(PublishedMetadata {
        metadata_account,
        image_uri: assets.image_uri,
        metadata_uri: assets.metadata_uri,
        signature,
    })
}
