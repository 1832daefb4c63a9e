//! The full token lifecycle as a chain of named steps.
//!
//! create mint -> payer account -> mint supply -> recipient account ->
//! transfer -> burn -> publish metadata
//!
//! Each step consumes what the previous ones produced. Nothing is rolled
//! back when a later step fails.

use crate::{
    associated_token_account, burn_token, create_mint_account, keypair,
    metadata::{create_metadata_account, PublishedMetadata, Storage, TokenMetadataInput},
    mint_token,
    prelude::*,
    transfer_token,
};
use std::future::Future;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub decimals: u8,
    pub initial_supply: Decimal,
    pub transfer_amount: Decimal,
    pub burn_amount: Decimal,
    pub publish_metadata: bool,
    pub metadata: TokenMetadataInput,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decimals: 2,
            initial_supply: Decimal::ONE_HUNDRED,
            transfer_amount: Decimal::from(50),
            burn_amount: Decimal::from(25),
            publish_metadata: true,
            metadata: TokenMetadataInput::default(),
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    #[serde_as(as = "DisplayFromStr")]
    pub identity: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub recipient: Pubkey,
    pub mint: create_mint_account::Output,
    pub payer_account: associated_token_account::Output,
    pub mint_to: mint_token::Output,
    pub recipient_account: associated_token_account::Output,
    pub transfer: transfer_token::Output,
    pub burn: burn_token::Output,
    pub metadata: Option<PublishedMetadata>,
}

/// Run `fut` as the step `name`, logging when it starts and ends.
pub async fn step<T, F>(name: &'static str, fut: F) -> crate::Result<T>
where
    F: Future<Output = crate::Result<T>>,
{
    tracing::info!(step = name, "step started");
    let result = fut.await;
    match &result {
        Ok(_) => tracing::info!(step = name, "step finished"),
        Err(error) => tracing::error!(step = name, "step failed: {}", error),
    }
    result
}

pub struct Pipeline<'a> {
    ctx: &'a Context,
    storage: Option<&'a dyn Storage>,
    config: &'a PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(ctx: &'a Context, config: &'a PipelineConfig) -> Self {
        Self {
            ctx,
            storage: None,
            config,
        }
    }

    /// Where images and metadata JSON are uploaded, required when
    /// `publish_metadata` is set.
    pub fn with_storage(mut self, storage: &'a dyn Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Run every step with `identity` as payer, mint authority and owner of
    /// the first account.
    pub async fn run(&self, identity: &Keypair) -> crate::Result<PipelineReport> {
        let ctx = self.ctx;
        let config = self.config;
        let storage = match self.storage {
            None if config.publish_metadata => {
                return Err(crate::Error::custom(anyhow::anyhow!(
                    "no storage configured for metadata"
                )))
            }
            storage => storage,
        };

        let mint = step(
            "create_mint",
            create_mint_account::run(
                ctx,
                create_mint_account::Input {
                    fee_payer: identity.insecure_clone(),
                    decimals: config.decimals,
                    mint_authority: identity.pubkey(),
                    freeze_authority: Some(identity.pubkey()),
                    mint_account: Keypair::new(),
                },
            ),
        )
        .await?;

        let payer_account = step(
            "resolve_payer_account",
            associated_token_account::run(
                ctx,
                associated_token_account::Input {
                    fee_payer: identity.insecure_clone(),
                    owner: identity.pubkey(),
                    mint_account: mint.mint_account,
                },
            ),
        )
        .await?;

        let mint_to = step(
            "mint_initial_supply",
            mint_token::run(
                ctx,
                mint_token::Input {
                    fee_payer: identity.insecure_clone(),
                    mint_authority: identity.insecure_clone(),
                    mint_account: mint.mint_account,
                    recipient: payer_account.associated_token_account,
                    amount: config.initial_supply,
                },
            ),
        )
        .await?;

        let recipient = keypair::generate_recipient();
        let recipient_account = step(
            "resolve_recipient_account",
            associated_token_account::run(
                ctx,
                associated_token_account::Input {
                    fee_payer: identity.insecure_clone(),
                    owner: recipient,
                    mint_account: mint.mint_account,
                },
            ),
        )
        .await?;

        let transfer = step(
            "transfer",
            transfer_token::run(
                ctx,
                transfer_token::Input {
                    fee_payer: identity.insecure_clone(),
                    mint_account: mint.mint_account,
                    source: payer_account.associated_token_account,
                    destination: recipient_account.associated_token_account,
                    owner: identity.insecure_clone(),
                    amount: config.transfer_amount,
                },
            ),
        )
        .await?;

        let burn = step(
            "burn",
            burn_token::run(
                ctx,
                burn_token::Input {
                    fee_payer: identity.insecure_clone(),
                    mint_account: mint.mint_account,
                    source: payer_account.associated_token_account,
                    owner: identity.insecure_clone(),
                    amount: config.burn_amount,
                },
            ),
        )
        .await?;

        let metadata = if let Some(storage) = storage.filter(|_| config.publish_metadata) {
            Some(
                step(
                    "publish_metadata",
                    create_metadata_account::run(
                        ctx,
                        storage,
                        create_metadata_account::Input {
                            fee_payer: identity.insecure_clone(),
                            mint_account: mint.mint_account,
                            metadata: config.metadata.clone(),
                        },
                    ),
                )
                .await?,
            )
        } else {
            tracing::info!("skipping metadata");
            None
        };

        Ok(PipelineReport {
            identity: identity.pubkey(),
            recipient,
            mint,
            payer_account,
            mint_to,
            recipient_account,
            transfer,
            burn,
            metadata,
        })
    }
}
