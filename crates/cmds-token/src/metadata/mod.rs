//! On-chain token metadata and the off-chain JSON/image it points to.

use crate::prelude::*;
use async_trait::async_trait;
use bytes::Bytes;
use mpl_token_metadata::types::DataV2;
use std::path::{Path, PathBuf};

pub mod arweave_upload;
pub mod create_metadata_account;
pub mod update_metadata_account;

/// Off-chain blob store returning a retrievable URI per upload.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Called once before a batch of uploads totalling `total_size` bytes.
    async fn prepare(&self, _total_size: u64) -> crate::Result<()> {
        Ok(())
    }

    async fn upload(&self, data: Bytes, content_type: &str) -> crate::Result<String>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TokenMetadataInput {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image_path: PathBuf,
}

impl Default for TokenMetadataInput {
    fn default() -> Self {
        Self {
            name: "Rise".to_owned(),
            symbol: "RISE".to_owned(),
            description: "The first Rise in there and start of universe.".to_owned(),
            image_path: PathBuf::from("assets/lama.png"),
        }
    }
}

/// JSON document the on-chain `uri` points to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OffChainMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublishedMetadata {
    #[serde_as(as = "DisplayFromStr")]
    pub metadata_account: Pubkey,
    pub image_uri: String,
    pub metadata_uri: String,
    #[serde_as(as = "DisplayFromStr")]
    pub signature: Signature,
}

pub fn data_v2(input: &TokenMetadataInput, uri: String) -> DataV2 {
    DataV2 {
        name: input.name.clone(),
        symbol: input.symbol.clone(),
        uri,
        seller_fee_basis_points: 0,
        creators: None,
        collection: None,
        uses: None,
    }
}

pub(crate) struct UploadedAssets {
    pub image_uri: String,
    pub metadata_uri: String,
}

fn content_type(path: &Path) -> crate::Result<String> {
    Ok(mime_guess::from_path(path)
        .first()
        .ok_or(crate::Error::MimeTypeNotFound)?
        .to_string())
}

/// Upload the image, then the JSON document referencing it.
pub(crate) async fn upload_assets(
    storage: &dyn Storage,
    input: &TokenMetadataInput,
) -> crate::Result<UploadedAssets> {
    let content_type = content_type(&input.image_path)?;
    let image: Bytes = tokio::fs::read(&input.image_path).await?.into();

    let mut json = OffChainMetadata {
        name: input.name.clone(),
        description: input.description.clone(),
        image: String::new(),
    };
    let json_size = serde_json::to_vec(&json)?.len() as u64;
    storage.prepare(image.len() as u64 + json_size).await?;

    let image_uri = storage.upload(image, &content_type).await?;
    tracing::info!("image uploaded: {}", image_uri);

    json.image = image_uri.clone();
    let metadata_uri = storage
        .upload(serde_json::to_vec(&json)?.into(), "application/json")
        .await?;
    tracing::info!("metadata uploaded: {}", metadata_uri);

    Ok(UploadedAssets {
        image_uri,
        metadata_uri,
    })
}
