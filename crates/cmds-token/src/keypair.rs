//! Loads the identity that pays for and signs every transaction.
//!
//! The secret key lives in an env var (default `PRIVATE_KEY`), either set in
//! the process environment or in a `.env`-style file. When neither has it, a
//! new keypair is generated and appended to the file.

use crate::{prelude::*, utils::sol_to_lamports};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const KEYPAIR_LENGTH: usize = 64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    pub env_file: PathBuf,
    pub var_name: String,
    /// Request an airdrop when the balance is below this many SOL.
    pub airdrop_threshold: Decimal,
    /// SOL requested per airdrop, zero disables airdrops.
    pub airdrop_amount: Decimal,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            var_name: "PRIVATE_KEY".to_owned(),
            airdrop_threshold: Decimal::ONE,
            airdrop_amount: Decimal::ONE,
        }
    }
}

/// Parse a keypair given as a JSON byte array (solana-cli format) or as a
/// base58 string.
pub fn parse_keypair(value: &str) -> Option<Keypair> {
    let value = value.trim();
    if value.starts_with('[') {
        let bytes: Vec<u8> = serde_json::from_str(value).ok()?;
        return Keypair::from_bytes(&bytes).ok();
    }

    let mut buf = [0u8; KEYPAIR_LENGTH];
    let size = bs58::decode(value).onto(&mut buf).ok()?;
    if size != KEYPAIR_LENGTH {
        return None;
    }
    Keypair::from_bytes(&buf).ok()
}

/// Variables already set in the process take precedence over the file.
fn lookup(config: &IdentityConfig) -> Option<String> {
    if let Err(error) = dotenv::from_path(&config.env_file) {
        tracing::debug!("not loading {}: {}", config.env_file.display(), error);
    }
    std::env::var(&config.var_name).ok()
}

async fn append_keypair(path: &Path, var_name: &str, keypair: &Keypair) -> crate::Result<()> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut line = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        line.push('\n');
    }
    line.push_str(&format!(
        "{}={}\n",
        var_name,
        serde_json::to_string(&keypair.to_bytes().to_vec())?
    ));

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

async fn airdrop_if_needed(
    client: &dyn LedgerClient,
    pubkey: &Pubkey,
    config: &IdentityConfig,
) -> crate::Result<()> {
    if config.airdrop_amount.is_zero() {
        return Ok(());
    }

    let threshold = sol_to_lamports(config.airdrop_threshold)?;
    let balance = client.get_balance(pubkey).await?;
    tracing::debug!("identity balance: {} lamports", balance);
    if balance >= threshold {
        return Ok(());
    }

    let lamports = sol_to_lamports(config.airdrop_amount)?;
    tracing::info!("requesting airdrop of {} lamports to {}", lamports, pubkey);
    match client.request_airdrop(pubkey, lamports).await {
        Ok(signature) => {
            tracing::info!("airdrop confirmed: {}", signature);
            Ok(())
        }
        Err(error) => {
            let balance = client.get_balance(pubkey).await?;
            if balance >= threshold {
                tracing::warn!("airdrop failed, balance is sufficient: {}", error);
                Ok(())
            } else {
                Err(error.into())
            }
        }
    }
}

/// Load the configured identity, creating and persisting one if missing,
/// and top up its balance through an airdrop when it runs low.
pub async fn load_or_create(
    client: &dyn LedgerClient,
    config: &IdentityConfig,
) -> crate::Result<Keypair> {
    let keypair = match lookup(config) {
        Some(value) => parse_keypair(&value)
            .ok_or_else(|| crate::Error::InvalidKeypair(config.var_name.clone()))?,
        None => {
            let keypair = Keypair::new();
            append_keypair(&config.env_file, &config.var_name, &keypair).await?;
            tracing::info!(
                "generated new keypair {}, saved to {}",
                keypair.pubkey(),
                config.env_file.display()
            );
            keypair
        }
    };

    tracing::info!("identity: {}", keypair.pubkey());
    airdrop_if_needed(client, &keypair.pubkey(), config).await?;
    Ok(keypair)
}

/// Throwaway owner for a second token account.
pub fn generate_recipient() -> Pubkey {
    Keypair::new().pubkey()
}
