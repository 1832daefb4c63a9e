use super::Storage;
use crate::prelude::*;
use async_trait::async_trait;
use bundlr_sdk::{error::BundlrError, tags::Tag, Bundlr, Ed25519Signer};
use bytes::Bytes;

/// Node fee and JSON overhead added to every funding estimate.
const FUNDING_OFFSET: u64 = 100_000;

pub struct BundlrSigner {
    keypair: Keypair,
}

impl BundlrSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

impl bundlr_sdk::Signer for BundlrSigner {
    const SIG_TYPE: u16 = Ed25519Signer::SIG_TYPE;
    const SIG_LENGTH: u16 = Ed25519Signer::SIG_LENGTH;
    const PUB_LENGTH: u16 = Ed25519Signer::PUB_LENGTH;

    fn sign(&self, msg: Bytes) -> Result<Bytes, BundlrError> {
        let sig = self.keypair.sign_message(&msg);
        Ok(<[u8; 64]>::from(sig).to_vec().into())
    }

    fn pub_key(&self) -> Bytes {
        self.keypair.pubkey().to_bytes().to_vec().into()
    }
}

/// Default Bundlr node for a cluster.
pub fn default_node_url(cluster: SolanaNet) -> crate::Result<String> {
    match cluster {
        SolanaNet::Mainnet => Ok("https://node1.bundlr.network".to_owned()),
        SolanaNet::Devnet => Ok("https://devnet.bundlr.network".to_owned()),
        SolanaNet::Testnet => Err(crate::Error::BundlrNotAvailableOnTestnet),
    }
}

/// Stores blobs on Arweave through a Bundlr node, paid in SOL by `fee_payer`.
pub struct BundlrStorage {
    ctx: Context,
    fee_payer: Keypair,
    node_url: String,
    fund_bundlr: bool,
    http: reqwest::Client,
}

impl BundlrStorage {
    pub fn new(
        ctx: Context,
        fee_payer: Keypair,
        node_url: Option<String>,
        fund_bundlr: bool,
    ) -> crate::Result<Self> {
        let node_url = match node_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => default_node_url(ctx.network.cluster)?,
        };
        Ok(Self {
            ctx,
            fee_payer,
            node_url,
            fund_bundlr,
            http: reqwest::Client::new(),
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.node_url, path)
    }

    /// Make sure the deposit held by the node covers `size` bytes, with a
    /// 10 % margin, and top it up otherwise.
    pub async fn ensure_balance(&self, size: u64) -> crate::Result<()> {
        let price = self.price(size + FUNDING_OFFSET).await?;
        let needed = price + price / 10;
        let balance = self.balance().await?;
        tracing::debug!("bundlr balance: {}, needed: {}", balance, needed);

        match needed.checked_sub(balance) {
            Some(missing) if missing > 0 => self.deposit(missing).await,
            _ => Ok(()),
        }
    }

    async fn get_text(&self, path: &str) -> crate::Result<String> {
        let resp = self.http.get(self.endpoint(path)).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(crate::Error::BundlrApiInvalidResponse(format!(
                "{}: {}",
                status, text
            )))
        }
    }

    /// Lamports charged to store `size` bytes.
    async fn price(&self, size: u64) -> crate::Result<u64> {
        let text = self.get_text(&format!("price/solana/{}", size)).await?;
        text.trim()
            .parse()
            .map_err(|_| crate::Error::BundlrApiInvalidResponse(text.clone()))
    }

    /// Lamports `fee_payer` has deposited on the node.
    async fn balance(&self) -> crate::Result<u64> {
        #[serde_as]
        #[derive(Deserialize)]
        struct Balance {
            #[serde_as(as = "DisplayFromStr")]
            balance: u64,
        }

        let text = self
            .get_text(&format!(
                "account/balance/solana?address={}",
                self.fee_payer.pubkey()
            ))
            .await?;
        serde_json::from_str::<Balance>(&text)
            .map(|b| b.balance)
            .map_err(|_| crate::Error::BundlrApiInvalidResponse(text.clone()))
    }

    /// Wallet the node accepts SOL deposits on.
    async fn deposit_address(&self) -> crate::Result<Pubkey> {
        let info: serde_json::Value = serde_json::from_str(&self.get_text("info").await?)?;
        info.pointer("/addresses/solana")
            .and_then(|address| address.as_str())
            .and_then(|address| address.parse().ok())
            .ok_or_else(|| crate::Error::BundlrApiInvalidResponse(info.to_string()))
    }

    async fn deposit(&self, lamports: u64) -> crate::Result<()> {
        let payer = self.fee_payer.pubkey();
        let node_wallet = self.deposit_address().await?;

        let signature = self
            .ctx
            .execute(Instructions {
                fee_payer: payer,
                signers: [self.fee_payer.insecure_clone()].into(),
                instructions: [solana_sdk::system_instruction::transfer(
                    &payer,
                    &node_wallet,
                    lamports,
                )]
                .into(),
                minimum_balance_for_rent_exemption: lamports,
            })
            .await?;
        tracing::info!(
            "deposited {} lamports on {}: {}",
            lamports,
            self.node_url,
            self.ctx.network.explorer_tx_url(signature)
        );

        // the node credits the deposit once told about the transaction
        let resp = self
            .http
            .post(self.endpoint("account/balance/solana"))
            .json(&serde_json::json!({ "tx_id": signature.to_string() }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(crate::Error::BundlrTxRegisterFailed(signature.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for BundlrStorage {
    async fn prepare(&self, total_size: u64) -> crate::Result<()> {
        if self.fund_bundlr {
            self.ensure_balance(total_size).await?;
        }
        Ok(())
    }

    async fn upload(&self, data: Bytes, content_type: &str) -> crate::Result<String> {
        let client = Bundlr::new(
            self.node_url.clone(),
            "solana".to_owned(),
            "sol".to_owned(),
            BundlrSigner::new(self.fee_payer.insecure_clone()),
        );
        let tags = vec![Tag::new("Content-Type".to_owned(), content_type.to_owned())];

        // signing hashes the whole payload
        let (client, tx) = tokio::task::spawn_blocking(move || {
            let tx = client.create_transaction_with_tags(data.to_vec(), tags);
            (client, tx)
        })
        .await
        .map_err(crate::Error::custom)?;

        let response = client.send_transaction(tx).await?;
        let id = response
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| crate::Error::BundlrApiInvalidResponse(response.to_string()))?;
        tracing::debug!("uploaded {} to bundlr: {}", id, self.node_url);

        Ok(format!("https://arweave.net/{}", id))
    }
}
