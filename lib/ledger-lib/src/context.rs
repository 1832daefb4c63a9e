//! Services and information commands use.

use crate::{client::LedgerClient, config::Network, errors::Error, solana::Instructions};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
    pub solana_client: Arc<dyn LedgerClient>,
    pub network: Network,
}

impl Context {
    pub fn new(solana_client: Arc<dyn LedgerClient>, network: Network) -> Self {
        Self {
            solana_client,
            network,
        }
    }

    /// Connect to `network.url` with `confirmed` commitment.
    pub fn from_network(network: Network) -> Self {
        let rpc = RpcClient::new_with_commitment(network.url.clone(), CommitmentConfig::confirmed());
        Self::new(Arc::new(rpc), network)
    }

    pub fn solana_client(&self) -> &dyn LedgerClient {
        self.solana_client.as_ref()
    }

    pub async fn execute(&self, instructions: Instructions) -> Result<Signature, Error> {
        instructions.execute(self.solana_client()).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}
