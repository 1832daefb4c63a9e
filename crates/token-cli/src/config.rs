use cmds_token::{keypair::IdentityConfig, pipeline::PipelineConfig};
use ledger_lib::{Network, SolanaNet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub identity: IdentityConfig,
    pub bundlr: BundlrConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct NetworkConfig {
    /// Guessed from `url` when only the endpoint is given, devnet otherwise.
    pub cluster: Option<SolanaNet>,
    /// RPC endpoint, defaults to the cluster's public endpoint.
    pub url: Option<String>,
}

impl NetworkConfig {
    pub fn network(&self) -> Network {
        match (&self.url, self.cluster) {
            (None, cluster) => Network::from(cluster.unwrap_or_default()),
            (Some(url), Some(cluster)) => Network {
                url: url.clone(),
                cluster,
            },
            (Some(url), None) => {
                let cluster = SolanaNet::from_url(url).unwrap_or_else(|error| {
                    tracing::warn!("{}, using devnet for explorer links", error);
                    SolanaNet::default()
                });
                Network {
                    url: url.clone(),
                    cluster,
                }
            }
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BundlrConfig {
    /// Overrides the node picked from the cluster.
    pub node_url: Option<String>,
    pub fund: bool,
}

impl Default for BundlrConfig {
    fn default() -> Self {
        Self {
            node_url: None,
            fund: true,
        }
    }
}

/// Command-line values taking precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub cluster: Option<SolanaNet>,
    pub image: Option<PathBuf>,
}

impl Config {
    /// Read the config from `path`, `-` reads STDIN.
    /// Without a path the defaults are used.
    pub fn get_config(path: Option<&str>) -> anyhow::Result<Self> {
        let content = match path {
            None => {
                tracing::info!("no config specified, using default");
                return Ok(Self::default());
            }
            Some("-") => {
                use std::io::Read;
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
            Some(path) => std::fs::read_to_string(path)
                .map_err(|error| anyhow::anyhow!("error reading config {}: {}", path, error))?,
        };
        Self::from_toml(&content)
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).map_err(|error| anyhow::anyhow!("error parsing config: {}", error))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(cluster) = overrides.cluster {
            self.network.cluster = Some(cluster);
        }
        if let Some(url) = overrides.url {
            self.network.url = Some(url);
        }
        if let Some(image) = overrides.image {
            self.pipeline.metadata.image_path = image;
        }
    }
}
