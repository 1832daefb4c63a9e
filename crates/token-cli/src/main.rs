use anyhow::Context as _;
use clap::{Parser, Subcommand};
use cmds_token::{
    keypair,
    metadata::{arweave_upload::BundlrStorage, update_metadata_account},
    pipeline::{step, Pipeline},
};
use ledger_lib::{Context, SolanaNet};
use solana_sdk::{pubkey::Pubkey, signer::Signer};
use std::{path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "token-lifecycle")]
#[command(about = "Create a token, move it around and publish its metadata")]
struct Args {
    /// TOML config file, `-` reads from STDIN
    #[arg(long, global = true)]
    config: Option<String>,
    /// RPC endpoint
    #[arg(long, global = true)]
    url: Option<String>,
    /// devnet, testnet or mainnet-beta
    #[arg(long, global = true)]
    cluster: Option<SolanaNet>,
    /// Image attached to the token metadata
    #[arg(long, global = true)]
    image: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the whole lifecycle (default)
    Run,
    /// Upload new assets and update the metadata of an existing mint
    UpdateMetadata {
        #[arg(long)]
        mint: Pubkey,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        // stdout only carries the JSON output
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{:?}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::get_config(args.config.as_deref())?;
    config.apply(Overrides {
        url: args.url,
        cluster: args.cluster,
        image: args.image,
    });

    let network = config.network.network();
    tracing::info!("using {} ({})", network.url, network.cluster.as_str());
    let ctx = Context::from_network(network);

    let identity = step(
        "identity",
        keypair::load_or_create(ctx.solana_client(), &config.identity),
    )
    .await
    .context("failed to load identity")?;

    let command = args.command.unwrap_or(Command::Run);
    let needs_storage =
        matches!(command, Command::UpdateMetadata { .. }) || config.pipeline.publish_metadata;
    let storage = if needs_storage {
        Some(
            BundlrStorage::new(
                ctx.clone(),
                identity.insecure_clone(),
                config.bundlr.node_url.clone(),
                config.bundlr.fund,
            )
            .context("failed to set up bundlr")?,
        )
    } else {
        None
    };

    match command {
        Command::Run => {
            let mut pipeline = Pipeline::new(&ctx, &config.pipeline);
            if let Some(storage) = &storage {
                pipeline = pipeline.with_storage(storage);
            }
            let report = pipeline
                .run(&identity)
                .await
                .context("token lifecycle failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::UpdateMetadata { mint } => {
            let storage = storage.context("no storage")?;
            let published = step(
                "update_metadata",
                update_metadata_account::run(
                    &ctx,
                    &storage,
                    update_metadata_account::Input {
                        fee_payer: identity.insecure_clone(),
                        mint_account: mint,
                        metadata: config.pipeline.metadata.clone(),
                    },
                ),
            )
            .await
            .with_context(|| format!("failed to update metadata of {}", mint))?;
            println!("{}", serde_json::to_string_pretty(&published)?);
        }
    }

    tracing::info!("done, identity {}", identity.pubkey());
    Ok(())
}
