//! Utilities shared by the token commands.
//!
//! Table of contents:
//! - [`client`]: the read/submit contract every ledger backend implements.
//! - [`config`]: network selection and explorer links.
//! - [`context`]: client + network handed to every command.
//! - [`solana`]: building, signing and submitting transactions.

pub mod client;
pub mod config;
pub mod context;
pub mod errors;
pub mod solana;

pub use client::LedgerClient;
pub use config::{Network, SolanaNet, UnknownNetwork};
pub use context::Context;
pub use errors::Error;
pub use solana::Instructions;

pub use solana_client::client_error::ClientError;
