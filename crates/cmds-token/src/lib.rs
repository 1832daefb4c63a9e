//! Token lifecycle commands: create a mint, resolve associated token
//! accounts, move balances and attach metadata.
//!
//! Every command takes a [`Context`][ledger_lib::Context] plus an `Input`
//! and returns an `Output`; [`pipeline`] chains them in order.

pub mod error;

pub mod associated_token_account;
pub mod burn_token;
pub mod create_mint_account;
pub mod keypair;
pub mod metadata;
pub mod mint_token;
pub mod pipeline;
pub mod transfer_token;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::utils::ui_amount_to_amount;
    pub use ledger_lib::{Context, Instructions, LedgerClient, Network, SolanaNet};
    pub use rust_decimal::Decimal;
    pub use serde::{Deserialize, Serialize};
    pub use serde_with::{serde_as, DisplayFromStr};
    pub use solana_sdk::{
        instruction::Instruction,
        pubkey::Pubkey,
        signature::Signature,
        signer::{keypair::Keypair, Signer},
    };
    pub use std::sync::Arc;
}
