use crate::{client::LedgerClient, errors::Error};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    rpc_request::{RpcError, RpcResponseErrorData},
    rpc_response::RpcSimulateTransactionResult,
};
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    signer::{keypair::Keypair, Signer},
    system_instruction::SystemError,
    transaction::{Transaction, TransactionError},
};

pub fn verbose_solana_error(err: &ClientError) -> String {
    use std::fmt::Write;
    if let ClientErrorKind::RpcError(RpcError::RpcResponseError {
        code,
        message,
        data,
    }) = &err.kind
    {
        let mut s = String::new();
        writeln!(s, "{} ({})", message, code).ok();
        if let RpcResponseErrorData::SendTransactionPreflightFailure(
            RpcSimulateTransactionResult {
                logs: Some(logs), ..
            },
        ) = data
        {
            for (i, log) in logs.iter().enumerate() {
                writeln!(s, "{}: {}", i + 1, log).ok();
            }
        }
        s
    } else {
        err.to_string()
    }
}

/// Whether the ledger rejected a transaction because an account it tries to
/// create is already there (or is being written by a concurrent transaction).
///
/// Custom code `0` is `SystemError::AccountAlreadyInUse` when raised by the
/// system program, but other programs reuse the code, so callers must
/// re-read the account afterwards instead of trusting this alone.
pub fn is_account_already_exists(err: &ClientError) -> bool {
    match err.get_transaction_error() {
        Some(TransactionError::AccountInUse) => true,
        Some(TransactionError::InstructionError(_, InstructionError::Custom(code))) => {
            code == SystemError::AccountAlreadyInUse as u32
        }
        Some(TransactionError::InstructionError(_, InstructionError::AccountAlreadyInitialized)) => {
            true
        }
        _ => false,
    }
}

/// A batch of instructions submitted as one atomic transaction.
#[derive(Default, Debug)]
pub struct Instructions {
    pub fee_payer: Pubkey,
    pub signers: Vec<Keypair>,
    pub instructions: Vec<Instruction>,
    /// Lamports the fee payer must hold on top of the fee, for accounts
    /// created by these instructions.
    pub minimum_balance_for_rent_exemption: u64,
}

impl Instructions {
    pub async fn execute(self, client: &dyn LedgerClient) -> Result<Signature, Error> {
        if self.instructions.is_empty() {
            return Err(Error::EmptyTransaction);
        }

        let recent_blockhash = client.get_latest_blockhash().await?;

        let message = Message::new_with_blockhash(
            &self.instructions,
            Some(&self.fee_payer),
            &recent_blockhash,
        );

        let balance = client.get_balance(&self.fee_payer).await?;
        let needed =
            self.minimum_balance_for_rent_exemption + client.get_fee_for_message(&message).await?;
        if balance < needed {
            return Err(Error::InsufficientSolanaBalance { needed, balance });
        }

        let mut tx = Transaction::new_unsigned(message);

        // the same identity often signs as payer and as authority
        let mut signers = Vec::<&Keypair>::with_capacity(self.signers.len());
        for k in &self.signers {
            if !signers.iter().any(|s| s.pubkey() == k.pubkey()) {
                signers.push(k);
            }
        }

        tx.try_sign(signers.as_slice(), recent_blockhash)?;

        let signature = client.send_and_confirm_transaction(&tx).await?;
        tracing::debug!("transaction confirmed: {}", signature);

        Ok(signature)
    }
}
