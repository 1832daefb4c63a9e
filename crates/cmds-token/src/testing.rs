//! In-memory ledger and storage for tests.
//!
//! [`FakeLedger`] executes the subset of system, token, associated-token and
//! token-metadata instructions the commands emit. A transaction is applied
//! to a copy of the state and committed only when every instruction
//! succeeds.

use crate::{metadata::Storage, prelude::*};
use async_trait::async_trait;
use borsh::BorshDeserialize;
use bytes::Bytes;
use mpl_token_metadata::{
    accounts::Metadata,
    instructions::{CreateMetadataAccountV3InstructionArgs, UpdateMetadataAccountV2InstructionArgs},
    types::DataV2,
};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::InstructionError,
    message::Message,
    native_token::LAMPORTS_PER_SOL,
    program_option::COption,
    program_pack::Pack,
    rent::Rent,
    system_instruction::{SystemError, SystemInstruction},
    system_program,
    transaction::{Transaction, TransactionError},
};
use spl_token::{
    error::TokenError,
    instruction::TokenInstruction,
    state::{Account as TokenAccountState, AccountState, Mint},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

const LAMPORTS_PER_SIGNATURE: u64 = 5000;
const CREATE_METADATA_ACCOUNT_V3: u8 = 33;
const UPDATE_METADATA_ACCOUNT_V2: u8 = 15;
const METADATA_ACCOUNT_LEN: usize = 679;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub data: DataV2,
    pub update_authority: Pubkey,
    pub is_mutable: bool,
    pub primary_sale_happened: bool,
}

/// What to do with the next submitted transaction.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Reject without touching the state.
    Reject(TransactionError),
    /// Apply the transaction, as if a concurrent actor submitted the same
    /// instructions first, then report `error` to the caller.
    RaceThenReject(TransactionError),
    /// Transport-level failure, nothing reaches the ledger.
    Network(String),
}

#[derive(Default, Clone)]
struct State {
    accounts: HashMap<Pubkey, Account>,
    metadata: HashMap<Pubkey, MetadataRecord>,
}

#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<State>,
    failures: Mutex<VecDeque<Failure>>,
    transactions: Mutex<Vec<Transaction>>,
    airdrop_fails: Mutex<bool>,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn context() -> (Context, Arc<Self>) {
        let ledger = Self::new();
        let ctx = Context::new(ledger.clone(), Network::default());
        (ctx, ledger)
    }

    /// New keypair holding 10 SOL.
    pub fn funded_keypair(&self) -> Keypair {
        let keypair = Keypair::new();
        self.credit(&keypair.pubkey(), 10 * LAMPORTS_PER_SOL);
        keypair
    }

    pub fn credit(&self, pubkey: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().unwrap();
        state
            .accounts
            .entry(*pubkey)
            .or_insert_with(|| Account::new(0, 0, &system_program::id()))
            .lamports += lamports;
    }

    pub fn set_account(&self, pubkey: Pubkey, account: Account) {
        self.state.lock().unwrap().accounts.insert(pubkey, account);
    }

    pub fn account(&self, pubkey: &Pubkey) -> Option<Account> {
        self.state.lock().unwrap().accounts.get(pubkey).cloned()
    }

    pub fn token_balance(&self, token_account: &Pubkey) -> u64 {
        self.account(token_account)
            .map(|a| TokenAccountState::unpack(&a.data).unwrap().amount)
            .unwrap_or(0)
    }

    pub fn mint_supply(&self, mint: &Pubkey) -> u64 {
        let account = self.account(mint).unwrap();
        Mint::unpack(&account.data).unwrap().supply
    }

    pub fn metadata(&self, mint: &Pubkey) -> Option<MetadataRecord> {
        let (address, _) = Metadata::find_pda(mint);
        self.state.lock().unwrap().metadata.get(&address).cloned()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }

    pub fn fail_next(&self, failure: Failure) {
        self.failures.lock().unwrap().push_back(failure);
    }

    pub fn fail_airdrops(&self) {
        *self.airdrop_fails.lock().unwrap() = true;
    }

    /// Store an initialized token account at `address`.
    pub fn put_token_account(&self, address: Pubkey, mint: Pubkey, owner: Pubkey, amount: u64) {
        let mut data = vec![0; TokenAccountState::LEN];
        TokenAccountState {
            mint,
            owner,
            amount,
            state: AccountState::Initialized,
            ..Default::default()
        }
        .pack_into_slice(&mut data);
        self.set_account(
            address,
            Account {
                lamports: Rent::default().minimum_balance(TokenAccountState::LEN),
                data,
                owner: spl_token::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    fn process(&self, tx: &Transaction) -> Result<(), TransactionError> {
        tx.verify()?;

        let mut state = self.state.lock().unwrap();
        let mut next = state.clone();

        let message = &tx.message;
        let payer = message.account_keys[0];
        let fee = LAMPORTS_PER_SIGNATURE * message.header.num_required_signatures as u64;
        debit(&mut next, &payer, fee).map_err(|_| TransactionError::InsufficientFundsForFee)?;

        for (index, ix) in message.instructions.iter().enumerate() {
            let program_id = message.account_keys[ix.program_id_index as usize];
            let accounts = ix
                .accounts
                .iter()
                .map(|i| (message.account_keys[*i as usize], message.is_signer(*i as usize)))
                .collect::<Vec<_>>();
            execute_instruction(&mut next, &program_id, &accounts, &ix.data)
                .map_err(|e| TransactionError::InstructionError(index as u8, e))?;
        }

        *state = next;
        Ok(())
    }
}

fn debit(state: &mut State, pubkey: &Pubkey, lamports: u64) -> Result<(), InstructionError> {
    let account = state
        .accounts
        .get_mut(pubkey)
        .ok_or(InstructionError::Custom(SystemError::ResultWithNegativeLamports as u32))?;
    account.lamports = account
        .lamports
        .checked_sub(lamports)
        .ok_or(InstructionError::Custom(SystemError::ResultWithNegativeLamports as u32))?;
    Ok(())
}

fn signer(accounts: &[(Pubkey, bool)], index: usize) -> Result<Pubkey, InstructionError> {
    let (pubkey, is_signer) = accounts
        .get(index)
        .ok_or(InstructionError::NotEnoughAccountKeys)?;
    if !is_signer {
        return Err(InstructionError::MissingRequiredSignature);
    }
    Ok(*pubkey)
}

fn key(accounts: &[(Pubkey, bool)], index: usize) -> Result<Pubkey, InstructionError> {
    accounts
        .get(index)
        .map(|(pubkey, _)| *pubkey)
        .ok_or(InstructionError::NotEnoughAccountKeys)
}

fn token_error(e: TokenError) -> InstructionError {
    InstructionError::Custom(e as u32)
}

fn load<T: Pack + solana_sdk::program_pack::IsInitialized>(
    state: &State,
    pubkey: &Pubkey,
) -> Result<T, InstructionError> {
    let account = state
        .accounts
        .get(pubkey)
        .ok_or(InstructionError::UninitializedAccount)?;
    if account.owner != spl_token::id() {
        return Err(InstructionError::IncorrectProgramId);
    }
    T::unpack(&account.data).map_err(|_| InstructionError::InvalidAccountData)
}

fn store<T: Pack>(state: &mut State, pubkey: &Pubkey, value: T) -> Result<(), InstructionError> {
    let account = state
        .accounts
        .get_mut(pubkey)
        .ok_or(InstructionError::UninitializedAccount)?;
    value.pack_into_slice(&mut account.data);
    Ok(())
}

fn execute_instruction(
    state: &mut State,
    program_id: &Pubkey,
    accounts: &[(Pubkey, bool)],
    data: &[u8],
) -> Result<(), InstructionError> {
    if *program_id == system_program::id() {
        execute_system(state, accounts, data)
    } else if *program_id == spl_token::id() {
        execute_token(state, accounts, data)
    } else if *program_id == spl_associated_token_account::id() {
        execute_associated_token(state, accounts, data)
    } else if *program_id == mpl_token_metadata::ID {
        execute_metadata(state, accounts, data)
    } else {
        Err(InstructionError::IncorrectProgramId)
    }
}

fn execute_system(
    state: &mut State,
    accounts: &[(Pubkey, bool)],
    data: &[u8],
) -> Result<(), InstructionError> {
    let ix: SystemInstruction =
        bincode::deserialize(data).map_err(|_| InstructionError::InvalidInstructionData)?;
    match ix {
        SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } => {
            let from = signer(accounts, 0)?;
            let to = signer(accounts, 1)?;
            if let Some(existing) = state.accounts.get(&to) {
                if existing.lamports > 0 || !existing.data.is_empty() {
                    return Err(InstructionError::Custom(
                        SystemError::AccountAlreadyInUse as u32,
                    ));
                }
            }
            debit(state, &from, lamports)?;
            state
                .accounts
                .insert(to, Account::new(lamports, space as usize, &owner));
            Ok(())
        }
        SystemInstruction::Transfer { lamports } => {
            let from = signer(accounts, 0)?;
            let to = key(accounts, 1)?;
            debit(state, &from, lamports)?;
            state
                .accounts
                .entry(to)
                .or_insert_with(|| Account::new(0, 0, &system_program::id()))
                .lamports += lamports;
            Ok(())
        }
        _ => Err(InstructionError::InvalidInstructionData),
    }
}

fn execute_token(
    state: &mut State,
    accounts: &[(Pubkey, bool)],
    data: &[u8],
) -> Result<(), InstructionError> {
    let ix = TokenInstruction::unpack(data).map_err(|_| InstructionError::InvalidInstructionData)?;
    match ix {
        TokenInstruction::InitializeMint2 {
            decimals,
            mint_authority,
            freeze_authority,
        } => {
            let mint = key(accounts, 0)?;
            let account = state
                .accounts
                .get(&mint)
                .ok_or(InstructionError::UninitializedAccount)?;
            if account.owner != spl_token::id() || account.data.len() != Mint::LEN {
                return Err(InstructionError::InvalidAccountData);
            }
            if Mint::unpack_unchecked(&account.data)
                .map(|m| m.is_initialized)
                .unwrap_or(false)
            {
                return Err(token_error(TokenError::AlreadyInUse));
            }
            store(
                state,
                &mint,
                Mint {
                    mint_authority: COption::Some(mint_authority),
                    supply: 0,
                    decimals,
                    is_initialized: true,
                    freeze_authority,
                },
            )
        }
        TokenInstruction::MintToChecked { amount, decimals } => {
            let mint_key = key(accounts, 0)?;
            let destination_key = key(accounts, 1)?;
            let authority = signer(accounts, 2)?;
            let mut mint: Mint = load(state, &mint_key)?;
            let mut destination: TokenAccountState = load(state, &destination_key)?;
            if mint.decimals != decimals {
                return Err(token_error(TokenError::MintDecimalsMismatch));
            }
            if mint.mint_authority != COption::Some(authority) {
                return Err(token_error(TokenError::OwnerMismatch));
            }
            if destination.mint != mint_key {
                return Err(token_error(TokenError::MintMismatch));
            }
            mint.supply = mint
                .supply
                .checked_add(amount)
                .ok_or(token_error(TokenError::Overflow))?;
            destination.amount = destination
                .amount
                .checked_add(amount)
                .ok_or(token_error(TokenError::Overflow))?;
            store(state, &mint_key, mint)?;
            store(state, &destination_key, destination)
        }
        TokenInstruction::TransferChecked { amount, decimals } => {
            let source_key = key(accounts, 0)?;
            let mint_key = key(accounts, 1)?;
            let destination_key = key(accounts, 2)?;
            let authority = signer(accounts, 3)?;
            let mint: Mint = load(state, &mint_key)?;
            let mut source: TokenAccountState = load(state, &source_key)?;
            let destination: TokenAccountState = load(state, &destination_key)?;
            if mint.decimals != decimals {
                return Err(token_error(TokenError::MintDecimalsMismatch));
            }
            if source.owner != authority {
                return Err(token_error(TokenError::OwnerMismatch));
            }
            if source.mint != mint_key || destination.mint != mint_key {
                return Err(token_error(TokenError::MintMismatch));
            }
            source.amount = source
                .amount
                .checked_sub(amount)
                .ok_or(token_error(TokenError::InsufficientFunds))?;
            store(state, &source_key, source)?;
            // source and destination may be the same account
            let mut destination: TokenAccountState = load(state, &destination_key)?;
            destination.amount = destination
                .amount
                .checked_add(amount)
                .ok_or(token_error(TokenError::Overflow))?;
            store(state, &destination_key, destination)
        }
        TokenInstruction::BurnChecked { amount, decimals } => {
            let account_key = key(accounts, 0)?;
            let mint_key = key(accounts, 1)?;
            let authority = signer(accounts, 2)?;
            let mut mint: Mint = load(state, &mint_key)?;
            let mut account: TokenAccountState = load(state, &account_key)?;
            if mint.decimals != decimals {
                return Err(token_error(TokenError::MintDecimalsMismatch));
            }
            if account.owner != authority {
                return Err(token_error(TokenError::OwnerMismatch));
            }
            if account.mint != mint_key {
                return Err(token_error(TokenError::MintMismatch));
            }
            account.amount = account
                .amount
                .checked_sub(amount)
                .ok_or(token_error(TokenError::InsufficientFunds))?;
            mint.supply = mint
                .supply
                .checked_sub(amount)
                .ok_or(token_error(TokenError::Overflow))?;
            store(state, &account_key, account)?;
            store(state, &mint_key, mint)
        }
        _ => Err(InstructionError::InvalidInstructionData),
    }
}

fn execute_associated_token(
    state: &mut State,
    accounts: &[(Pubkey, bool)],
    data: &[u8],
) -> Result<(), InstructionError> {
    let idempotent = match data {
        [] | [0] => false,
        [1] => true,
        _ => return Err(InstructionError::InvalidInstructionData),
    };
    let payer = signer(accounts, 0)?;
    let address = key(accounts, 1)?;
    let wallet = key(accounts, 2)?;
    let mint = key(accounts, 3)?;

    if address != spl_associated_token_account::get_associated_token_address(&wallet, &mint) {
        return Err(InstructionError::InvalidSeeds);
    }

    if let Some(existing) = state.accounts.get(&address) {
        if idempotent && existing.owner == spl_token::id() {
            let current = TokenAccountState::unpack(&existing.data)
                .map_err(|_| InstructionError::InvalidAccountData)?;
            if current.owner != wallet {
                return Err(InstructionError::Custom(0));
            }
            return Ok(());
        }
        return Err(InstructionError::Custom(
            SystemError::AccountAlreadyInUse as u32,
        ));
    }

    let _: Mint = load(state, &mint)?;
    let lamports = Rent::default().minimum_balance(TokenAccountState::LEN);
    debit(state, &payer, lamports)?;
    state.accounts.insert(
        address,
        Account::new(lamports, TokenAccountState::LEN, &spl_token::id()),
    );
    store(
        state,
        &address,
        TokenAccountState {
            mint,
            owner: wallet,
            amount: 0,
            state: AccountState::Initialized,
            ..Default::default()
        },
    )
}

fn execute_metadata(
    state: &mut State,
    accounts: &[(Pubkey, bool)],
    data: &[u8],
) -> Result<(), InstructionError> {
    let (discriminator, args) = data
        .split_first()
        .ok_or(InstructionError::InvalidInstructionData)?;
    match *discriminator {
        CREATE_METADATA_ACCOUNT_V3 => {
            let args = CreateMetadataAccountV3InstructionArgs::try_from_slice(args)
                .map_err(|_| InstructionError::InvalidInstructionData)?;
            let metadata = key(accounts, 0)?;
            let mint_key = key(accounts, 1)?;
            let mint_authority = signer(accounts, 2)?;
            let payer = signer(accounts, 3)?;
            let update_authority = key(accounts, 4)?;

            if metadata != Metadata::find_pda(&mint_key).0 {
                return Err(InstructionError::InvalidSeeds);
            }
            let mint: Mint = load(state, &mint_key)?;
            if mint.mint_authority != COption::Some(mint_authority) {
                return Err(InstructionError::InvalidAccountData);
            }
            if state.metadata.contains_key(&metadata) {
                return Err(InstructionError::AccountAlreadyInitialized);
            }

            let lamports = Rent::default().minimum_balance(METADATA_ACCOUNT_LEN);
            debit(state, &payer, lamports)?;
            state.accounts.insert(
                metadata,
                Account::new(lamports, METADATA_ACCOUNT_LEN, &mpl_token_metadata::ID),
            );
            state.metadata.insert(
                metadata,
                MetadataRecord {
                    data: args.data,
                    update_authority,
                    is_mutable: args.is_mutable,
                    primary_sale_happened: false,
                },
            );
            Ok(())
        }
        UPDATE_METADATA_ACCOUNT_V2 => {
            let args = UpdateMetadataAccountV2InstructionArgs::try_from_slice(args)
                .map_err(|_| InstructionError::InvalidInstructionData)?;
            let metadata = key(accounts, 0)?;
            let update_authority = signer(accounts, 1)?;
            let record = state
                .metadata
                .get_mut(&metadata)
                .ok_or(InstructionError::UninitializedAccount)?;
            if record.update_authority != update_authority || !record.is_mutable {
                return Err(InstructionError::IllegalOwner);
            }
            if let Some(data) = args.data {
                record.data = data;
            }
            if let Some(authority) = args.new_update_authority {
                record.update_authority = authority;
            }
            if let Some(primary_sale_happened) = args.primary_sale_happened {
                record.primary_sale_happened |= primary_sale_happened;
            }
            if let Some(is_mutable) = args.is_mutable {
                record.is_mutable = is_mutable;
            }
            Ok(())
        }
        _ => Err(InstructionError::InvalidInstructionData),
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, ClientError> {
        // reads and submissions suspend like a round trip would, so joined
        // callers interleave
        tokio::task::yield_now().await;
        Ok(self.account(pubkey))
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ClientError> {
        Ok(self.account(pubkey).map(|a| a.lamports).unwrap_or(0))
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ClientError> {
        Ok(Rent::default().minimum_balance(data_len))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        Ok(Hash::new_from_array([7; 32]))
    }

    async fn get_fee_for_message(&self, message: &Message) -> Result<u64, ClientError> {
        Ok(LAMPORTS_PER_SIGNATURE * message.header.num_required_signatures as u64)
    }

    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, ClientError> {
        if *self.airdrop_fails.lock().unwrap() {
            return Err(ClientErrorKind::Custom("airdrop limit reached".to_owned()).into());
        }
        self.credit(pubkey, lamports);
        Ok(Signature::new_unique())
    }

    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, ClientError> {
        tokio::task::yield_now().await;
        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(Failure::Network(message)) => {
                return Err(ClientErrorKind::Custom(message).into());
            }
            Some(Failure::Reject(error)) => return Err(error.into()),
            Some(Failure::RaceThenReject(error)) => {
                self.process(tx)?;
                return Err(error.into());
            }
            None => {}
        }
        self.process(tx)?;
        self.transactions.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }
}

/// Keeps uploads in memory, URIs are `memory://<index>`.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<Vec<(String, Bytes)>>,
}

impl MemoryStorage {
    pub fn get(&self, uri: &str) -> Option<(String, Bytes)> {
        let index = uri.strip_prefix("memory://")?.parse::<usize>().ok()?;
        self.blobs.lock().unwrap().get(index).cloned()
    }

    pub fn get_json(&self, uri: &str) -> Option<serde_json::Value> {
        let (_, data) = self.get(uri)?;
        serde_json::from_slice(&data).ok()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, data: Bytes, content_type: &str) -> crate::Result<String> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.push((content_type.to_owned(), data));
        Ok(format!("memory://{}", blobs.len() - 1))
    }
}
