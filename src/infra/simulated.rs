//! In-process chain for the `sim` network and for tests.
//!
//! Transfers land in a mempool and are mined into the next block produced by
//! [`SimulatedChain::mine_block`]. Receipts can also be scripted directly, and
//! receipt queries can be made to fail, so confirmation handling can be
//! exercised without a node.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use color_eyre::eyre::{Result, eyre};
use tracing::debug;

use crate::domain::transaction::{Address, Receipt, ReceiptStatus, TransferRequest, TxHash};
use crate::infra::rpc::{ChainClient, WalletProvider};

#[derive(Debug, Default)]
struct State {
    chain_id: u64,
    tip: u64,
    accounts: Vec<Address>,
    balances: HashMap<Address, u128>,
    mempool: VecDeque<(TxHash, TransferRequest)>,
    receipts: HashMap<TxHash, Receipt>,
    reverting: HashSet<TxHash>,
    receipt_failures: HashMap<TxHash, u32>,
    reject_submissions: Option<String>,
    next_nonce: u64,
    receipt_queries: u64,
}

#[derive(Debug, Clone)]
pub struct SimulatedChain {
    state: Arc<Mutex<State>>,
}

impl SimulatedChain {
    pub const DEFAULT_CHAIN_ID: u64 = 1337;

    pub fn new(chain_id: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                chain_id,
                ..State::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a wallet account with an initial balance in wei.
    pub fn add_account(&self, address: Address, balance: u128) {
        let mut state = self.lock();
        if !state.accounts.contains(&address) {
            state.accounts.push(address.clone());
        }
        state.balances.insert(address, balance);
    }

    /// Remove every account, as when the user locks their wallet.
    pub fn clear_accounts(&self) {
        self.lock().accounts.clear();
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    pub fn set_tip(&self, tip: u64) {
        self.lock().tip = tip;
    }

    pub fn tip(&self) -> u64 {
        self.lock().tip
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.lock().balances.get(address).copied().unwrap_or_default()
    }

    /// Make the receipt for `hash` visible as if it had been mined.
    pub fn set_receipt(&self, hash: &TxHash, receipt: Receipt) {
        self.lock().receipts.insert(hash.clone(), receipt);
    }

    /// Mine `hash` with a failure status when it is included.
    pub fn mark_reverting(&self, hash: &TxHash) {
        self.lock().reverting.insert(hash.clone());
    }

    /// Fail the next `times` receipt queries for `hash`.
    pub fn fail_receipt_queries(&self, hash: &TxHash, times: u32) {
        self.lock().receipt_failures.insert(hash.clone(), times);
    }

    /// Reject every submission with `reason` until cleared with `None`.
    pub fn reject_submissions(&self, reason: Option<&str>) {
        self.lock().reject_submissions = reason.map(str::to_string);
    }

    pub fn mempool_len(&self) -> usize {
        self.lock().mempool.len()
    }

    /// Total receipt lookups served, including failed ones.
    pub fn receipt_queries(&self) -> u64 {
        self.lock().receipt_queries
    }

    /// Produce a block containing every mempool transaction. Returns the new
    /// tip.
    pub fn mine_block(&self) -> u64 {
        let mut state = self.lock();
        state.tip += 1;
        let block_number = state.tip;

        while let Some((hash, request)) = state.mempool.pop_front() {
            let status = if state.reverting.remove(&hash) {
                ReceiptStatus::Failure
            } else {
                let from_balance = state.balances.get(&request.from).copied().unwrap_or_default();
                if from_balance >= request.value {
                    state.balances.insert(request.from.clone(), from_balance - request.value);
                    *state.balances.entry(request.to.clone()).or_default() += request.value;
                    ReceiptStatus::Success
                } else {
                    ReceiptStatus::Failure
                }
            };
            debug!("Mined {} in block {} ({:?})", hash, block_number, status);
            state.receipts.insert(
                hash,
                Receipt {
                    status,
                    block_number,
                },
            );
        }
        block_number
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHAIN_ID)
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn get_balance(&self, address: &Address) -> Result<u128> {
        Ok(self.balance_of(address))
    }

    async fn send_transaction(&self, request: &TransferRequest) -> Result<TxHash> {
        let mut state = self.lock();
        if let Some(reason) = &state.reject_submissions {
            return Err(eyre!("{}", reason));
        }
        if !state.accounts.contains(&request.from) {
            return Err(eyre!("Unknown account {}", request.from));
        }
        let balance = state.balances.get(&request.from).copied().unwrap_or_default();
        if balance < request.value {
            return Err(eyre!("insufficient funds for transfer"));
        }

        state.next_nonce += 1;
        let hash = TxHash::new(format!("0x{:064x}", state.next_nonce));
        state.mempool.push_back((hash.clone(), request.clone()));
        Ok(hash)
    }

    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>> {
        let mut state = self.lock();
        state.receipt_queries += 1;
        if let Some(remaining) = state.receipt_failures.get_mut(hash)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(eyre!("receipt lookup for {} timed out", hash));
        }
        Ok(state.receipts.get(hash).copied())
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.tip())
    }
}

#[async_trait]
impl WalletProvider for SimulatedChain {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.accounts().await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.lock().accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.lock().chain_id)
    }
}
