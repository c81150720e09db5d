//! In-memory `EvmRpc` double for tests
//!
//! Behaves like an instantly-mining chain: every accepted submission gets
//! a success receipt at the current block. Failures are injected by
//! attempt index so retry behavior can be exercised.

use crate::rpc::{EvmRpc, LogEntry, LogFilter};
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use fourmeme_core::{Error, Result, TransactionIntent, TxReceipt, TxStatus};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Standard local development keys (the anvil/hardhat mnemonic accounts)
pub const TEST_KEYS: [&str; 4] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
];

/// Default mock balance: 10 native units
const DEFAULT_BALANCE_WEI: u128 = 10_000_000_000_000_000_000;

#[derive(Default)]
struct MockState {
    balances: HashMap<Address, U256>,
    balance_failures: HashSet<Address>,
    gas_estimate: Option<u64>,
    fail_estimates: bool,
    gas_price: Option<u128>,
    /// Attempt indices (0-based, across all sends) that fail
    failed_attempts: HashSet<usize>,
    fail_all_submissions: bool,
    attempts: usize,
    submissions: Vec<B256>,
    receipts: HashMap<B256, TxReceipt>,
    /// Attached to the next successful submission's receipt
    pending_contract_address: Option<Address>,
    revert_next: bool,
    logs: Vec<LogEntry>,
    code: HashMap<Address, Bytes>,
}

/// Programmable in-memory chain
pub struct MockRpc {
    state: Mutex<MockState>,
    block: AtomicU64,
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            block: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.lock().balances.insert(address, balance);
    }

    pub fn fail_balance_for(&self, address: Address) {
        self.lock().balance_failures.insert(address);
    }

    pub fn set_gas_estimate(&self, estimate: u64) {
        self.lock().gas_estimate = Some(estimate);
    }

    pub fn fail_estimates(&self, fail: bool) {
        self.lock().fail_estimates = fail;
    }

    pub fn set_gas_price(&self, price: u128) {
        self.lock().gas_price = Some(price);
    }

    /// Fail the Nth submission attempt (0-based, counting failures)
    pub fn fail_attempt(&self, index: usize) {
        self.lock().failed_attempts.insert(index);
    }

    pub fn fail_all_submissions(&self, fail: bool) {
        self.lock().fail_all_submissions = fail;
    }

    /// Attach a deployed contract address to the next accepted submission
    pub fn set_pending_contract_address(&self, address: Address) {
        self.lock().pending_contract_address = Some(address);
    }

    /// Mark the next accepted submission's receipt as reverted
    pub fn revert_next_submission(&self) {
        self.lock().revert_next = true;
    }

    pub fn push_log(&self, log: LogEntry) {
        self.lock().logs.push(log);
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.lock().code.insert(address, code);
    }

    /// Hashes of accepted submissions, in acceptance order
    pub fn submissions(&self) -> Vec<B256> {
        self.lock().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    /// Every send attempt, including rejected ones
    pub fn attempt_count(&self) -> usize {
        self.lock().attempts
    }

    pub fn current_block(&self) -> u64 {
        self.block.load(Ordering::Relaxed)
    }

    pub fn advance_block(&self, blocks: u64) {
        self.block.fetch_add(blocks, Ordering::Relaxed);
    }
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EvmRpc for MockRpc {
    async fn balance(&self, address: Address) -> Result<U256> {
        let state = self.lock();
        if state.balance_failures.contains(&address) {
            return Err(Error::Rpc(format!("injected balance failure for {address}")));
        }
        Ok(state
            .balances
            .get(&address)
            .copied()
            .unwrap_or(U256::from(DEFAULT_BALANCE_WEI)))
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64> {
        Ok(self.lock().attempts as u64)
    }

    async fn estimate_gas(&self, _intent: &TransactionIntent, _from: Address) -> Result<u64> {
        let state = self.lock();
        if state.fail_estimates {
            return Err(Error::Rpc("injected estimation failure".into()));
        }
        Ok(state.gas_estimate.unwrap_or(21_000))
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.lock().gas_price.unwrap_or(1_000_000_000))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let mut state = self.lock();
        let attempt = state.attempts;
        state.attempts += 1;

        if state.fail_all_submissions || state.failed_attempts.contains(&attempt) {
            return Err(Error::Rpc(format!("injected submission failure (attempt {attempt})")));
        }

        let hash = keccak256(raw);
        let block_number = self.block.load(Ordering::Relaxed);
        let status = if state.revert_next {
            state.revert_next = false;
            TxStatus::Reverted
        } else {
            TxStatus::Success
        };
        let contract_address = state.pending_contract_address.take();

        state.submissions.push(hash);
        state.receipts.insert(
            hash,
            TxReceipt {
                transaction_hash: hash,
                block_number,
                block_hash: B256::repeat_byte(0xBB),
                status,
                from: Address::ZERO,
                to: None,
                contract_address,
                gas_used: 21_000,
            },
        );

        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        Ok(self.lock().receipts.get(&hash).cloned())
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.block.load(Ordering::Relaxed))
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let state = self.lock();
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                filter.address.map_or(true, |a| log.address == a)
                    && filter
                        .topic0
                        .map_or(true, |t| log.topics.first() == Some(&t))
                    && filter.from_block.map_or(true, |b| log.block_number >= b)
                    && filter.to_block.map_or(true, |b| log.block_number <= b)
            })
            .cloned()
            .collect())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        Ok(self.lock().code.get(&address).cloned().unwrap_or_default())
    }
}
