//! Wallet registry
//!
//! Sole owner of the managed signing accounts. Strategies and the
//! dispatcher never hold their own copies of account data; they look it
//! up here by address at call time.

use crate::rpc::EvmRpc;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use fourmeme_core::{Error, ManagedAccount, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

#[derive(Default)]
struct RegistryState {
    accounts: HashMap<Address, ManagedAccount>,
    signers: HashMap<Address, PrivateKeySigner>,
    /// Insertion order; determines default priority
    order: Vec<Address>,
}

/// Registry of managed signing accounts
pub struct WalletRegistry {
    rpc: Arc<dyn EvmRpc>,
    state: RwLock<RegistryState>,
}

impl WalletRegistry {
    pub fn new(rpc: Arc<dyn EvmRpc>) -> Self {
        Self {
            rpc,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Add a wallet from raw private key material.
    ///
    /// Derives the address, fetches the current balance, and stores the
    /// account with priority equal to the registry size at insertion.
    /// Malformed key material fails with [`Error::AccountInit`].
    pub async fn add_account(&self, private_key: &str, label: Option<&str>) -> Result<Address> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| Error::AccountInit(format!("bad private key material: {e}")))?;
        let address = signer.address();

        if self.contains(&address) {
            debug!(%address, "wallet already registered");
            return Ok(address);
        }

        let balance = self.rpc.balance(address).await?;

        let mut state = lock_write(&self.state);
        let priority = state.order.len();
        let account = ManagedAccount {
            address,
            label: label
                .map(str::to_string)
                .unwrap_or_else(|| ManagedAccount::short_label(&address)),
            balance,
            active: true,
            priority,
        };

        state.order.push(address);
        state.signers.insert(address, signer);
        state.accounts.insert(address, account);
        info!(%address, priority, "wallet registered");

        Ok(address)
    }

    /// Add several wallets in order. Fail-fast: the first bad key aborts
    /// the call, but wallets added before it stay registered.
    pub async fn add_accounts(
        &self,
        private_keys: &[String],
        labels: Option<&[String]>,
    ) -> Result<Vec<Address>> {
        let mut addresses = Vec::with_capacity(private_keys.len());
        for (i, key) in private_keys.iter().enumerate() {
            let label = labels.and_then(|l| l.get(i)).map(String::as_str);
            addresses.push(self.add_account(key, label).await?);
        }
        Ok(addresses)
    }

    /// All registered addresses in insertion order
    pub fn addresses(&self) -> Vec<Address> {
        lock_read(&self.state).order.clone()
    }

    /// Active addresses sorted by priority (lowest first)
    pub fn active_addresses(&self) -> Vec<Address> {
        let state = lock_read(&self.state);
        let mut active: Vec<&ManagedAccount> = state
            .accounts
            .values()
            .filter(|account| account.active)
            .collect();
        active.sort_by_key(|account| account.priority);
        active.iter().map(|account| account.address).collect()
    }

    /// The active account with the lowest priority, if any
    pub fn primary_address(&self) -> Option<Address> {
        self.active_addresses().into_iter().next()
    }

    pub fn account(&self, address: &Address) -> Option<ManagedAccount> {
        lock_read(&self.state).accounts.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        lock_read(&self.state).accounts.contains_key(address)
    }

    pub fn len(&self) -> usize {
        lock_read(&self.state).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the signer for an address (used for dispatching and for
    /// signing the four.meme login nonce)
    pub fn signer(&self, address: &Address) -> Option<PrivateKeySigner> {
        lock_read(&self.state).signers.get(address).cloned()
    }

    /// Accounts are never removed, only deactivated.
    /// Returns false when the address is unknown.
    pub fn set_active(&self, address: &Address, active: bool) -> bool {
        let mut state = lock_write(&self.state);
        match state.accounts.get_mut(address) {
            Some(account) => {
                account.active = active;
                true
            }
            None => false,
        }
    }

    /// Refresh cached balances from the chain.
    ///
    /// A failed read is logged and skipped; the returned map contains only
    /// the accounts that refreshed successfully.
    pub async fn refresh_balances(&self) -> HashMap<Address, U256> {
        let addresses = self.addresses();
        let mut balances = HashMap::with_capacity(addresses.len());

        for address in addresses {
            match self.rpc.balance(address).await {
                Ok(balance) => {
                    if let Some(account) = lock_write(&self.state).accounts.get_mut(&address) {
                        account.balance = balance;
                    }
                    balances.insert(address, balance);
                }
                Err(e) => {
                    warn!(%address, "failed to refresh balance: {e}");
                }
            }
        }

        balances
    }

    /// Live balance check against a required amount
    pub async fn has_sufficient_balance(&self, address: Address, required: U256) -> Result<bool> {
        let balance = self.rpc.balance(address).await?;
        Ok(balance >= required)
    }
}

fn lock_read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn lock_write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRpc, TEST_KEYS};

    fn registry() -> (Arc<MockRpc>, WalletRegistry) {
        let rpc = Arc::new(MockRpc::new());
        let registry = WalletRegistry::new(rpc.clone());
        (rpc, registry)
    }

    #[tokio::test]
    async fn add_account_assigns_insertion_priority() {
        let (_rpc, registry) = registry();

        let first = registry.add_account(TEST_KEYS[0], Some("primary")).await.unwrap();
        let second = registry.add_account(TEST_KEYS[1], None).await.unwrap();

        assert_eq!(registry.addresses(), vec![first, second]);
        assert_eq!(registry.account(&first).unwrap().priority, 0);
        assert_eq!(registry.account(&second).unwrap().priority, 1);
        assert_eq!(registry.account(&first).unwrap().label, "primary");
        // Default label is the shortened address
        assert!(registry.account(&second).unwrap().label.starts_with("0x"));
    }

    #[tokio::test]
    async fn add_account_rejects_bad_key_material() {
        let (_rpc, registry) = registry();
        let err = registry.add_account("not-a-key", None).await.unwrap_err();
        assert!(matches!(err, Error::AccountInit(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn add_accounts_is_fail_fast_without_rollback() {
        let (_rpc, registry) = registry();
        let keys = vec![
            TEST_KEYS[0].to_string(),
            "garbage".to_string(),
            TEST_KEYS[1].to_string(),
        ];

        let err = registry.add_accounts(&keys, None).await.unwrap_err();
        assert!(matches!(err, Error::AccountInit(_)));

        // The first wallet stays registered, the third was never reached
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn refresh_skips_failing_accounts() {
        let (rpc, registry) = registry();
        let first = registry.add_account(TEST_KEYS[0], None).await.unwrap();
        let second = registry.add_account(TEST_KEYS[1], None).await.unwrap();

        rpc.set_balance(first, U256::from(42));
        rpc.fail_balance_for(second);

        let balances = registry.refresh_balances().await;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[&first], U256::from(42));
        assert_eq!(registry.account(&first).unwrap().balance, U256::from(42));
    }

    #[tokio::test]
    async fn balance_check_reads_live_chain_state() {
        let (rpc, registry) = registry();
        let address = registry.add_account(TEST_KEYS[0], None).await.unwrap();

        rpc.set_balance(address, U256::from(500));
        assert!(registry
            .has_sufficient_balance(address, U256::from(500))
            .await
            .unwrap());
        assert!(!registry
            .has_sufficient_balance(address, U256::from(501))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn primary_is_lowest_priority_active_account() {
        let (_rpc, registry) = registry();
        let first = registry.add_account(TEST_KEYS[0], None).await.unwrap();
        let second = registry.add_account(TEST_KEYS[1], None).await.unwrap();

        assert_eq!(registry.primary_address(), Some(first));

        assert!(registry.set_active(&first, false));
        assert_eq!(registry.primary_address(), Some(second));
        assert_eq!(registry.active_addresses(), vec![second]);
        // Deactivation does not remove the record
        assert_eq!(registry.len(), 2);
    }
}
