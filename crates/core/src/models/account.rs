//! Managed account records

use alloy::primitives::{Address, U256};

/// A signing account managed by the wallet registry.
///
/// The registry is the sole owner of these records; callers always look
/// accounts up by address rather than holding their own copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedAccount {
    /// Account address (unique within the registry)
    pub address: Address,
    /// Human-readable label; defaults to a shortened address
    pub label: String,
    /// Cached balance in wei; updated only by explicit refresh calls
    pub balance: U256,
    /// Inactive accounts are skipped when building purchase batches
    pub active: bool,
    /// Lower value means earlier/primary; assigned from insertion order
    pub priority: usize,
}

impl ManagedAccount {
    /// Shortened address form used as the default label, e.g. `0x1234abcd`
    pub fn short_label(address: &Address) -> String {
        let hex = address.to_string();
        hex.chars().take(10).collect()
    }
}
