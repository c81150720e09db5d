//! Transaction intents and receipts

use alloy::primitives::{Address, Bytes, B256, U256};

/// An intent to submit a transaction.
///
/// Immutable from the dispatcher's point of view: preparation produces a
/// filled copy and never mutates the caller's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionIntent {
    /// Recipient; `None` only makes sense for contract deployment
    pub to: Option<Address>,
    /// Optional explicit sender; normally derived from the dispatching account
    pub from: Option<Address>,
    /// Call data
    pub data: Bytes,
    /// Native value in wei
    pub value: U256,
    /// Explicit gas limit; estimated when unset
    pub gas: Option<u64>,
    /// Explicit legacy gas price; read from the network when unset
    pub gas_price: Option<u128>,
    /// Explicit EIP-1559 max fee; takes precedence over `gas_price`
    pub max_fee_per_gas: Option<u128>,
    /// Explicit EIP-1559 priority fee
    pub max_priority_fee_per_gas: Option<u128>,
    /// Explicit nonce; read from the network when unset
    pub nonce: Option<u64>,
}

impl TransactionIntent {
    /// A plain value transfer to `to`.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Default::default()
        }
    }

    /// A contract call carrying `data` and `value` to `to`.
    pub fn call(to: Address, data: Bytes, value: U256) -> Self {
        Self {
            to: Some(to),
            data,
            value,
            ..Default::default()
        }
    }

    /// Whether any fee field has been set explicitly.
    pub fn has_fee_fields(&self) -> bool {
        self.gas_price.is_some() || self.max_fee_per_gas.is_some()
    }
}

/// Terminal status of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted,
}

impl TxStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Success)
    }
}

/// Receipt for a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub block_hash: B256,
    pub status: TxStatus,
    pub from: Address,
    pub to: Option<Address>,
    /// Populated for contract-creating transactions
    pub contract_address: Option<Address>,
    pub gas_used: u64,
}
