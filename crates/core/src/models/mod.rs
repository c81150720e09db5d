//! Data models shared across the launcher crates

mod account;
mod api;
mod token;
mod transaction;

pub use account::ManagedAccount;
pub use api::*;
pub use token::{BuyOptions, CreateTokenOptions, LaunchContext, StrategySelection, TokenMetadata};
pub use transaction::{TransactionIntent, TxReceipt, TxStatus};
