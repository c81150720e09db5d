//! Token launch inputs

use crate::options::StrategyOverrides;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Token metadata submitted to four.meme
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Total supply in whole tokens, as the API expects it
    pub total_supply: String,
    pub description: String,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Multi-wallet purchase settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyOptions {
    pub enabled: bool,
    /// Per-wallet purchase amount in wei
    pub buy_amount: U256,
}

/// Which strategy to run, with caller overrides
#[derive(Debug, Clone, Default)]
pub struct StrategySelection {
    /// `bundle`, `staggered`, or `anti-sniper`
    pub kind: String,
    pub overrides: StrategyOverrides,
}

/// Caller-facing token creation options
#[derive(Debug, Clone)]
pub struct CreateTokenOptions {
    pub metadata: TokenMetadata,
    /// Logo file to upload; ignored when `logo_url` is already set
    pub image_path: Option<PathBuf>,
    /// Pre-uploaded logo URL
    pub logo_url: Option<String>,
    pub buy: Option<BuyOptions>,
    pub strategy: Option<StrategySelection>,
}

/// Everything a strategy needs to create the token on-chain and buy it.
///
/// Produced by the engine from the four.meme creation response.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub metadata: TokenMetadata,
    /// Encoded creation argument returned by the API
    pub create_arg: Bytes,
    /// Creation signature returned by the API
    pub signature: Bytes,
    /// Deployed token address, when the API already knows it
    pub token_address: Option<Address>,
    pub buy: Option<BuyOptions>,
}
