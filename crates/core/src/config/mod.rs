//! Launcher configuration
//!
//! All runtime settings live in one immutable [`LauncherConfig`] value that
//! is loaded from the environment once and passed into constructors. No
//! module-level mutable state.

use crate::errors::{Error, Result};
use alloy::primitives::{Address, U256};
use std::time::Duration;

/// Default four.meme REST API base
pub const DEFAULT_API_BASE_URL: &str = "https://four.meme/meme-api/v1";

/// Default BSC JSON-RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://bsc-dataseed.binance.org";

/// BSC mainnet chain id
pub const DEFAULT_CHAIN_ID: u64 = 56;

/// four.meme token factory on BSC
pub const DEFAULT_FACTORY_ADDRESS: &str = "0x5c952063c7fc8610FFDB798152D69F0B9550762b";

/// Fee charged by the factory per token creation, in BNB
pub const DEFAULT_CREATE_TOKEN_FEE: &str = "0.009";

/// Default multiplier applied to gas estimates
pub const DEFAULT_GAS_MULTIPLIER: f64 = 1.2;

/// Immutable launcher configuration
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// four.meme REST API base URL
    pub api_base_url: String,
    /// BSC JSON-RPC endpoint
    pub rpc_url: String,
    /// Chain id used when signing transactions
    pub chain_id: u64,
    /// Token factory contract address
    pub factory_address: Address,
    /// Creation fee sent with the factory call, in wei
    pub create_token_fee: U256,
    /// Default multiplier applied to gas estimates
    pub default_gas_multiplier: f64,
    /// Bound on confirmation polling; `None` polls until confirmed
    pub confirmation_timeout: Option<Duration>,
    /// Private key of the primary (creator) wallet
    pub primary_wallet_key: String,
    /// Private keys of the buyer wallets, in priority order
    pub buyer_wallet_keys: Vec<String>,
}

impl LauncherConfig {
    /// Load configuration from the environment (and a `.env` file if present).
    ///
    /// `PRIMARY_WALLET_PRIVATE_KEY` is required; buyer wallets are read from
    /// `BUYER_WALLET_1_PRIVATE_KEY`, `BUYER_WALLET_2_PRIVATE_KEY`, ... until
    /// the first gap.
    pub fn from_env() -> Result<Self> {
        // Best-effort .env load; absence is not an error
        let _ = dotenvy::dotenv();

        let primary_wallet_key = std::env::var("PRIMARY_WALLET_PRIVATE_KEY")
            .map_err(|_| Error::AccountInit("PRIMARY_WALLET_PRIVATE_KEY is not set".into()))?;

        let mut buyer_wallet_keys = Vec::new();
        let mut index = 1;
        while let Ok(key) = std::env::var(format!("BUYER_WALLET_{index}_PRIVATE_KEY")) {
            buyer_wallet_keys.push(key);
            index += 1;
        }

        let api_base_url = std::env::var("FOURMEME_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let rpc_url =
            std::env::var("BSC_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());

        let chain_id = match std::env::var("BSC_CHAIN_ID") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| Error::InvalidData(format!("BSC_CHAIN_ID: {e}")))?,
            Err(_) => DEFAULT_CHAIN_ID,
        };

        let factory_address = std::env::var("FACTORY_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_FACTORY_ADDRESS.to_string())
            .parse::<Address>()
            .map_err(|e| Error::InvalidData(format!("FACTORY_ADDRESS: {e}")))?;

        let create_token_fee = parse_native_amount(
            &std::env::var("CREATE_TOKEN_FEE")
                .unwrap_or_else(|_| DEFAULT_CREATE_TOKEN_FEE.to_string()),
        )?;

        let default_gas_multiplier = match std::env::var("GAS_MULTIPLIER") {
            Ok(raw) => raw
                .parse::<f64>()
                .map_err(|e| Error::InvalidData(format!("GAS_MULTIPLIER: {e}")))?,
            Err(_) => DEFAULT_GAS_MULTIPLIER,
        };

        // Unset keeps the legacy poll-until-confirmed behavior
        let confirmation_timeout = match std::env::var("CONFIRMATION_TIMEOUT_MS") {
            Ok(raw) => Some(Duration::from_millis(
                raw.parse::<u64>()
                    .map_err(|e| Error::InvalidData(format!("CONFIRMATION_TIMEOUT_MS: {e}")))?,
            )),
            Err(_) => None,
        };

        Ok(Self {
            api_base_url,
            rpc_url,
            chain_id,
            factory_address,
            create_token_fee,
            default_gas_multiplier,
            confirmation_timeout,
            primary_wallet_key,
            buyer_wallet_keys,
        })
    }
}

/// Parse a decimal BNB amount (e.g. "0.009") into wei.
pub fn parse_native_amount(amount: &str) -> Result<U256> {
    let trimmed = amount.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if frac.len() > 18 {
        return Err(Error::InvalidData(format!(
            "amount has more than 18 decimal places: {amount}"
        )));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|e| Error::InvalidData(format!("invalid amount {amount}: {e}")))?
    };

    let frac_wei: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<18}");
        padded
            .parse()
            .map_err(|e| Error::InvalidData(format!("invalid amount {amount}: {e}")))?
    };

    let wei = U256::from(whole)
        .checked_mul(U256::from(10u128.pow(18)))
        .and_then(|w| w.checked_add(U256::from(frac_wei)))
        .ok_or_else(|| Error::InvalidData(format!("amount overflows: {amount}")))?;

    Ok(wei)
}
