//! Error types and Result alias for the launcher

use thiserror::Error;

/// Main error type for the launcher
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to initialize account: {0}")]
    AccountInit(String),

    #[error("Number of wallets ({wallets}) must match number of transactions ({transactions})")]
    ArityMismatch { wallets: usize, transactions: usize },

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Unsupported strategy type: {0}")]
    UnsupportedStrategy(String),

    #[error("Launch aborted due to excessive sniper activity")]
    LaunchAborted,

    #[error("Timed out waiting for token contract address after {attempts} attempts")]
    TokenAddressTimeout { attempts: u32 },

    #[error("Timed out waiting for confirmation of {hash}")]
    ConfirmationTimeout { hash: String },

    #[error("Insufficient balance for {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: String,
        required: String,
        available: String,
    },
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
