//! Four Meme Chain - Multi-wallet transaction coordination over BSC
//!
//! The coordination layer between the launch strategies and the chain:
//! a wallet registry that owns every managed signing account, a dispatcher
//! that fills gas parameters and submits signed transactions, and a batch
//! executor that runs dispatches in parallel fan-outs or timed sequences.

pub mod batch;
pub mod dispatcher;
pub mod registry;
pub mod rpc;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use batch::BatchExecutor;
pub use dispatcher::TxDispatcher;
pub use registry::WalletRegistry;
pub use rpc::{EvmRpc, HttpRpc, LogEntry, LogFilter};
