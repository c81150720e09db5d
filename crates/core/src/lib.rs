//! Four Meme Core - Shared data models, options, errors, and configuration

pub mod config;
pub mod errors;
pub mod models;
pub mod options;

pub use config::LauncherConfig;
pub use errors::{Error, Result};
pub use models::*;
pub use options::*;
