//! DEX Audit Monitor Library
//!
//! Persistent WebSocket connections to several Solana market-data sources,
//! per-source normalization into a common event model, and a risk auditor
//! that scores newly created tokens.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod stream;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
