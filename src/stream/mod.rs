//! Stream module - Data ingestion from multiple sources
//!
//! Supports:
//! - PumpPortal WebSocket (pump.fun launches and trades)
//! - Solana `logsSubscribe` for AMM programs (Raydium, Orca)

pub mod connection;
pub mod event;
pub mod logs;
pub mod normalizer;
pub mod pumpportal;

pub use connection::{ConnectionManager, ConnectionState, SourceConnection};
pub use event::{EventKind, NormalizedEvent, SourceId, TradeSide};
pub use logs::{LogsNormalizer, LogsSubscribeRequest};
pub use normalizer::MessageNormalizer;
pub use pumpportal::{PumpPortalNormalizer, SubscriptionMessage};
