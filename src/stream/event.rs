//! Normalized event model shared by every source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Source-specific fields attached to an event (amounts, parties, signature)
pub type EventFields = BTreeMap<String, serde_json::Value>;

/// Identity of a configured market-data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Pump.fun launches and trades via the PumpPortal trade stream
    PumpFun,
    /// Raydium AMM program logs
    Raydium,
    /// Orca Whirlpool program logs
    Orca,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::PumpFun, SourceId::Raydium, SourceId::Orca];

    /// Human-readable name used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::PumpFun => "Pump.fun",
            SourceId::Raydium => "Raydium",
            SourceId::Orca => "Orca",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::PumpFun => "pumpfun",
            SourceId::Raydium => "raydium",
            SourceId::Orca => "orca",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Side of a bonding-curve trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Kind of a normalized event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "side")]
pub enum EventKind {
    TokenCreated,
    Trade(TradeSide),
    Swap,
    LiquidityAdded,
    LiquidityRemoved,
    /// Well-formed source message that maps to none of the kinds above.
    /// Counted in the source total only.
    Unclassified,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::TokenCreated => write!(f, "token created"),
            EventKind::Trade(TradeSide::Buy) => write!(f, "buy"),
            EventKind::Trade(TradeSide::Sell) => write!(f, "sell"),
            EventKind::Swap => write!(f, "swap"),
            EventKind::LiquidityAdded => write!(f, "add liquidity"),
            EventKind::LiquidityRemoved => write!(f, "remove liquidity"),
            EventKind::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// An inbound message mapped into the common shape
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedEvent {
    pub source: SourceId,
    pub kind: EventKind,
    /// Token mint address, when the source carries one
    pub token: Option<String>,
    pub fields: EventFields,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedEvent {
    pub fn new(source: SourceId, kind: EventKind, token: Option<String>, fields: EventFields) -> Self {
        Self {
            source,
            kind,
            token,
            fields,
            timestamp: Utc::now(),
        }
    }

    /// Transaction signature, if the source reported one
    pub fn signature(&self) -> Option<&str> {
        self.field_str("signature")
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Numeric field, accepting both JSON numbers and numeric strings
    pub fn field_f64(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_accessors() {
        let mut fields = EventFields::new();
        fields.insert("signature".to_string(), json!("sig123"));
        fields.insert("solAmount".to_string(), json!("1.25"));
        fields.insert("tokenAmount".to_string(), json!(5000.0));

        let event = NormalizedEvent::new(
            SourceId::PumpFun,
            EventKind::Trade(TradeSide::Buy),
            Some("mint".to_string()),
            fields,
        );

        assert_eq!(event.signature(), Some("sig123"));
        assert_eq!(event.field_f64("solAmount"), Some(1.25));
        assert_eq!(event.field_f64("tokenAmount"), Some(5000.0));
        assert_eq!(event.field_f64("missing"), None);
    }

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::Trade(TradeSide::Sell)).unwrap();
        assert_eq!(json, r#"{"kind":"trade","side":"sell"}"#);
        let json = serde_json::to_string(&EventKind::Swap).unwrap();
        assert_eq!(json, r#"{"kind":"swap"}"#);
    }
}
