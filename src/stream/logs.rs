//! Solana `logsSubscribe` protocol for AMM program sources
//!
//! The node pushes one `logsNotification` per transaction mentioning the
//! subscribed program. The notification carries the signature and the raw
//! program log lines but no token mint, so events are classified by keyword
//! matching against the joined log text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::stream::event::{EventFields, EventKind, NormalizedEvent, SourceId};
use crate::stream::normalizer::{preview, MessageNormalizer};

/// Raydium AMM v4 program
pub const RAYDIUM_AMM_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Orca Whirlpool program
pub const ORCA_WHIRLPOOL_PROGRAM_ID: &str = "9W959DqEETiGZocYWCQPaJ6sBmUzgfxXfqGeTEdp3aQP";

/// Number of log lines kept on an event for display
const LOG_PREVIEW_LINES: usize = 3;

/// Ordered keyword table. The first entry with any keyword present in the
/// log text wins, so declaration order is match priority.
pub type KeywordTable = &'static [(EventKind, &'static [&'static str])];

pub const RAYDIUM_KEYWORDS: KeywordTable = &[
    (EventKind::Swap, &["swap"]),
    (EventKind::LiquidityAdded, &["initialize", "deposit"]),
    (EventKind::LiquidityRemoved, &["withdraw"]),
];

pub const ORCA_KEYWORDS: KeywordTable = &[
    (EventKind::Swap, &["Swap"]),
    (EventKind::LiquidityAdded, &["IncreaseLiquidity", "OpenPosition"]),
    (EventKind::LiquidityRemoved, &["DecreaseLiquidity", "ClosePosition"]),
];

/// JSON-RPC `logsSubscribe` request
#[derive(Debug, Clone, Serialize)]
pub struct LogsSubscribeRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: [Value; 2],
}

impl LogsSubscribeRequest {
    pub fn mentions(program_id: &str, commitment: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method: "logsSubscribe",
            params: [
                json!({ "mentions": [program_id] }),
                json!({ "commitment": commitment }),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Notification {
    method: Option<String>,
    params: Option<NotificationParams>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    result: NotificationResult,
}

#[derive(Debug, Deserialize)]
struct NotificationResult {
    value: LogsValue,
}

#[derive(Debug, Deserialize)]
struct LogsValue {
    signature: String,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    logs: Vec<String>,
}

/// Classify program logs against a keyword table
///
/// Matching is case-sensitive substring search over all lines joined by a
/// single space.
pub fn classify_logs<S: AsRef<str>>(logs: &[S], table: KeywordTable) -> Option<EventKind> {
    let text = logs.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(kind, _)| *kind)
}

/// Normalizer for a program-log subscription
///
/// Every `logsNotification` becomes an event; notifications matching no
/// keyword are [`EventKind::Unclassified`].
#[derive(Debug, Clone)]
pub struct LogsNormalizer {
    source: SourceId,
    keywords: KeywordTable,
}

impl LogsNormalizer {
    pub fn new(source: SourceId, keywords: KeywordTable) -> Self {
        Self { source, keywords }
    }

    pub fn raydium() -> Self {
        Self::new(SourceId::Raydium, RAYDIUM_KEYWORDS)
    }

    pub fn orca() -> Self {
        Self::new(SourceId::Orca, ORCA_KEYWORDS)
    }
}

impl MessageNormalizer for LogsNormalizer {
    fn source(&self) -> SourceId {
        self.source
    }

    fn parse(&self, raw: &str) -> Option<NormalizedEvent> {
        let notification: Notification = match serde_json::from_str(raw) {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to parse {} message: {}", self.source, e);
                return None;
            }
        };

        if notification.method.as_deref() != Some("logsNotification") {
            // Subscription confirmations look like {"jsonrpc":"2.0","result":42,"id":1}
            debug!("{}: non-notification frame {}", self.source, preview(raw));
            return None;
        }

        let Some(params) = notification.params else {
            warn!("{} notification without params", self.source);
            return None;
        };
        let value = params.result.value;

        let kind = classify_logs(&value.logs, self.keywords).unwrap_or(EventKind::Unclassified);

        let mut fields = EventFields::new();
        fields.insert("signature".to_string(), Value::from(value.signature));
        fields.insert(
            "logs".to_string(),
            Value::from(
                value
                    .logs
                    .into_iter()
                    .take(LOG_PREVIEW_LINES)
                    .collect::<Vec<_>>(),
            ),
        );
        fields.insert("failed".to_string(), Value::from(value.err.map_or(false, |e| !e.is_null())));

        Some(NormalizedEvent::new(self.source, kind, None, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(logs: &[&str]) -> String {
        json!({
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "result": {
                    "context": { "slot": 5208469 },
                    "value": {
                        "signature": "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXFSDwt8GFXM7W5Ncn16wmqokgpiKRLuS83KUxyZyv2sUYv",
                        "err": null,
                        "logs": logs
                    }
                },
                "subscription": 24040
            }
        })
        .to_string()
    }

    #[test]
    fn test_subscribe_request_shape() {
        let request = LogsSubscribeRequest::mentions(RAYDIUM_AMM_PROGRAM_ID, "confirmed");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "logsSubscribe",
                "params": [
                    { "mentions": [RAYDIUM_AMM_PROGRAM_ID] },
                    { "commitment": "confirmed" }
                ]
            })
        );
    }

    #[test]
    fn test_swap_wins_over_withdraw() {
        let logs = ["Program log: withdraw fees", "Program log: swap executed"];
        assert_eq!(classify_logs(&logs, RAYDIUM_KEYWORDS), Some(EventKind::Swap));
    }

    #[test]
    fn test_raydium_classification() {
        assert_eq!(
            classify_logs(&["Program log: initialize2: InitializeInstruction2"], RAYDIUM_KEYWORDS),
            Some(EventKind::LiquidityAdded)
        );
        assert_eq!(
            classify_logs(&["Program log: deposit"], RAYDIUM_KEYWORDS),
            Some(EventKind::LiquidityAdded)
        );
        assert_eq!(
            classify_logs(&["Program log: withdraw"], RAYDIUM_KEYWORDS),
            Some(EventKind::LiquidityRemoved)
        );
        assert_eq!(classify_logs(&["Program log: ray_log: abc"], RAYDIUM_KEYWORDS), None);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        // Orca logs capitalise instruction names, Raydium logs do not
        assert_eq!(classify_logs(&["Program log: Instruction: Swap"], RAYDIUM_KEYWORDS), None);
        assert_eq!(
            classify_logs(&["Program log: Instruction: Swap"], ORCA_KEYWORDS),
            Some(EventKind::Swap)
        );
        assert_eq!(classify_logs(&["swap"], ORCA_KEYWORDS), None);
    }

    #[test]
    fn test_orca_classification() {
        assert_eq!(
            classify_logs(&["Program log: Instruction: OpenPosition"], ORCA_KEYWORDS),
            Some(EventKind::LiquidityAdded)
        );
        assert_eq!(
            classify_logs(&["Program log: Instruction: DecreaseLiquidity"], ORCA_KEYWORDS),
            Some(EventKind::LiquidityRemoved)
        );
    }

    #[test]
    fn test_parse_notification() {
        let raw = notification(&[
            "Program 675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8 invoke [1]",
            "Program log: swap",
            "Program log: ray_log: AwAAAAAAAAA",
            "Program 675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8 success",
        ]);
        let event = LogsNormalizer::raydium().parse(&raw).unwrap();
        assert_eq!(event.source, SourceId::Raydium);
        assert_eq!(event.kind, EventKind::Swap);
        assert!(event.token.is_none());
        assert!(event.signature().unwrap().starts_with("5h6xBEau"));
        assert_eq!(event.fields["logs"].as_array().unwrap().len(), 3);
        assert_eq!(event.fields["failed"], Value::Bool(false));
    }

    #[test]
    fn test_unmatched_notification_is_unclassified() {
        let event = LogsNormalizer::orca()
            .parse(&notification(&["Program log: nothing"]))
            .unwrap();
        assert_eq!(event.kind, EventKind::Unclassified);
        assert!(event.signature().is_some());
    }

    #[test]
    fn test_discards_acks_and_malformed() {
        let normalizer = LogsNormalizer::orca();
        assert!(normalizer.parse(r#"{"jsonrpc":"2.0","result":24040,"id":1}"#).is_none());
        assert!(normalizer.parse("{broken").is_none());
    }
}
