//! PumpPortal trade stream protocol
//!
//! PumpPortal provides a free WebSocket API for real-time pump.fun data.
//! Every data frame is a flat JSON object whose `txType` field is one of
//! `create`, `buy` or `sell`; any other object is unclassified. Subscription
//! acknowledgements are plain `{"message": "..."}` objects and carry no event.
//!
//! WebSocket endpoint: wss://pumpportal.fun/api/data
//! Documentation: https://pumpportal.fun/data-api/real-time

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::stream::event::{EventFields, EventKind, NormalizedEvent, SourceId, TradeSide};
use crate::stream::normalizer::{preview, MessageNormalizer};

/// PumpPortal WebSocket URL
pub const PUMPPORTAL_WS_URL: &str = "wss://pumpportal.fun/api/data";

/// Every pump.fun token is minted with a fixed supply of one billion
pub const PUMP_FUN_TOTAL_SUPPLY: f64 = 1_000_000_000.0;

/// Subscription methods
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMessage {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

impl SubscriptionMessage {
    /// Subscribe to new token creation events
    pub fn subscribe_new_tokens() -> Self {
        Self {
            method: "subscribeNewToken".to_string(),
            keys: None,
        }
    }

    /// Subscribe to trades on specific tokens
    pub fn subscribe_token_trades(mints: Vec<String>) -> Self {
        Self {
            method: "subscribeTokenTrade".to_string(),
            keys: Some(mints),
        }
    }

    /// Subscribe to trades by specific accounts (wallets)
    pub fn subscribe_account_trades(wallets: Vec<String>) -> Self {
        Self {
            method: "subscribeAccountTrade".to_string(),
            keys: Some(wallets),
        }
    }
}

/// Build the subscribe requests sent after every (re)connect
///
/// Token and account trade subscriptions are only sent when keys are
/// configured.
pub fn subscriptions(
    new_tokens: bool,
    token_trades: &[String],
    account_trades: &[String],
) -> Vec<SubscriptionMessage> {
    let mut messages = Vec::new();
    if new_tokens {
        messages.push(SubscriptionMessage::subscribe_new_tokens());
    }
    if !token_trades.is_empty() {
        messages.push(SubscriptionMessage::subscribe_token_trades(token_trades.to_vec()));
    }
    if !account_trades.is_empty() {
        messages.push(SubscriptionMessage::subscribe_account_trades(account_trades.to_vec()));
    }
    messages
}

/// Normalizer for the PumpPortal trade stream
#[derive(Debug, Default, Clone)]
pub struct PumpPortalNormalizer;

impl PumpPortalNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Fill in audit inputs pump.fun implies but PumpPortal does not send
    fn enrich_create(fields: &mut Map<String, Value>) {
        if !fields.contains_key("creator") {
            if let Some(trader) = fields.get("traderPublicKey").cloned() {
                fields.insert("creator".to_string(), trader);
            }
        }
        if !fields.contains_key("creatorBalance") {
            if let Some(initial_buy) = fields.get("initialBuy").cloned() {
                fields.insert("creatorBalance".to_string(), initial_buy);
            }
        }
        if !fields.contains_key("totalSupply") {
            fields.insert("totalSupply".to_string(), Value::from(PUMP_FUN_TOTAL_SUPPLY));
        }
    }
}

impl MessageNormalizer for PumpPortalNormalizer {
    fn source(&self) -> SourceId {
        SourceId::PumpFun
    }

    fn parse(&self, raw: &str) -> Option<NormalizedEvent> {
        let mut object = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                debug!("Ignoring non-object PumpPortal frame: {}", preview(raw));
                return None;
            }
            Err(e) => {
                warn!("Failed to parse PumpPortal message: {}", e);
                return None;
            }
        };

        let kind = match object.get("txType").and_then(Value::as_str) {
            Some("create") => EventKind::TokenCreated,
            Some("buy") => EventKind::Trade(TradeSide::Buy),
            Some("sell") => EventKind::Trade(TradeSide::Sell),
            Some(other) => {
                debug!("Unclassified PumpPortal txType {}", other);
                EventKind::Unclassified
            }
            None => {
                if let Some(message) = object.get("message").and_then(Value::as_str) {
                    debug!("PumpPortal: {}", message);
                    return None;
                }
                debug!("Unknown PumpPortal message: {}", preview(raw));
                EventKind::Unclassified
            }
        };

        let token = object
            .get("mint")
            .or_else(|| object.get("tokenAddress"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if kind == EventKind::TokenCreated {
            Self::enrich_create(&mut object);
        }

        let fields: EventFields = object.into_iter().collect();
        Some(NormalizedEvent::new(SourceId::PumpFun, kind, token, fields))
    }
}
