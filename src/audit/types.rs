//! Shared data structures for token auditing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::stream::event::EventFields;

/// Starting score of every audit
pub const INITIAL_SCORE: i64 = 100;

/// Free-form key/value details recorded by checks
pub type AuditDetails = BTreeMap<String, Value>;

/// Severity tag on a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// A risk or warning produced by a check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Risk classification derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a score into one of four fixed bands.
    /// Anything below 40, including negative scores, is critical.
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 80 => RiskLevel::Low,
            s if s >= 60 => RiskLevel::Medium,
            s if s >= 40 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low risk",
            RiskLevel::Medium => "Medium risk",
            RiskLevel::High => "High risk",
            RiskLevel::Critical => "Critical risk",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Token passed most safety checks; risk is low.",
            RiskLevel::Medium => "Token shows some risk factors; trade with caution.",
            RiskLevel::High => "Token carries high risk; avoid large positions.",
            RiskLevel::Critical => "Token risk is extreme; strongly advise avoiding it.",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Points deducted and findings produced by one check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckOutcome {
    pub deduction: i64,
    pub risks: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub passed: Vec<String>,
    pub details: AuditDetails,
}

impl CheckOutcome {
    pub fn risk(&mut self, points: i64, severity: Severity, message: impl Into<String>) {
        self.deduction += points;
        self.risks.push(Finding::new(severity, message));
    }

    pub fn warning(&mut self, points: i64, severity: Severity, message: impl Into<String>) {
        self.deduction += points;
        self.warnings.push(Finding::new(severity, message));
    }

    pub fn pass(&mut self, message: impl Into<String>) {
        self.passed.push(message.into());
    }

    pub fn detail(&mut self, key: &str, value: impl Into<Value>) {
        self.details.insert(key.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.deduction == 0
            && self.risks.is_empty()
            && self.warnings.is_empty()
            && self.passed.is_empty()
            && self.details.is_empty()
    }
}

/// Outcome of auditing one token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub token_address: String,
    pub timestamp: DateTime<Utc>,
    /// Never clamped; may go below zero
    pub score: i64,
    pub risk_level: RiskLevel,
    pub risks: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub passed: Vec<String>,
    pub details: AuditDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditResult {
    pub fn new(token_address: impl Into<String>) -> Self {
        Self {
            token_address: token_address.into(),
            timestamp: Utc::now(),
            score: INITIAL_SCORE,
            risk_level: RiskLevel::from_score(INITIAL_SCORE),
            risks: Vec::new(),
            warnings: Vec::new(),
            passed: Vec::new(),
            details: AuditDetails::new(),
            error: None,
        }
    }

    /// Fold one check's outcome into the running result
    pub fn apply(&mut self, outcome: CheckOutcome) {
        self.score -= outcome.deduction;
        self.risks.extend(outcome.risks);
        self.warnings.extend(outcome.warnings);
        self.passed.extend(outcome.passed);
        self.details.extend(outcome.details);
    }

    /// Derive the risk level from the final score
    pub fn finalize(&mut self) {
        self.risk_level = RiskLevel::from_score(self.score);
    }
}

/// Token attributes available to the audit
///
/// Parsed leniently from source payloads: a field of the wrong type or an
/// empty string counts as unknown.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub creator_balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_supply: Option<f64>,
    /// Liquidity lock status
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub has_lock: Option<bool>,
    /// Mint authority still active
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub mintable: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub v_sol_in_bonding_curve: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub liquidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub removable_liquidity: Option<bool>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub telegram: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TokenData {
    /// Build audit input from a normalized event's fields
    pub fn from_fields(fields: &EventFields) -> Self {
        let object: serde_json::Map<String, Value> =
            fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Self::from_value(Value::Object(object))
    }

    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Unusable token data, auditing with no attributes: {}", e);
                Self::default()
            }
        }
    }

    /// Creator holdings as a percentage of supply, when the creator and
    /// both amounts are known
    pub fn creator_percent(&self) -> Option<f64> {
        self.creator.as_ref()?;
        match (self.creator_balance, self.total_supply) {
            (Some(balance), Some(supply)) if balance > 0.0 && supply > 0.0 => {
                Some(balance / supply * 100.0)
            }
            _ => None,
        }
    }

    /// Bonding-curve SOL, else generic liquidity, else zero
    pub fn liquidity_sol(&self) -> f64 {
        self.v_sol_in_bonding_curve
            .filter(|v| *v != 0.0)
            .or(self.liquidity.filter(|v| *v != 0.0))
            .unwrap_or(0.0)
    }

    pub fn has_socials(&self) -> bool {
        self.twitter.is_some() || self.telegram.is_some() || self.website.is_some()
    }
}

mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            _ => None,
        })
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
    }

    /// Milliseconds since the epoch or an RFC 3339 string
    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            Some(Value::String(s)) => match s.parse::<i64>() {
                Ok(millis) => DateTime::from_timestamp_millis(millis),
                Err(_) => DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            },
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(79), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(39), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(-95), RiskLevel::Critical);
    }

    #[test]
    fn test_apply_and_finalize() {
        let mut result = AuditResult::new("mint");
        let mut outcome = CheckOutcome::default();
        outcome.risk(30, Severity::High, "creator holds too much");
        outcome.warning(15, Severity::Medium, "low liquidity");
        outcome.pass("metadata complete");
        outcome.detail("liquidity", 3.0);
        result.apply(outcome);
        result.finalize();

        assert_eq!(result.score, 55);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.risks.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.passed, vec!["metadata complete".to_string()]);
        assert_eq!(result.details["liquidity"], json!(3.0));
    }

    #[test]
    fn test_result_serialization() {
        let mut result = AuditResult::new("mint");
        result.finalize();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["tokenAddress"], "mint");
        assert_eq!(value["riskLevel"], "LOW");
        assert_eq!(value["score"], 100);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_token_data_lenient_parsing() {
        let data = TokenData::from_value(json!({
            "name": "Test",
            "symbol": "",
            "twitter": null,
            "website": "https://example.com",
            "vSolInBondingCurve": "30.5",
            "liquidity": "lots",
            "hasLock": "yes",
            "mintable": false,
            "createdAt": "2024-05-01T12:00:00Z",
            "unrelated": [1, 2, 3]
        }));

        assert_eq!(data.name.as_deref(), Some("Test"));
        assert_eq!(data.symbol, None);
        assert_eq!(data.twitter, None);
        assert!(data.has_socials());
        assert_eq!(data.v_sol_in_bonding_curve, Some(30.5));
        assert_eq!(data.liquidity, None);
        assert_eq!(data.has_lock, None);
        assert_eq!(data.mintable, Some(false));
        assert_eq!(
            data.created_at,
            Some("2024-05-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
    }

    #[test]
    fn test_created_at_millis() {
        let data = TokenData::from_value(json!({ "createdAt": 1714564800000_i64 }));
        assert_eq!(data.created_at.unwrap().timestamp(), 1714564800);
    }

    #[test]
    fn test_liquidity_fallback() {
        let mut data = TokenData::default();
        assert_eq!(data.liquidity_sol(), 0.0);
        data.liquidity = Some(7.0);
        assert_eq!(data.liquidity_sol(), 7.0);
        data.v_sol_in_bonding_curve = Some(0.0);
        assert_eq!(data.liquidity_sol(), 7.0);
        data.v_sol_in_bonding_curve = Some(31.2);
        assert_eq!(data.liquidity_sol(), 31.2);
    }

    #[test]
    fn test_creator_percent_requires_both_fields() {
        let mut data = TokenData {
            creator_balance: Some(150.0),
            total_supply: Some(1000.0),
            ..Default::default()
        };
        assert_eq!(data.creator_percent(), None);
        data.creator = Some("creator".to_string());
        assert_eq!(data.creator_percent(), Some(15.0));
        data.total_supply = Some(0.0);
        assert_eq!(data.creator_percent(), None);
    }

    #[test]
    fn test_non_object_input_falls_back_to_default() {
        assert_eq!(TokenData::from_value(json!([1, 2])), TokenData::default());
    }
}
