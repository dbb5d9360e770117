//! Configuration for the token risk audit

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for auditing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable the auditor at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Audit every newly created token automatically
    #[serde(default = "default_true")]
    pub auto_audit: bool,

    /// Per-check toggles
    #[serde(default)]
    pub checks: CheckToggles,

    /// Scoring thresholds
    #[serde(default)]
    pub thresholds: AuditThresholds,

    /// Result cache
    #[serde(default)]
    pub cache: AuditCacheConfig,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_audit: true,
            checks: CheckToggles::default(),
            thresholds: AuditThresholds::default(),
            cache: AuditCacheConfig::default(),
        }
    }
}

/// Independently toggleable checks, run in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckToggles {
    #[serde(default = "default_true")]
    pub rug_check: bool,
    #[serde(default = "default_true")]
    pub liquidity_check: bool,
    #[serde(default = "default_true")]
    pub holder_check: bool,
    #[serde(default = "default_true")]
    pub honeypot_check: bool,
    #[serde(default = "default_true")]
    pub contract_check: bool,
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            rug_check: true,
            liquidity_check: true,
            holder_check: true,
            honeypot_check: true,
            contract_check: true,
        }
    }
}

/// Numeric thresholds used by the checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditThresholds {
    /// Minimum liquidity (SOL)
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
    /// Maximum share of supply held by the largest holder (%)
    #[serde(default = "default_max_top_holder_percent")]
    pub max_top_holder_percent: f64,
    /// Minimum number of holders
    #[serde(default = "default_min_holder_count")]
    pub min_holder_count: u64,
    /// Maximum share of supply held by the creator (%)
    #[serde(default = "default_max_creator_percent")]
    pub max_creator_percent: f64,
    /// Buy or sell tax above this is flagged (%)
    #[serde(default = "default_max_tax_percent")]
    pub max_tax_percent: f64,
    /// Tokens younger than this get an observation warning (minutes)
    #[serde(default = "default_young_token_minutes")]
    pub young_token_minutes: f64,
}

fn default_min_liquidity() -> f64 {
    5.0
}

fn default_max_top_holder_percent() -> f64 {
    20.0
}

fn default_min_holder_count() -> u64 {
    10
}

fn default_max_creator_percent() -> f64 {
    10.0
}

fn default_max_tax_percent() -> f64 {
    10.0
}

fn default_young_token_minutes() -> f64 {
    10.0
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            min_liquidity: default_min_liquidity(),
            max_top_holder_percent: default_max_top_holder_percent(),
            min_holder_count: default_min_holder_count(),
            max_creator_percent: default_max_creator_percent(),
            max_tax_percent: default_max_tax_percent(),
            young_token_minutes: default_young_token_minutes(),
        }
    }
}

/// Audit result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCacheConfig {
    /// How long a result stays valid (milliseconds)
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
    /// Maximum number of cached results
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_cache_capacity() -> usize {
    10_000
}

impl Default for AuditCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
            capacity: default_cache_capacity(),
        }
    }
}

impl AuditCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Which provider implementations back the holder and honeypot checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Randomized responses, no network access
    Simulated,
    /// Helius for holders, an HTTP detector for honeypots
    Http,
}

/// External data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,
    /// Helius API key (required for `http`)
    #[serde(default)]
    pub helius_api_key: String,
    /// Honeypot detector base URL (required for `http`)
    #[serde(default)]
    pub honeypot_url: String,
    /// Upper bound on a single provider call (milliseconds)
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
    /// Artificial latency of the simulated providers (milliseconds)
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Simulated
}

fn default_provider_timeout_ms() -> u64 {
    5_000
}

fn default_simulated_latency_ms() -> u64 {
    500
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            helius_api_key: String::new(),
            honeypot_url: String::new(),
            timeout_ms: default_provider_timeout_ms(),
            simulated_latency_ms: default_simulated_latency_ms(),
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
