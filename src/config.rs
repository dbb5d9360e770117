//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::audit::config::{AuditConfig, ProviderKind, ProvidersConfig};
use crate::monitor::report::ReportFormat;
use crate::stream::event::SourceId;
use crate::stream::logs::{ORCA_WHIRLPOOL_PROGRAM_ID, RAYDIUM_AMM_PROGRAM_ID};
use crate::stream::pumpportal::PUMPPORTAL_WS_URL;

/// Public Solana mainnet WebSocket endpoint
pub const SOLANA_MAINNET_WS_URL: &str = "wss://api.mainnet-beta.solana.com";

const COMMITMENT_LEVELS: [&str; 3] = ["processed", "confirmed", "finalized"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Market-data sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub pumpfun: PumpFunSourceConfig,
    #[serde(default = "LogsSourceConfig::raydium")]
    pub raydium: LogsSourceConfig,
    #[serde(default = "LogsSourceConfig::orca")]
    pub orca: LogsSourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            pumpfun: PumpFunSourceConfig::default(),
            raydium: LogsSourceConfig::raydium(),
            orca: LogsSourceConfig::orca(),
        }
    }
}

/// Pump.fun via the PumpPortal data stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpFunSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pumpportal_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_true")]
    pub subscribe_new_tokens: bool,
    /// Mints whose trades should be streamed
    #[serde(default)]
    pub token_trades: Vec<String>,
    /// Wallets whose trades should be streamed
    #[serde(default)]
    pub account_trades: Vec<String>,
}

impl Default for PumpFunSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ws_url: default_pumpportal_ws_url(),
            subscribe_new_tokens: true,
            token_trades: Vec::new(),
            account_trades: Vec::new(),
        }
    }
}

/// An AMM program watched through Solana `logsSubscribe`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_solana_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub program_id: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

impl LogsSourceConfig {
    fn for_program(program_id: &str) -> Self {
        Self {
            enabled: true,
            ws_url: default_solana_ws_url(),
            program_id: program_id.to_string(),
            commitment: default_commitment(),
        }
    }

    pub fn raydium() -> Self {
        Self::for_program(RAYDIUM_AMM_PROGRAM_ID)
    }

    pub fn orca() -> Self {
        Self::for_program(ORCA_WHIRLPOOL_PROGRAM_ID)
    }
}

/// Connection supervision shared by all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Capacity of the event channel between connections and dispatcher
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: default_stats_interval_secs(),
            format: ReportFormat::default(),
        }
    }
}

impl ReportConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_pumpportal_ws_url() -> String {
    PUMPPORTAL_WS_URL.to_string()
}

fn default_solana_ws_url() -> String {
    SOLANA_MAINNET_WS_URL.to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from file, with environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Program ids differ per source, so they are not serde defaults
            .set_default("sources.raydium.program_id", RAYDIUM_AMM_PROGRAM_ID)?
            .set_default("sources.orca.program_id", ORCA_WHIRLPOOL_PROGRAM_ID)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (MONITOR__AUDIT__ENABLED=false)
            .add_source(
                config::Environment::with_prefix("MONITOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Sources switched on, in a fixed order
    pub fn enabled_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|source| match source {
                SourceId::PumpFun => self.sources.pumpfun.enabled,
                SourceId::Raydium => self.sources.raydium.enabled,
                SourceId::Orca => self.sources.orca.enabled,
            })
            .collect()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let pumpfun = &self.sources.pumpfun;
        if pumpfun.enabled {
            validate_ws_url("sources.pumpfun.ws_url", &pumpfun.ws_url)?;
            for key in pumpfun.token_trades.iter().chain(&pumpfun.account_trades) {
                Pubkey::from_str(key)
                    .with_context(|| format!("Invalid address in sources.pumpfun: {}", key))?;
            }
        }

        for (name, source) in [("raydium", &self.sources.raydium), ("orca", &self.sources.orca)] {
            if !source.enabled {
                continue;
            }
            validate_ws_url(&format!("sources.{}.ws_url", name), &source.ws_url)?;
            Pubkey::from_str(&source.program_id).with_context(|| {
                format!("Invalid sources.{}.program_id: {:?}", name, source.program_id)
            })?;
            if !COMMITMENT_LEVELS.contains(&source.commitment.as_str()) {
                anyhow::bail!(
                    "sources.{}.commitment must be one of {:?}, got {}",
                    name,
                    COMMITMENT_LEVELS,
                    source.commitment
                );
            }
        }

        if self.enabled_sources().is_empty() {
            tracing::warn!("No sources enabled - the monitor will only report stats");
        }

        // Timers and capacities
        if self.connection.heartbeat_interval_secs == 0 {
            anyhow::bail!("connection.heartbeat_interval_secs must be positive");
        }
        if self.connection.reconnect_delay_ms == 0 {
            anyhow::bail!("connection.reconnect_delay_ms must be positive");
        }
        if self.connection.channel_capacity == 0 {
            anyhow::bail!("connection.channel_capacity must be positive");
        }
        if self.report.stats_interval_secs == 0 {
            anyhow::bail!("report.stats_interval_secs must be positive");
        }

        // Audit thresholds
        let t = &self.audit.thresholds;
        if t.min_liquidity < 0.0 {
            anyhow::bail!("audit.thresholds.min_liquidity cannot be negative");
        }
        for (name, pct) in [
            ("max_top_holder_percent", t.max_top_holder_percent),
            ("max_creator_percent", t.max_creator_percent),
            ("max_tax_percent", t.max_tax_percent),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                anyhow::bail!("audit.thresholds.{} must be between 0 and 100", name);
            }
        }
        if t.young_token_minutes < 0.0 {
            anyhow::bail!("audit.thresholds.young_token_minutes cannot be negative");
        }
        if self.audit.cache.ttl_ms == 0 {
            anyhow::bail!("audit.cache.ttl_ms must be positive");
        }
        if self.audit.cache.capacity == 0 {
            anyhow::bail!("audit.cache.capacity must be positive");
        }

        // Providers
        if self.providers.timeout_ms == 0 {
            anyhow::bail!("providers.timeout_ms must be positive");
        }
        if self.providers.kind == ProviderKind::Http {
            if self.providers.helius_api_key.is_empty() {
                anyhow::bail!("providers.helius_api_key is required for the http provider");
            }
            url::Url::parse(&self.providers.honeypot_url).with_context(|| {
                format!("Invalid providers.honeypot_url: {:?}", self.providers.honeypot_url)
            })?;
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let t = &self.audit.thresholds;
        let c = &self.audit.checks;
        format!(
            r#"Configuration:
  Pump.fun:
    enabled: {}
    ws_url: {}
    subscribe_new_tokens: {}
    token_trades: {}
    account_trades: {}
  Raydium:
    enabled: {}
    ws_url: {}
    program_id: {}
  Orca:
    enabled: {}
    ws_url: {}
    program_id: {}
  Connection:
    heartbeat: {}s
    reconnect_delay: {}ms
  Audit:
    enabled: {}
    auto_audit: {}
    checks: rug={} liquidity={} holders={} honeypot={} contract={}
    min_liquidity: {} SOL
    max_top_holder: {}%
    min_holders: {}
    max_creator: {}%
    max_tax: {}%
    cache_ttl: {}ms (capacity {})
  Providers:
    kind: {:?}
    helius_api_key: {}
    honeypot_url: {}
    timeout: {}ms
  Report:
    stats_interval: {}s
    format: {:?}
"#,
            self.sources.pumpfun.enabled,
            mask_url(&self.sources.pumpfun.ws_url),
            self.sources.pumpfun.subscribe_new_tokens,
            self.sources.pumpfun.token_trades.len(),
            self.sources.pumpfun.account_trades.len(),
            self.sources.raydium.enabled,
            mask_url(&self.sources.raydium.ws_url),
            self.sources.raydium.program_id,
            self.sources.orca.enabled,
            mask_url(&self.sources.orca.ws_url),
            self.sources.orca.program_id,
            self.connection.heartbeat_interval_secs,
            self.connection.reconnect_delay_ms,
            self.audit.enabled,
            self.audit.auto_audit,
            c.rug_check,
            c.liquidity_check,
            c.holder_check,
            c.honeypot_check,
            c.contract_check,
            t.min_liquidity,
            t.max_top_holder_percent,
            t.min_holder_count,
            t.max_creator_percent,
            t.max_tax_percent,
            self.audit.cache.ttl_ms,
            self.audit.cache.capacity,
            self.providers.kind,
            if self.providers.helius_api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            if self.providers.honeypot_url.is_empty() {
                "(not set)".to_string()
            } else {
                mask_url(&self.providers.honeypot_url)
            },
            self.providers.timeout_ms,
            self.report.stats_interval_secs,
            self.report.format,
        )
    }
}

fn validate_ws_url(name: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value).with_context(|| format!("Invalid {}: {:?}", name, value))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        anyhow::bail!("{} must be a ws:// or wss:// URL, got {}", name, value);
    }
    Ok(())
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.sources.pumpfun.enabled);
        assert_eq!(config.sources.raydium.program_id, RAYDIUM_AMM_PROGRAM_ID);
        assert_eq!(config.sources.orca.program_id, ORCA_WHIRLPOOL_PROGRAM_ID);
        assert_eq!(config.connection.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.connection.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.report.stats_interval(), Duration::from_secs(60));
        assert_eq!(config.enabled_sources(), SourceId::ALL.to_vec());
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sources.raydium.program_id, RAYDIUM_AMM_PROGRAM_ID);
        assert_eq!(config.sources.orca.program_id, ORCA_WHIRLPOOL_PROGRAM_ID);
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
[sources.orca]
enabled = false

[sources.raydium]
commitment = "finalized"

[audit]
auto_audit = false

[audit.checks]
honeypot_check = false

[audit.thresholds]
min_liquidity = 2.5

[audit.cache]
ttl_ms = 1000

[report]
format = "json"
stats_interval_secs = 10
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert!(!config.sources.orca.enabled);
        assert_eq!(config.sources.raydium.commitment, "finalized");
        assert_eq!(config.sources.raydium.program_id, RAYDIUM_AMM_PROGRAM_ID);
        assert!(!config.audit.auto_audit);
        assert!(!config.audit.checks.honeypot_check);
        assert!(config.audit.checks.rug_check);
        assert_eq!(config.audit.thresholds.min_liquidity, 2.5);
        assert_eq!(config.audit.thresholds.max_creator_percent, 10.0);
        assert_eq!(config.audit.cache.ttl_ms, 1000);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(
            config.enabled_sources(),
            vec![SourceId::PumpFun, SourceId::Raydium]
        );
    }

    #[test]
    fn test_environment_override() {
        std::env::set_var("MONITOR__CONNECTION__CHANNEL_CAPACITY", "77");
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml"));
        std::env::remove_var("MONITOR__CONNECTION__CHANNEL_CAPACITY");
        assert_eq!(config.unwrap().connection.channel_capacity, 77);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.sources.raydium.program_id = "not-a-pubkey".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.pumpfun.ws_url = "https://pumpportal.fun".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.orca.commitment = "instant".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audit.thresholds.max_creator_percent = 150.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audit.cache.ttl_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.providers.kind = ProviderKind::Http;
        assert!(config.validate().is_err());
        config.providers.helius_api_key = "key".to_string();
        config.providers.honeypot_url = "https://honeypot.example/api".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_disabled_source_is_not_validated() {
        let mut config = Config::default();
        config.sources.orca.enabled = false;
        config.sources.orca.program_id = String::new();
        config.validate().unwrap();
    }

    #[test]
    fn test_masked_display_hides_secrets() {
        let mut config = Config::default();
        config.providers.helius_api_key = "supersecret".to_string();
        config.sources.raydium.ws_url = "wss://mainnet.helius-rpc.com/?api-key=k3yv4lue".to_string();
        let shown = config.masked_display();
        assert!(!shown.contains("supersecret"));
        assert!(!shown.contains("k3yv4lue"));
        assert!(shown.contains("wss://mainnet.helius-rpc.com/?***"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }
}
