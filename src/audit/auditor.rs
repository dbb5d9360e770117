//! Risk auditor - runs the ordered check battery against a token
//!
//! Checks run in a fixed order (rug, liquidity, holders, honeypot,
//! contract) and every enabled check always runs; a bad finding never
//! short-circuits the rest. Provider-backed checks are bounded by a timeout
//! and contribute nothing when their provider fails.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::audit::checks;
use crate::audit::config::{AuditConfig, AuditThresholds, CheckToggles, ProviderKind, ProvidersConfig};
use crate::audit::providers::{
    HeliusHolderProvider, HolderData, HolderDataProvider, HoneypotProvider, HoneypotReport,
    HttpHoneypotProvider, SimulatedProvider,
};
use crate::audit::types::{AuditResult, TokenData};
use crate::error::{Error, Result};

/// Runs the audit checks for a token
pub struct RiskAuditor {
    checks: CheckToggles,
    thresholds: AuditThresholds,
    holders: Arc<dyn HolderDataProvider>,
    honeypot: Arc<dyn HoneypotProvider>,
    provider_timeout: Duration,
}

impl RiskAuditor {
    pub fn new(
        config: &AuditConfig,
        holders: Arc<dyn HolderDataProvider>,
        honeypot: Arc<dyn HoneypotProvider>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            checks: config.checks,
            thresholds: config.thresholds.clone(),
            holders,
            honeypot,
            provider_timeout,
        }
    }

    /// Build an auditor with the providers selected in configuration
    pub fn from_config(config: &AuditConfig, providers: &ProvidersConfig) -> Result<Self> {
        let holders: Arc<dyn HolderDataProvider>;
        let honeypot: Arc<dyn HoneypotProvider>;
        match providers.kind {
            ProviderKind::Simulated => {
                let simulated = Arc::new(SimulatedProvider::new(Duration::from_millis(
                    providers.simulated_latency_ms,
                )));
                holders = simulated.clone();
                honeypot = simulated;
            }
            ProviderKind::Http => {
                holders = Arc::new(HeliusHolderProvider::new(
                    &providers.helius_api_key,
                    providers.timeout(),
                )?);
                honeypot = Arc::new(HttpHoneypotProvider::new(
                    &providers.honeypot_url,
                    providers.timeout(),
                )?);
            }
        }

        info!(
            "Audit providers: holders={}, honeypot={}",
            holders.name(),
            honeypot.name()
        );

        Ok(Self::new(config, holders, honeypot, providers.timeout()))
    }

    /// Audit a token
    ///
    /// Always returns a finalized result. An unexpected failure inside a
    /// check is caught here and recorded in `error`.
    pub async fn audit(&self, token: &str, data: &TokenData) -> AuditResult {
        info!(token, "Starting token audit");
        let mut result = AuditResult::new(token);

        let pipeline = AssertUnwindSafe(self.run_checks(token, data, &mut result)).catch_unwind();
        if let Err(panic) = pipeline.await {
            let message = panic_message(panic.as_ref());
            error!(token, "Audit failed: {}", message);
            result.error = Some(message);
        }

        result.finalize();
        info!(
            token,
            score = result.score,
            risk_level = %result.risk_level,
            risks = result.risks.len(),
            warnings = result.warnings.len(),
            "Audit complete"
        );
        result
    }

    async fn run_checks(&self, token: &str, data: &TokenData, result: &mut AuditResult) {
        if self.checks.rug_check {
            debug!(token, "Checking rug-pull risk");
            result.apply(checks::rug_check(data, &self.thresholds));
        }

        if self.checks.liquidity_check {
            debug!(token, "Checking liquidity");
            result.apply(checks::liquidity_check(data, &self.thresholds));
        }

        if self.checks.holder_check {
            debug!(token, "Checking holder distribution");
            match self.fetch_holders(token).await {
                Ok(holders) => result.apply(checks::holder_check(&holders, &self.thresholds)),
                Err(e) => warn!(token, "Holder data unavailable: {}", e),
            }
        }

        if self.checks.honeypot_check {
            debug!(token, "Checking honeypot risk");
            match self.fetch_honeypot(token).await {
                Ok(report) => result.apply(checks::honeypot_check(&report, &self.thresholds)),
                Err(e) => warn!(token, "Honeypot detection unavailable: {}", e),
            }
        }

        if self.checks.contract_check {
            debug!(token, "Checking contract metadata");
            result.apply(checks::contract_check(data, &self.thresholds, Utc::now()));
        }
    }

    async fn fetch_holders(&self, token: &str) -> Result<HolderData> {
        tokio::time::timeout(self.provider_timeout, self.holders.fetch_holder_data(token))
            .await
            .map_err(|_| Error::ProviderTimeout(self.provider_timeout.as_millis() as u64))?
    }

    async fn fetch_honeypot(&self, token: &str) -> Result<HoneypotReport> {
        tokio::time::timeout(self.provider_timeout, self.honeypot.detect_honeypot(token))
            .await
            .map_err(|_| Error::ProviderTimeout(self.provider_timeout.as_millis() as u64))?
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audit::types::{RiskLevel, Severity};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic provider for tests
    pub(crate) struct FakeProvider {
        pub holders: Option<HolderData>,
        pub honeypot: Option<HoneypotReport>,
        pub delay: Duration,
        pub holder_calls: AtomicUsize,
        pub panic_on_honeypot: bool,
    }

    impl FakeProvider {
        pub(crate) fn healthy() -> Self {
            Self {
                holders: Some(HolderData {
                    count: 500,
                    top_holder_percent: 4.0,
                }),
                honeypot: Some(HoneypotReport {
                    is_honeypot: false,
                    buy_tax: 0.0,
                    sell_tax: 0.0,
                }),
                delay: Duration::ZERO,
                holder_calls: AtomicUsize::new(0),
                panic_on_honeypot: false,
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                holders: None,
                honeypot: None,
                ..Self::healthy()
            }
        }
    }

    #[async_trait]
    impl HolderDataProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_holder_data(&self, _mint: &str) -> Result<HolderData> {
            self.holder_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.holders
                .clone()
                .ok_or_else(|| Error::Provider("holder lookup failed".to_string()))
        }
    }

    #[async_trait]
    impl HoneypotProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn detect_honeypot(&self, _mint: &str) -> Result<HoneypotReport> {
            if self.panic_on_honeypot {
                panic!("detector exploded");
            }
            self.honeypot
                .clone()
                .ok_or_else(|| Error::Provider("honeypot lookup failed".to_string()))
        }
    }

    pub(crate) fn auditor_with(config: &AuditConfig, provider: Arc<FakeProvider>) -> RiskAuditor {
        RiskAuditor::new(config, provider.clone(), provider, Duration::from_millis(200))
    }

    fn complete_token() -> TokenData {
        TokenData {
            name: Some("Good Token".to_string()),
            symbol: Some("GOOD".to_string()),
            creator: Some("creator".to_string()),
            creator_balance: Some(20.0),
            total_supply: Some(1000.0),
            has_lock: Some(true),
            mintable: Some(false),
            v_sol_in_bonding_curve: Some(42.0),
            website: Some("https://good.example".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_clean_token_scores_full() {
        let auditor = auditor_with(&AuditConfig::default(), Arc::new(FakeProvider::healthy()));
        let result = auditor.audit("mint", &complete_token()).await;
        assert_eq!(result.score, 100);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.risks.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.error.is_none());
        assert_eq!(result.details["holderCount"], 500);
    }

    #[tokio::test]
    async fn test_every_check_fails_score_goes_negative() {
        let provider = FakeProvider {
            holders: Some(HolderData {
                count: 2,
                top_holder_percent: 90.0,
            }),
            honeypot: Some(HoneypotReport {
                is_honeypot: true,
                buy_tax: 20.0,
                sell_tax: 20.0,
            }),
            ..FakeProvider::healthy()
        };
        let data = TokenData {
            creator: Some("creator".to_string()),
            creator_balance: Some(900.0),
            total_supply: Some(1000.0),
            has_lock: Some(false),
            mintable: Some(true),
            liquidity: Some(0.5),
            removable_liquidity: Some(true),
            ..Default::default()
        };
        let auditor = auditor_with(&AuditConfig::default(), Arc::new(provider));
        let result = auditor.audit("rug", &data).await;

        // 30+20+25 + 15+20 + 10+15 + 50+15 + 10+5
        assert_eq!(result.score, 100 - 215);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result
            .risks
            .iter()
            .any(|r| r.severity == Severity::Critical));
    }

    #[tokio::test]
    async fn test_provider_failure_contributes_nothing() {
        let auditor = auditor_with(&AuditConfig::default(), Arc::new(FakeProvider::failing()));
        let result = auditor.audit("mint", &complete_token()).await;
        assert_eq!(result.score, 100);
        assert!(!result.details.contains_key("holderCount"));
        assert!(result.error.is_none());
        // rug (3 passes) + liquidity + contract
        assert_eq!(result.passed.len(), 5);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = FakeProvider {
            delay: Duration::from_secs(5),
            ..FakeProvider::healthy()
        };
        let auditor = auditor_with(&AuditConfig::default(), Arc::new(provider));
        let result = auditor.audit("mint", &complete_token()).await;
        assert!(!result.details.contains_key("holderCount"));
        assert!(result.passed.iter().any(|p| p.contains("honeypot")));
    }

    #[tokio::test]
    async fn test_disabling_a_check_leaves_others_unchanged() {
        let data = TokenData {
            liquidity: Some(3.0),
            mintable: Some(true),
            ..Default::default()
        };
        let provider = Arc::new(FakeProvider::healthy());

        let all = auditor_with(&AuditConfig::default(), provider.clone())
            .audit("mint", &data)
            .await;

        let mut config = AuditConfig::default();
        config.checks.rug_check = false;
        let without_rug = auditor_with(&config, provider).audit("mint", &data).await;

        assert_eq!(all.score - without_rug.score, -25);
        assert_eq!(all.warnings, without_rug.warnings);
        assert!(without_rug.risks.is_empty());
        assert_eq!(all.risks.len(), 1);
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_error() {
        let provider = FakeProvider {
            panic_on_honeypot: true,
            ..FakeProvider::healthy()
        };
        let auditor = auditor_with(&AuditConfig::default(), Arc::new(provider));
        let result = auditor.audit("mint", &complete_token()).await;
        assert_eq!(result.error.as_deref(), Some("detector exploded"));
        assert_eq!(result.risk_level, RiskLevel::from_score(result.score));
        // Checks before the failure still count
        assert_eq!(result.details["holderCount"], 500);
    }

    #[tokio::test]
    async fn test_from_config_simulated() {
        let providers = ProvidersConfig {
            simulated_latency_ms: 0,
            ..Default::default()
        };
        let auditor = RiskAuditor::from_config(&AuditConfig::default(), &providers).unwrap();
        let result = auditor.audit("mint", &TokenData::default()).await;
        assert_eq!(result.risk_level, RiskLevel::from_score(result.score));
        assert!(result.details.contains_key("holderCount"));
    }
}
