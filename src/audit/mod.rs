//! Token risk audit
//!
//! A fixed battery of checks scores each new token starting from 100.
//! Holder and honeypot data come from pluggable providers; results are
//! memoized per token for a short TTL.

pub mod auditor;
pub mod cache;
pub mod checks;
pub mod config;
pub mod providers;
pub mod types;

pub use auditor::RiskAuditor;
pub use cache::{AuditCache, AuditCacheStats};
pub use config::{AuditConfig, AuditThresholds, CheckToggles, ProviderKind, ProvidersConfig};
pub use providers::{
    HeliusHolderProvider, HolderData, HolderDataProvider, HoneypotProvider, HoneypotReport,
    HttpHoneypotProvider, SimulatedProvider,
};
pub use types::{AuditResult, Finding, RiskLevel, Severity, TokenData};
