//! Individual audit checks
//!
//! Each check is a pure function from its inputs to a [`CheckOutcome`].
//! Checks never look at each other's results, so toggling one off leaves
//! every other check's findings untouched. Deductions are fixed point
//! values; the auditor sums them.

use chrono::{DateTime, Utc};

use crate::audit::config::AuditThresholds;
use crate::audit::providers::{HolderData, HoneypotReport};
use crate::audit::types::{CheckOutcome, Severity, TokenData};

pub const CREATOR_CONCENTRATION_PENALTY: i64 = 30;
pub const NO_LOCK_PENALTY: i64 = 20;
pub const MINTABLE_PENALTY: i64 = 25;
pub const LOW_LIQUIDITY_PENALTY: i64 = 15;
pub const REMOVABLE_LIQUIDITY_PENALTY: i64 = 20;
pub const FEW_HOLDERS_PENALTY: i64 = 10;
pub const TOP_HOLDER_PENALTY: i64 = 15;
pub const HONEYPOT_PENALTY: i64 = 50;
pub const HIGH_TAX_PENALTY: i64 = 15;
pub const NO_SOCIALS_PENALTY: i64 = 10;
pub const INCOMPLETE_METADATA_PENALTY: i64 = 5;

/// Rug-pull indicators: creator concentration, liquidity lock, mint authority
///
/// Attributes that are unknown are neither penalized nor passed.
pub fn rug_check(data: &TokenData, thresholds: &AuditThresholds) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();

    if let Some(creator_percent) = data.creator_percent() {
        outcome.detail("creatorPercent", round2(creator_percent));
        if creator_percent > thresholds.max_creator_percent {
            outcome.risk(
                CREATOR_CONCENTRATION_PENALTY,
                Severity::High,
                format!(
                    "Creator holds {:.2}% of supply, high risk of a dump",
                    creator_percent
                ),
            );
        } else {
            outcome.pass("Creator holding is within limits");
        }
    }

    match data.has_lock {
        Some(false) => outcome.warning(
            NO_LOCK_PENALTY,
            Severity::Medium,
            "No liquidity lock detected",
        ),
        Some(true) => outcome.pass("Liquidity is locked"),
        None => {}
    }

    match data.mintable {
        Some(true) => outcome.risk(
            MINTABLE_PENALTY,
            Severity::High,
            "Mint authority is active, supply can be inflated",
        ),
        Some(false) => outcome.pass("Mint authority revoked"),
        None => {}
    }

    outcome
}

/// Pool depth and whether liquidity can be pulled
pub fn liquidity_check(data: &TokenData, thresholds: &AuditThresholds) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    let liquidity = data.liquidity_sol();
    outcome.detail("liquidity", liquidity);

    if liquidity < thresholds.min_liquidity {
        outcome.warning(
            LOW_LIQUIDITY_PENALTY,
            Severity::Medium,
            format!("Liquidity too low: {:.2} SOL", liquidity),
        );
    } else {
        outcome.pass(format!("Sufficient liquidity: {:.2} SOL", liquidity));
    }

    if data.removable_liquidity == Some(true) {
        outcome.warning(
            REMOVABLE_LIQUIDITY_PENALTY,
            Severity::Medium,
            "Liquidity can be removed",
        );
    }

    outcome
}

/// Holder count and concentration of the largest holder
pub fn holder_check(holders: &HolderData, thresholds: &AuditThresholds) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    outcome.detail("holderCount", holders.count);
    outcome.detail("topHolderPercent", round2(holders.top_holder_percent));

    if holders.count < thresholds.min_holder_count {
        outcome.warning(
            FEW_HOLDERS_PENALTY,
            Severity::Low,
            format!("Few holders: {}", holders.count),
        );
    } else {
        outcome.pass(format!("Holder count: {}", holders.count));
    }

    if holders.top_holder_percent > thresholds.max_top_holder_percent {
        outcome.warning(
            TOP_HOLDER_PENALTY,
            Severity::Medium,
            format!(
                "Largest holder owns {:.2}% of supply",
                holders.top_holder_percent
            ),
        );
    } else {
        outcome.pass("Holder distribution looks healthy");
    }

    outcome
}

/// Honeypot verdict and trading taxes
///
/// The tax warning is independent of the honeypot verdict.
pub fn honeypot_check(report: &HoneypotReport, thresholds: &AuditThresholds) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();

    if report.is_honeypot {
        outcome.risk(
            HONEYPOT_PENALTY,
            Severity::Critical,
            "Honeypot characteristics detected, selling may be blocked",
        );
    } else {
        outcome.pass("No honeypot characteristics detected");
    }

    if report.buy_tax > thresholds.max_tax_percent || report.sell_tax > thresholds.max_tax_percent {
        outcome.warning(
            HIGH_TAX_PENALTY,
            Severity::Medium,
            format!(
                "Trading tax too high: buy {:.2}% / sell {:.2}%",
                report.buy_tax, report.sell_tax
            ),
        );
    }

    outcome
}

/// Social presence, metadata completeness and token age
pub fn contract_check(
    data: &TokenData,
    thresholds: &AuditThresholds,
    now: DateTime<Utc>,
) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();

    if data.has_socials() {
        outcome.pass("Social media links present");
    } else {
        outcome.warning(NO_SOCIALS_PENALTY, Severity::Low, "No social media links");
    }

    if data.name.is_none() || data.symbol.is_none() {
        outcome.warning(
            INCOMPLETE_METADATA_PENALTY,
            Severity::Low,
            "Token metadata incomplete (missing name or symbol)",
        );
    }

    if let Some(created_at) = data.created_at {
        let age_minutes = (now - created_at).num_milliseconds() as f64 / 60_000.0;
        outcome.detail("ageMinutes", age_minutes.round() as i64);

        // Informational only
        if age_minutes < thresholds.young_token_minutes {
            outcome.warning(
                0,
                Severity::Low,
                format!(
                    "Token created {:.0} minutes ago, consider observing before trading",
                    age_minutes
                ),
            );
        }
    }

    outcome
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
