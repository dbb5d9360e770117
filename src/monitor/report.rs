//! Console rendering of events, audit results and stats
//!
//! Everything is rendered either as human-readable text blocks or as one
//! JSON document per line.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::warn;

use crate::audit::types::{AuditResult, Finding};
use crate::error::Result;
use crate::monitor::stats::StatsSnapshot;
use crate::stream::event::{EventKind, NormalizedEvent, SourceId, TradeSide};

const RULE_WIDTH: usize = 70;
const LOG_LINE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 80;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Explorer link for a transaction
pub fn solscan_tx_url(signature: &str) -> String {
    format!("https://solscan.io/tx/{}", signature)
}

/// Writes reports to stdout in the configured format
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Print an event report. Unclassified events are only counted.
    pub fn event(&self, event: &NormalizedEvent) {
        if event.kind == EventKind::Unclassified {
            return;
        }
        self.emit(render_event(event, self.format));
    }

    pub fn audit(&self, result: &AuditResult) {
        self.emit(render_audit(result, self.format));
    }

    pub fn stats(&self, snapshot: &StatsSnapshot) {
        self.emit(render_stats(snapshot, self.format));
    }

    fn emit(&self, rendered: Result<String>) {
        match rendered {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Failed to render report: {}", e),
        }
    }
}

pub fn render_event(event: &NormalizedEvent, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string(event)?),
        ReportFormat::Text => Ok(match event.kind {
            EventKind::TokenCreated => token_created_text(event),
            EventKind::Trade(side) => trade_text(event, side),
            EventKind::Swap
            | EventKind::LiquidityAdded
            | EventKind::LiquidityRemoved
            | EventKind::Unclassified => transaction_text(event),
        }),
    }
}

pub fn render_audit(result: &AuditResult, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string(result)?),
        ReportFormat::Text => Ok(audit_text(result)),
    }
}

pub fn render_stats(snapshot: &StatsSnapshot, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string(snapshot)?),
        ReportFormat::Text => Ok(stats_text(snapshot)),
    }
}

fn header(out: &mut String, rule: char, title: &str) {
    let line: String = std::iter::repeat(rule).take(RULE_WIDTH).collect();
    let _ = writeln!(out, "\n{}", line);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", line);
}

fn footer(out: &mut String, rule: char) {
    out.extend(std::iter::repeat(rule).take(RULE_WIDTH));
}

fn local_time(event: &NormalizedEvent) -> String {
    event
        .timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut short: String = text.chars().take(max_chars).collect();
        short.push_str("...");
        short
    } else {
        text.to_string()
    }
}

fn token_created_text(event: &NormalizedEvent) -> String {
    let mut out = String::new();
    header(&mut out, '=', &format!("{} - new token", event.source));

    let field = |key: &str| event.field_str(key).unwrap_or("N/A");
    let _ = writeln!(out, "Time:     {}", local_time(event));
    let _ = writeln!(out, "Address:  {}", event.token.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "Name:     {}", field("name"));
    let _ = writeln!(out, "Symbol:   {}", field("symbol"));
    let creator = event
        .field_str("traderPublicKey")
        .or_else(|| event.field_str("creator"))
        .unwrap_or("N/A");
    let _ = writeln!(out, "Creator:  {}", creator);

    if let Some(description) = event.field_str("description").filter(|d| !d.is_empty()) {
        let _ = writeln!(
            out,
            "About:    {}",
            truncate(description, DESCRIPTION_MAX_CHARS)
        );
    }
    for (label, key) in [("Twitter", "twitter"), ("Telegram", "telegram"), ("Website", "website")] {
        if let Some(link) = event.field_str(key).filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "{:<9} {}", format!("{}:", label), link);
        }
    }

    footer(&mut out, '=');
    out
}

fn trade_text(event: &NormalizedEvent, side: TradeSide) -> String {
    let mut out = String::new();
    let title = match side {
        TradeSide::Buy => "buy",
        TradeSide::Sell => "sell",
    };
    header(&mut out, '-', &format!("{} - {}", event.source, title));

    let mint = event.token.as_deref().unwrap_or("N/A");
    let _ = writeln!(out, "Time:     {}", local_time(event));
    let _ = writeln!(out, "Token:    {}", event.field_str("symbol").unwrap_or(mint));
    let _ = writeln!(out, "Address:  {}", mint);
    let _ = writeln!(
        out,
        "Trader:   {}",
        event.field_str("traderPublicKey").unwrap_or("N/A")
    );

    let sol_amount = event
        .field_f64("solAmount")
        .or_else(|| event.field_f64("amount"))
        .unwrap_or(0.0);
    let token_amount = event.field_f64("tokenAmount").unwrap_or(0.0);
    match side {
        TradeSide::Buy => {
            let _ = writeln!(out, "Paid:     {:.4} SOL", sol_amount);
            let _ = writeln!(out, "Received: {:.0} tokens", token_amount);
        }
        TradeSide::Sell => {
            let _ = writeln!(out, "Sold:     {:.0} tokens", token_amount);
            let _ = writeln!(out, "Received: {:.4} SOL", sol_amount);
        }
    }

    if sol_amount > 0.0 && token_amount > 0.0 {
        let _ = writeln!(out, "Price:    {:.4e} SOL/token", sol_amount / token_amount);
    }
    if let Some(market_cap) = event.field_f64("marketCapSol") {
        let _ = writeln!(out, "Mcap:     {:.2} SOL", market_cap);
    }
    let _ = writeln!(out, "Tx:       {}", event.signature().unwrap_or("N/A"));

    footer(&mut out, '-');
    out
}

fn transaction_text(event: &NormalizedEvent) -> String {
    let mut out = String::new();
    header(&mut out, '-', &format!("{} - {}", event.source, event.kind));

    let signature = event.signature().unwrap_or("N/A");
    let _ = writeln!(out, "Time:     {}", local_time(event));
    let _ = writeln!(out, "Tx:       {}", signature);
    let _ = writeln!(out, "Logs:");
    if let Some(lines) = event.fields.get("logs").and_then(|v| v.as_array()) {
        for line in lines.iter().filter_map(|l| l.as_str()) {
            let _ = writeln!(out, "   {}", truncate(line, LOG_LINE_MAX_CHARS));
        }
    }
    let _ = writeln!(out, "Explorer: {}", solscan_tx_url(signature));

    footer(&mut out, '-');
    out
}

fn findings(out: &mut String, title: &str, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}:", title);
    for finding in findings {
        let _ = writeln!(out, "  [{}] {}", finding.severity, finding.message);
    }
    out.push('\n');
}

fn audit_text(result: &AuditResult) -> String {
    let mut out = String::new();
    header(&mut out, '=', "AUDIT REPORT");

    let _ = writeln!(out, "Token:      {}", result.token_address);
    let _ = writeln!(
        out,
        "Audited at: {}",
        result
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    out.push('\n');
    let _ = writeln!(
        out,
        "Risk level: {} ({})",
        result.risk_level,
        result.risk_level.label()
    );
    let _ = writeln!(out, "Score:      {} / 100", result.score);
    out.push('\n');

    if !result.passed.is_empty() {
        let _ = writeln!(out, "Passed:");
        for item in &result.passed {
            let _ = writeln!(out, "  + {}", item);
        }
        out.push('\n');
    }

    findings(&mut out, "Warnings", &result.warnings);
    findings(&mut out, "Risks", &result.risks);

    if !result.details.is_empty() {
        let _ = writeln!(out, "Details:");
        for (key, value) in &result.details {
            let _ = writeln!(out, "  {}: {}", key, value);
        }
        out.push('\n');
    }

    if let Some(error) = &result.error {
        let _ = writeln!(out, "Audit error: {}", error);
        out.push('\n');
    }

    let _ = writeln!(out, "Advice:");
    let _ = writeln!(out, "  {}", result.risk_level.advice());

    footer(&mut out, '=');
    out
}

fn stats_text(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();
    header(&mut out, '=', "MONITOR STATS");

    let elapsed = snapshot.elapsed_secs;
    let _ = writeln!(out, "Uptime: {}m {}s", elapsed / 60, elapsed % 60);

    for stats in &snapshot.sources {
        let c = &stats.counts;
        let _ = writeln!(out, "\n{}:", stats.source);
        let _ = match stats.source {
            SourceId::PumpFun => writeln!(
                out,
                "  Events: {} | Created: {} | Buys: {} | Sells: {} | Audited: {}",
                c.total, c.created, c.buys, c.sells, c.audited
            ),
            SourceId::Raydium | SourceId::Orca => writeln!(
                out,
                "  Events: {} | Swaps: {} | Liquidity added: {} | Liquidity removed: {}",
                c.total, c.swaps, c.liquidity_added, c.liquidity_removed
            ),
        };
    }

    footer(&mut out, '=');
    out
}
