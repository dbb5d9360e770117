//! Per-source event counters
//!
//! `total` counts every well-formed message from a source, including
//! unclassified ones, so it can exceed the sum of the per-kind counters.
//! Counters only ever increase. They are plain atomics so connection-side
//! and audit-side code can update them without locking.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::stream::event::{EventKind, NormalizedEvent, SourceId, TradeSide};

/// Live counters for one source
#[derive(Default)]
pub struct SourceCounters {
    pub total: AtomicU64,
    pub created: AtomicU64,
    pub buys: AtomicU64,
    pub sells: AtomicU64,
    pub swaps: AtomicU64,
    pub liquidity_added: AtomicU64,
    pub liquidity_removed: AtomicU64,
    pub audited: AtomicU64,
}

impl SourceCounters {
    fn record(&self, kind: EventKind) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            EventKind::TokenCreated => &self.created,
            EventKind::Trade(TradeSide::Buy) => &self.buys,
            EventKind::Trade(TradeSide::Sell) => &self.sells,
            EventKind::Swap => &self.swaps,
            EventKind::LiquidityAdded => &self.liquidity_added,
            EventKind::LiquidityRemoved => &self.liquidity_removed,
            EventKind::Unclassified => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SourceCounts {
        SourceCounts {
            total: self.total.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            buys: self.buys.load(Ordering::Relaxed),
            sells: self.sells.load(Ordering::Relaxed),
            swaps: self.swaps.load(Ordering::Relaxed),
            liquidity_added: self.liquidity_added.load(Ordering::Relaxed),
            liquidity_removed: self.liquidity_removed.load(Ordering::Relaxed),
            audited: self.audited.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of one source's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCounts {
    pub total: u64,
    pub created: u64,
    pub buys: u64,
    pub sells: u64,
    pub swaps: u64,
    pub liquidity_added: u64,
    pub liquidity_removed: u64,
    pub audited: u64,
}

/// Periodic stats report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub sources: Vec<SourceStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub source: SourceId,
    #[serde(flatten)]
    pub counts: SourceCounts,
}

impl StatsSnapshot {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs(self.elapsed_secs)
    }

    pub fn get(&self, source: SourceId) -> Option<&SourceCounts> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .map(|s| &s.counts)
    }
}

/// Counters for every enabled source, since process start
pub struct StatsAggregator {
    started_at: Instant,
    sources: Vec<(SourceId, SourceCounters)>,
}

impl StatsAggregator {
    pub fn new(sources: &[SourceId]) -> Self {
        Self {
            started_at: Instant::now(),
            sources: sources
                .iter()
                .map(|source| (*source, SourceCounters::default()))
                .collect(),
        }
    }

    fn counters(&self, source: SourceId) -> Option<&SourceCounters> {
        self.sources
            .iter()
            .find(|(id, _)| *id == source)
            .map(|(_, counters)| counters)
    }

    /// Count one normalized event
    pub fn record(&self, event: &NormalizedEvent) {
        match self.counters(event.source) {
            Some(counters) => counters.record(event.kind),
            None => debug!("Ignoring event from untracked source {}", event.source),
        }
    }

    pub fn record_audit(&self, source: SourceId) {
        if let Some(counters) = self.counters(source) {
            counters.audited.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            taken_at: Utc::now(),
            elapsed_secs: self.started_at.elapsed().as_secs(),
            sources: self
                .sources
                .iter()
                .map(|(source, counters)| SourceStats {
                    source: *source,
                    counts: counters.snapshot(),
                })
                .collect(),
        }
    }
}
