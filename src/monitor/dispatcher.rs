//! Event dispatcher
//!
//! Single consumer of the normalized event channel. Every event is counted
//! and reported; new tokens are handed to the audit cache on a spawned task
//! so a slow provider never holds up counting. A ticker emits a stats
//! snapshot on a fixed period regardless of traffic.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::audit::cache::AuditCache;
use crate::audit::types::TokenData;
use crate::monitor::report::Reporter;
use crate::monitor::stats::{StatsAggregator, StatsSnapshot};
use crate::stream::event::{EventKind, NormalizedEvent};

/// Routes events to counters, reports and the auditor
pub struct EventDispatcher {
    stats: Arc<StatsAggregator>,
    /// `None` when auditing is disabled
    cache: Option<Arc<AuditCache>>,
    auto_audit: bool,
    reporter: Reporter,
    stats_interval: Duration,
    audits: TaskTracker,
    snapshot_tx: watch::Sender<Option<StatsSnapshot>>,
}

impl EventDispatcher {
    pub fn new(
        stats: Arc<StatsAggregator>,
        cache: Option<Arc<AuditCache>>,
        auto_audit: bool,
        reporter: Reporter,
        stats_interval: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            stats,
            cache,
            auto_audit,
            reporter,
            stats_interval,
            audits: TaskTracker::new(),
            snapshot_tx,
        }
    }

    /// Watch the most recently emitted stats snapshot
    pub fn snapshots(&self) -> watch::Receiver<Option<StatsSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Consume events until shutdown or until every sender is gone.
    ///
    /// Returns the final stats snapshot, which is also reported.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<NormalizedEvent>,
        shutdown: CancellationToken,
    ) -> StatsSnapshot {
        let mut ticker = interval_at(Instant::now() + self.stats_interval, self.stats_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Dispatcher started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(pending_audits = self.audits.len(), "Dispatcher shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        info!("All sources closed, waiting for pending audits");
                        self.audits.close();
                        self.audits.wait().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
        self.audits.close();

        self.emit_stats()
    }

    fn handle(&self, event: NormalizedEvent) {
        self.stats.record(&event);
        self.reporter.event(&event);

        if event.kind != EventKind::TokenCreated || !self.auto_audit {
            return;
        }
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let Some(token) = event.token.clone() else {
            warn!("{} create event without a token address, skipping audit", event.source);
            return;
        };

        self.stats.record_audit(event.source);
        let data = TokenData::from_fields(&event.fields);
        let reporter = self.reporter;
        debug!(token = %token, "Dispatching audit");

        self.audits.spawn(async move {
            let result = cache.get_or_compute(&token, &data).await;
            reporter.audit(&result);
        });
    }

    fn tick(&self) -> StatsSnapshot {
        if let Some(cache) = &self.cache {
            cache.purge_expired();
            debug!(
                cached = cache.len(),
                hit_rate = cache.stats().hit_rate(),
                "Audit cache status"
            );
        }
        self.emit_stats()
    }

    fn emit_stats(&self) -> StatsSnapshot {
        let snapshot = self.stats.snapshot();
        self.reporter.stats(&snapshot);
        self.snapshot_tx.send_replace(Some(snapshot.clone()));
        snapshot
    }
}
