//! CLI command implementations

use anyhow::{Context, Result};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audit::{AuditCache, RiskAuditor, TokenData};
use crate::config::Config;
use crate::error::Error;
use crate::monitor::{EventDispatcher, Reporter, StatsAggregator};
use crate::stream::logs::LogsSubscribeRequest;
use crate::stream::pumpportal::{self, PumpPortalNormalizer};
use crate::stream::{ConnectionManager, LogsNormalizer, MessageNormalizer, SourceConnection, SourceId};

/// Start the monitor and run until Ctrl-C
pub async fn run(config: &Config) -> Result<()> {
    info!("Starting DEX monitor...");

    let sources = config.enabled_sources();
    if sources.is_empty() {
        anyhow::bail!("No sources enabled, nothing to monitor");
    }

    let cache = if config.audit.enabled {
        info!(
            "Token audit enabled (auto-audit: {}, cache TTL: {}ms)",
            config.audit.auto_audit, config.audit.cache.ttl_ms
        );
        let auditor = RiskAuditor::from_config(&config.audit, &config.providers)
            .context("Failed to create risk auditor")?;
        Some(Arc::new(AuditCache::new(Arc::new(auditor), &config.audit.cache)))
    } else {
        info!("Token audit disabled");
        None
    };

    let shutdown = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(config.connection.channel_capacity);

    let mut connections = Vec::with_capacity(sources.len());
    for source in &sources {
        let (connection, normalizer) = source_connection(config, *source)?;
        info!("Connecting to {} at {}", source, connection.ws_url);
        let manager =
            ConnectionManager::new(connection, normalizer, event_tx.clone(), shutdown.clone());
        connections.push(manager.connect());
    }
    // Dispatcher sees end-of-stream once every connection task is gone
    drop(event_tx);

    let dispatcher = EventDispatcher::new(
        Arc::new(StatsAggregator::new(&sources)),
        cache,
        config.audit.auto_audit,
        Reporter::new(config.report.format),
        config.report.stats_interval(),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_rx, shutdown.clone()));

    info!("Monitor started with {} source(s). Press Ctrl-C to stop.", sources.len());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal, closing connections...");
    shutdown.cancel();

    for handle in connections {
        if let Err(e) = handle.await {
            warn!("Connection task ended abnormally: {}", e);
        }
    }

    let snapshot = dispatcher_handle.await.context("Dispatcher task failed")?;
    info!(elapsed_secs = snapshot.elapsed_secs, "Monitor stopped");

    Ok(())
}

/// Connection parameters and normalizer for one source
pub fn source_connection(
    config: &Config,
    source: SourceId,
) -> Result<(SourceConnection, Arc<dyn MessageNormalizer>)> {
    let normalizer: Arc<dyn MessageNormalizer> = match source {
        SourceId::PumpFun => Arc::new(PumpPortalNormalizer::new()),
        SourceId::Raydium => Arc::new(LogsNormalizer::raydium()),
        SourceId::Orca => Arc::new(LogsNormalizer::orca()),
    };

    let (ws_url, subscribe_messages) = match source {
        SourceId::PumpFun => {
            let pumpfun = &config.sources.pumpfun;
            let messages = pumpportal::subscriptions(
                pumpfun.subscribe_new_tokens,
                &pumpfun.token_trades,
                &pumpfun.account_trades,
            )
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
            (pumpfun.ws_url.clone(), messages)
        }
        SourceId::Raydium | SourceId::Orca => {
            let logs = if source == SourceId::Raydium {
                &config.sources.raydium
            } else {
                &config.sources.orca
            };
            let request = LogsSubscribeRequest::mentions(&logs.program_id, &logs.commitment);
            (logs.ws_url.clone(), vec![serde_json::to_string(&request)?])
        }
    };

    let connection = SourceConnection {
        source,
        ws_url,
        heartbeat_interval: config.connection.heartbeat_interval(),
        reconnect_delay: config.connection.reconnect_delay(),
        subscribe_messages,
    };

    Ok((connection, normalizer))
}

/// Audit a single token and print the report
pub async fn audit(config: &Config, mint: &str, data: Option<&str>) -> Result<()> {
    Pubkey::from_str(mint).map_err(|_| Error::InvalidAddress(mint.to_string()))?;

    let token_data = match data {
        Some(json) => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("--data must be a JSON object")?;
            TokenData::from_value(value)
        }
        None => {
            warn!("No token data given, only provider-backed checks will be meaningful");
            TokenData::default()
        }
    };

    let auditor = RiskAuditor::from_config(&config.audit, &config.providers)
        .context("Failed to create risk auditor")?;
    let result = auditor.audit(mint, &token_data).await;
    Reporter::new(config.report.format).audit(&result);

    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
