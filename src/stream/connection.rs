//! Supervised WebSocket connection per source
//!
//! Each source gets one background task that loops
//! connect → subscribe → read until failure → sleep → reconnect,
//! for as long as the process runs. Reconnects use a fixed delay with no
//! attempt cap. The task only stops when the shared cancellation token
//! fires, at which point an open socket is closed cleanly.

use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::stream::event::{NormalizedEvent, SourceId};
use crate::stream::normalizer::MessageNormalizer;

/// Lifecycle state of a source connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Connection parameters for one source
#[derive(Debug, Clone)]
pub struct SourceConnection {
    pub source: SourceId,
    /// WebSocket endpoint
    pub ws_url: String,
    /// Protocol-level ping interval while open
    pub heartbeat_interval: Duration,
    /// Fixed wait between a failure and the next connect attempt
    pub reconnect_delay: Duration,
    /// Text frames sent right after every successful open
    pub subscribe_messages: Vec<String>,
}

/// Owns one persistent connection for a source
pub struct ConnectionManager {
    connection: SourceConnection,
    normalizer: Arc<dyn MessageNormalizer>,
    event_tx: mpsc::Sender<NormalizedEvent>,
    shutdown: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
}

/// How a single connection session ended
enum SessionEnd {
    /// Server closed or stream ended; reconnect
    Dropped,
    /// Shutdown requested or nobody is consuming events; stop for good
    Stop,
}

impl ConnectionManager {
    pub fn new(
        connection: SourceConnection,
        normalizer: Arc<dyn MessageNormalizer>,
        event_tx: mpsc::Sender<NormalizedEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            connection,
            normalizer,
            event_tx,
            shutdown,
            state_tx,
        }
    }

    pub fn source(&self) -> SourceId {
        self.connection.source
    }

    /// Watch the connection state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Start the supervised connection task and return immediately
    pub fn connect(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let source = self.connection.source;
        info!("{}: connecting to {}", source, self.connection.ws_url);

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            self.state_tx.send_replace(ConnectionState::Connecting);
            match self.session().await {
                Ok(SessionEnd::Stop) => break,
                Ok(SessionEnd::Dropped) => {
                    warn!(
                        "{}: connection closed, reconnecting in {:?}...",
                        source, self.connection.reconnect_delay
                    );
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "{}: {} (reconnecting in {:?})",
                        source, e, self.connection.reconnect_delay
                    );
                }
                Err(e) => {
                    error!(
                        "{}: {} (retrying in {:?})",
                        source, e, self.connection.reconnect_delay
                    );
                }
            }

            self.state_tx.send_replace(ConnectionState::Reconnecting);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(self.connection.reconnect_delay) => {}
            }
        }

        self.state_tx.send_replace(ConnectionState::Closed);
        info!("{}: connection task stopped", source);
    }

    /// One connect → subscribe → stream session
    async fn session(&self) -> Result<SessionEnd> {
        let source = self.connection.source;
        let url = url::Url::parse(&self.connection.ws_url)
            .map_err(|e| Error::Config(format!("Invalid WebSocket URL: {}", e)))?;

        let ws_stream = tokio::select! {
            _ = self.shutdown.cancelled() => return Ok(SessionEnd::Stop),
            connected = connect_async(url) => {
                connected
                    .map_err(|e| Error::Connection(format!("WebSocket connect failed: {}", e)))?
                    .0
            }
        };

        self.state_tx.send_replace(ConnectionState::Open);
        info!("{}: connected", source);

        let (mut write, mut read) = ws_stream.split();

        for request in &self.connection.subscribe_messages {
            write
                .send(Message::Text(request.clone()))
                .await
                .map_err(|e| Error::Subscribe(e.to_string()))?;
            debug!("{}: sent subscribe request {}", source, request);
        }
        info!(
            "{}: subscribed ({} request(s))",
            source,
            self.connection.subscribe_messages.len()
        );

        let period = self.connection.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    info!("{}: closing connection on shutdown", source);
                    return Ok(SessionEnd::Stop);
                }

                _ = heartbeat.tick() => {
                    // A failed ping is not a failure; the read side notices dead sockets
                    match write.send(Message::Ping(Vec::new())).await {
                        Ok(()) => debug!("{}: sent ping", source),
                        Err(e) => debug!("{}: ping failed: {}", source, e),
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !self.forward(&text).await {
                                return Ok(SessionEnd::Stop);
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                            Ok(text) => {
                                if !self.forward(&text).await {
                                    return Ok(SessionEnd::Stop);
                                }
                            }
                            Err(_) => debug!("{}: ignoring non-UTF-8 binary frame", source),
                        },
                        Some(Ok(Message::Pong(_))) => debug!("{}: received pong", source),
                        Some(Ok(Message::Close(frame))) => {
                            info!("{}: closed by server: {:?}", source, frame);
                            return Ok(SessionEnd::Dropped);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            info!("{}: stream ended", source);
                            return Ok(SessionEnd::Dropped);
                        }
                    }
                }
            }
        }
    }

    /// Normalize a frame and hand it to the dispatcher.
    /// Returns false once the dispatcher is gone.
    async fn forward(&self, text: &str) -> bool {
        let Some(event) = self.normalizer.parse(text) else {
            return true;
        };
        if self.event_tx.send(event).await.is_err() {
            warn!("{}: event receiver dropped, stopping", self.connection.source);
            return false;
        }
        true
    }
}
