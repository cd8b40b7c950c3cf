//! Feed Adapter connection loop
//!
//! One connection at a time, always for the current target instrument:
//!
//! - dial failure: wait `dial_retry`, dial again, forever
//! - connection lost: wait `reconnect_delay`, dial again, forever
//! - target changed: drop the connection and dial the new target at once
//!
//! Every wait is cut short by a target change. The loop only returns once the
//! target channel is closed.

use crate::binance::parse_trade;
use crate::connector::{FeedConnector, FeedStream};
use crate::error::FeedError;
use bus::{Bus, BusError};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use types::control::{SymbolControl, SymbolQuery};
use types::instrument::normalize_symbol;

#[derive(Debug, Clone, Copy)]
pub struct AdapterSettings {
    pub dial_retry: Duration,
    pub reconnect_delay: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            dial_retry: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default)]
pub struct FeedMetrics {
    pub trades_published: AtomicU64,
    pub events_dropped: AtomicU64,
    pub connections_opened: AtomicU64,
    pub dial_failures: AtomicU64,
}

enum SessionEnd {
    Switched,
    Lost(FeedError),
    Shutdown,
}

pub struct FeedAdapter<C> {
    connector: C,
    bus: Arc<dyn Bus>,
    settings: AdapterSettings,
    metrics: Arc<FeedMetrics>,
}

impl<C: FeedConnector> FeedAdapter<C> {
    pub fn new(connector: C, bus: Arc<dyn Bus>, settings: AdapterSettings) -> Self {
        Self {
            connector,
            bus,
            settings,
            metrics: Arc::new(FeedMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<FeedMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Keep a connection open for whatever `target` holds.
    pub async fn run(&self, mut target: watch::Receiver<String>) {
        loop {
            let symbol = target.borrow_and_update().clone();
            info!(symbol = %symbol, "Dialing feed");

            let dialed = tokio::select! {
                result = self.connector.connect(&symbol) => result,
                changed = target.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
            };

            let stream = match dialed {
                Ok(stream) => stream,
                Err(err) => {
                    self.metrics.dial_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(symbol = %symbol, error = %err, "Feed dial failed, retrying in {:?}", self.settings.dial_retry);
                    if !pause(&mut target, self.settings.dial_retry).await {
                        return;
                    }
                    continue;
                }
            };

            self.metrics.connections_opened.fetch_add(1, Ordering::Relaxed);
            info!(symbol = %symbol, "Feed connected");

            match self.session(&symbol, stream, &mut target).await {
                SessionEnd::Switched => {
                    info!(from = %symbol, to = %target.borrow().as_str(), "Instrument switched, reconnecting");
                }
                SessionEnd::Lost(err) => {
                    warn!(symbol = %symbol, error = %err, "Feed connection lost, reconnecting in {:?}", self.settings.reconnect_delay);
                    if !pause(&mut target, self.settings.reconnect_delay).await {
                        return;
                    }
                }
                SessionEnd::Shutdown => return,
            }
        }
    }

    /// Pump one connection until it fails or the target moves on. The
    /// stream is dropped on return, which closes the connection.
    async fn session(
        &self,
        symbol: &str,
        mut stream: FeedStream,
        target: &mut watch::Receiver<String>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                biased;

                changed = target.changed() => {
                    if changed.is_err() {
                        return SessionEnd::Shutdown;
                    }
                    if *target.borrow() != symbol {
                        return SessionEnd::Switched;
                    }
                }

                frame = stream.next() => match frame {
                    None => return SessionEnd::Lost(FeedError::Closed),
                    Some(Ok(payload)) => self.forward(symbol, &payload).await,
                    Some(Err(err)) if err.is_connection_lost() => return SessionEnd::Lost(err),
                    Some(Err(err)) => self.drop_event(&err),
                }
            }
        }
    }

    async fn forward(&self, symbol: &str, payload: &str) {
        let trade = match parse_trade(payload, symbol) {
            Ok(trade) => trade,
            Err(err) => return self.drop_event(&err),
        };

        match bus::publish(self.bus.as_ref(), &trade).await {
            Ok(()) => {
                self.metrics.trades_published.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "Failed to publish trade");
            }
        }
    }

    fn drop_event(&self, err: &FeedError) {
        self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
        debug!(error = %err, "Dropping feed event");
    }
}

/// Wait out `delay` unless the target changes first. `false` once the target
/// channel is closed.
async fn pause(target: &mut watch::Receiver<String>, delay: Duration) -> bool {
    tokio::select! {
        _ = sleep(delay) => true,
        changed = target.changed() => changed.is_ok(),
    }
}

/// Start following `symbol-control` into a target channel seeded with
/// `initial`, then ask the hub to repeat its current decision so a restart
/// does not leave the adapter on an outdated instrument.
pub async fn watch_target(
    bus: Arc<dyn Bus>,
    initial: &str,
) -> Result<(watch::Receiver<String>, JoinHandle<Result<(), BusError>>), BusError> {
    let controls = bus::subscribe::<SymbolControl>(bus.as_ref()).await?;
    let (target_tx, target_rx) = watch::channel(normalize_symbol(initial));
    let listener = tokio::spawn(async move { follow_control(controls, &target_tx).await });

    if let Err(err) = bus::publish(bus.as_ref(), &SymbolQuery::new("feed-adapter")).await {
        warn!(error = %err, "Failed to query current instrument");
    }
    Ok((target_rx, listener))
}

/// Apply `symbol-control` messages to the adapter's target. Repeats of the
/// current instrument are ignored so the open connection is kept.
pub async fn follow_control(
    mut controls: BoxStream<'static, SymbolControl>,
    target: &watch::Sender<String>,
) -> Result<(), BusError> {
    while let Some(control) = controls.next().await {
        let symbol = normalize_symbol(&control.symbol);
        if symbol.is_empty() {
            debug!("Ignoring control message with empty symbol");
            continue;
        }

        let changed = target.send_if_modified(|current| {
            if *current == symbol {
                false
            } else {
                *current = symbol.clone();
                true
            }
        });
        if changed {
            info!(symbol = %symbol, "Feed target changed");
        }
    }

    Err(BusError::Transport("symbol-control subscription ended".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_follow_control_ignores_repeats() {
        let (tx, mut rx) = watch::channel("btcusdt".to_string());
        rx.borrow_and_update();

        let controls = stream::iter(vec![
            SymbolControl::new("BTCUSDT", 0),
            SymbolControl::new("", 0),
        ])
        .boxed();
        let _ = follow_control(controls, &tx).await;

        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), "btcusdt");
    }

    #[tokio::test]
    async fn test_follow_control_switches_target() {
        let (tx, mut rx) = watch::channel("btcusdt".to_string());
        rx.borrow_and_update();

        let controls = stream::iter(vec![SymbolControl::new("ethusdt", 0)]).boxed();
        let result = follow_control(controls, &tx).await;

        assert!(result.is_err());
        assert_eq!(*rx.borrow(), "ethusdt");
    }

    #[tokio::test]
    async fn test_watch_target_adopts_hub_decision() {
        let bus = Arc::new(bus::InMemoryBus::with_defaults());
        let mut queries = bus::subscribe::<SymbolQuery>(bus.as_ref()).await.unwrap();

        let dyn_bus: Arc<dyn Bus> = bus.clone();
        let (mut target, listener) = watch_target(dyn_bus, "BTCUSDT").await.unwrap();
        assert_eq!(*target.borrow_and_update(), "btcusdt");

        let query = queries.next().await.unwrap();
        assert_eq!(query.requester, "feed-adapter");
        bus::publish(bus.as_ref(), &SymbolControl::new("ethusdt", 3)).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), target.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*target.borrow(), "ethusdt");
        listener.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_is_cut_short_by_target_change() {
        let (tx, mut rx) = watch::channel("btcusdt".to_string());
        rx.borrow_and_update();

        let start = tokio::time::Instant::now();
        let waiter = tokio::spawn(async move { pause(&mut rx, Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send_replace("ethusdt".to_string());

        assert!(waiter.await.unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
