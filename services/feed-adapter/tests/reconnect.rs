//! Connection loop behaviour against a scripted venue

use async_trait::async_trait;
use bus::{subscribe, Bus, InMemoryBus};
use feed_adapter::{AdapterSettings, FeedAdapter, FeedConnector, FeedError, FeedStream};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use types::trade::Trade;

/// Counts open connections; dropped together with the stream.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct ScriptedVenue {
    failures_left: Arc<AtomicUsize>,
    dialed: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
    /// Sender side of each accepted connection, in dial order.
    sessions: Arc<Mutex<Vec<mpsc::UnboundedSender<Result<String, FeedError>>>>>,
}

impl ScriptedVenue {
    fn failing(times: usize) -> Self {
        let venue = Self::default();
        venue.failures_left.store(times, Ordering::SeqCst);
        venue
    }

    fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }

    fn session(&self, index: usize) -> mpsc::UnboundedSender<Result<String, FeedError>> {
        self.sessions.lock().unwrap()[index].clone()
    }

    fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedConnector for ScriptedVenue {
    async fn connect(&self, symbol: &str) -> Result<FeedStream, FeedError> {
        self.dialed.lock().unwrap().push(symbol.to_string());

        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(FeedError::Dial("connection refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap().push(tx);
        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(self.live.clone());

        Ok(futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|frame| (frame, (rx, guard)))
        })
        .boxed())
    }
}

fn trade_event(price: &str, time: i64) -> Result<String, FeedError> {
    Ok(format!(r#"{{"e":"trade","s":"BTCUSDT","p":"{price}","T":{time}}}"#))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn start(
    venue: ScriptedVenue,
    symbol: &str,
) -> (Arc<InMemoryBus>, watch::Sender<String>, tokio::task::JoinHandle<()>, Arc<feed_adapter::FeedMetrics>) {
    let bus = Arc::new(InMemoryBus::with_defaults());
    let dyn_bus: Arc<dyn Bus> = bus.clone();
    let adapter = FeedAdapter::new(venue, dyn_bus, AdapterSettings::default());
    let metrics = adapter.metrics();

    let (tx, rx) = watch::channel(symbol.to_string());
    let handle = tokio::spawn(async move { adapter.run(rx).await });
    (bus, tx, handle, metrics)
}

#[tokio::test(start_paused = true)]
async fn test_three_dial_failures_then_one_connection() {
    let venue = ScriptedVenue::failing(3);
    let started = Instant::now();
    let (bus, _target, handle, metrics) = start(venue.clone(), "btcusdt");
    let mut trades = subscribe::<Trade>(bus.as_ref()).await.unwrap();

    wait_until(|| venue.session_count() == 1).await;
    // Three fixed 5s waits before the fourth dial.
    assert!(started.elapsed() >= Duration::from_secs(15));

    venue.session(0).send(trade_event("43250.12", 1)).unwrap();
    let trade = trades.next().await.unwrap();
    assert_eq!(trade, Trade::new("btcusdt", 43250.12, 1));

    assert_eq!(venue.dialed().len(), 4);
    assert_eq!(venue.live.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.connections_opened.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.dial_failures.load(Ordering::Relaxed), 3);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_lost_connection_is_redialed() {
    let venue = ScriptedVenue::default();
    let (_bus, _target, handle, metrics) = start(venue.clone(), "btcusdt");

    wait_until(|| venue.session_count() == 1).await;
    let lost_at = Instant::now();
    venue.session(0).send(Err(FeedError::Closed)).unwrap();

    wait_until(|| venue.session_count() == 2).await;
    assert!(lost_at.elapsed() >= Duration::from_secs(2));
    assert_eq!(venue.live.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.connections_opened.load(Ordering::Relaxed), 2);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_switch_replaces_connection_immediately() {
    let venue = ScriptedVenue::default();
    let (bus, target, handle, _metrics) = start(venue.clone(), "btcusdt");
    let mut trades = subscribe::<Trade>(bus.as_ref()).await.unwrap();

    wait_until(|| venue.session_count() == 1).await;
    let switched_at = Instant::now();
    target.send_replace("ethusdt".to_string());

    wait_until(|| venue.session_count() == 2).await;
    assert!(switched_at.elapsed() < Duration::from_secs(1));
    assert_eq!(venue.dialed(), vec!["btcusdt", "ethusdt"]);
    assert_eq!(venue.live.load(Ordering::SeqCst), 1);

    venue.session(1).send(trade_event("2300.5", 9)).unwrap();
    let trade = trades.next().await.unwrap();
    assert_eq!(trade.symbol, "ethusdt");

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_bad_events_are_dropped_without_disconnect() {
    let venue = ScriptedVenue::default();
    let (bus, _target, handle, metrics) = start(venue.clone(), "btcusdt");
    let mut trades = subscribe::<Trade>(bus.as_ref()).await.unwrap();

    wait_until(|| venue.session_count() == 1).await;
    let session = venue.session(0);
    session.send(Ok("not json".into())).unwrap();
    session.send(trade_event("0.00000000", 1)).unwrap();
    session.send(Err(FeedError::Malformed("invalid utf-8".into()))).unwrap();
    session.send(trade_event("100.5", 2)).unwrap();

    let trade = trades.next().await.unwrap();
    assert_eq!(trade.price, 100.5);
    assert_eq!(metrics.events_dropped.load(Ordering::Relaxed), 3);
    assert_eq!(venue.session_count(), 1);

    handle.abort();
}
