//! `processed-trades` consumption
//!
//! One task applies samples to the cache in bus order, fans each applied
//! sample out to push subscribers and hands it to the storage writer. None
//! of these steps wait on a subscriber or on storage.

use crate::cache::ApplyOutcome;
use crate::metrics::HubMetrics;
use crate::state::AppState;
use bus::BusError;
use futures::StreamExt;
use futures::stream::BoxStream;
use persistence::{TradeRecord, TradeStore};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::sample::{PriceUpdate, ProcessedSample};

pub type SampleStream = BoxStream<'static, Result<ProcessedSample, serde_json::Error>>;

pub struct SampleConsumer {
    state: AppState,
    storage: Option<mpsc::Sender<TradeRecord>>,
}

impl SampleConsumer {
    pub fn new(state: AppState, storage: Option<mpsc::Sender<TradeRecord>>) -> Self {
        Self { state, storage }
    }

    pub fn handle(&self, sample: ProcessedSample) -> ApplyOutcome {
        let metrics = &self.state.metrics;
        let record = TradeRecord::from(&sample);
        let outcome = self.state.cache.apply(sample);

        match &outcome {
            ApplyOutcome::Applied => {
                HubMetrics::incr(&metrics.samples_applied);
                self.fan_out(record.price);
                self.persist(record);
            }
            ApplyOutcome::Stale { sample_symbol } => {
                HubMetrics::incr(&metrics.samples_stale);
                debug!(sample_symbol = %sample_symbol, "Discarding sample for previous instrument");
            }
        }
        outcome
    }

    fn fan_out(&self, price: f64) {
        let payload = match serde_json::to_string(&PriceUpdate { price }) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Failed to encode price update");
                return;
            }
        };

        let report = self.state.registry.broadcast(&payload);
        HubMetrics::add(&self.state.metrics.broadcasts_sent, report.delivered as u64);
        HubMetrics::add(&self.state.metrics.subscribers_dropped, report.dropped.len() as u64);
    }

    fn persist(&self, record: TradeRecord) {
        let Some(tx) = &self.storage else {
            return;
        };
        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                HubMetrics::incr(&self.state.metrics.storage_overflow);
                warn!(time = record.time, "Storage writer backlogged, sample not persisted");
            }
            Err(TrySendError::Closed(_)) => {
                HubMetrics::incr(&self.state.metrics.storage_failures);
                warn!("Storage writer stopped, sample not persisted");
            }
        }
    }

    /// Consume until the subscription ends.
    pub async fn run(self, mut samples: SampleStream) -> Result<(), BusError> {
        info!("Consuming processed samples");
        while let Some(decoded) = samples.next().await {
            match decoded {
                Ok(sample) => {
                    self.handle(sample);
                }
                Err(err) => {
                    HubMetrics::incr(&self.state.metrics.samples_malformed);
                    debug!(error = %err, "Dropping malformed sample");
                }
            }
        }
        Err(BusError::Transport("processed-trades subscription ended".into()))
    }
}

/// Spawn the task that appends samples to `store` in arrival order.
pub fn spawn_storage_writer(
    store: Arc<dyn TradeStore>,
    capacity: usize,
    metrics: Arc<HubMetrics>,
) -> (mpsc::Sender<TradeRecord>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<TradeRecord>(capacity.max(1));
    let handle = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match store.append(record).await {
                Ok(()) => HubMetrics::incr(&metrics.storage_writes),
                Err(err) => {
                    HubMetrics::incr(&metrics.storage_failures);
                    warn!(error = %err, "Failed to persist sample");
                }
            }
        }
        debug!("Storage writer stopped");
    });
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HubSettings;
    use bus::{Bus, InMemoryBus};
    use std::sync::atomic::Ordering;
    use types::instrument::lookup;

    fn sample(symbol: &str, price: f64, time: i64) -> ProcessedSample {
        ProcessedSample {
            symbol: symbol.to_string(),
            price,
            moving_average: price,
            high: price,
            low: price,
            time,
        }
    }

    fn active_state(symbol: &str) -> AppState {
        let bus: Arc<dyn Bus> = Arc::new(InMemoryBus::with_defaults());
        let state = AppState::new(bus, None, HubSettings::default());
        state.cache.switch_to(lookup(symbol).unwrap());
        state
    }

    #[tokio::test]
    async fn test_applied_sample_is_broadcast_and_queued_for_storage() {
        let state = active_state("btcusdt");
        let (_id, mut rx) = state.registry.register();
        let (tx, mut stored) = mpsc::channel(8);
        let consumer = SampleConsumer::new(state.clone(), Some(tx));

        assert_eq!(consumer.handle(sample("btcusdt", 43000.5, 7)), ApplyOutcome::Applied);

        assert_eq!(rx.recv().await.unwrap(), r#"{"price":43000.5}"#);
        let record = stored.recv().await.unwrap();
        assert_eq!(record.time, 7);
        assert_eq!(record.symbol, "btcusdt");
        assert_eq!(state.metrics.broadcasts_sent.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_stale_sample_is_neither_broadcast_nor_stored() {
        let state = active_state("ethusdt");
        let (_id, mut rx) = state.registry.register();
        let (tx, mut stored) = mpsc::channel(8);
        let consumer = SampleConsumer::new(state.clone(), Some(tx));

        let outcome = consumer.handle(sample("btcusdt", 43000.5, 7));
        assert!(matches!(outcome, ApplyOutcome::Stale { .. }));
        assert!(rx.try_recv().is_err());
        assert!(stored.try_recv().is_err());
        assert_eq!(state.metrics.samples_stale.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_storage_backlog_does_not_block() {
        let state = active_state("btcusdt");
        let (tx, _stored) = mpsc::channel(1);
        let consumer = SampleConsumer::new(state.clone(), Some(tx));

        consumer.handle(sample("btcusdt", 1.0, 1));
        consumer.handle(sample("btcusdt", 2.0, 2));

        assert_eq!(state.cache.price(), 2.0);
        assert_eq!(state.metrics.storage_overflow.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_run_counts_malformed_payloads() {
        let state = active_state("btcusdt");
        let consumer = SampleConsumer::new(state.clone(), None);

        let bad = serde_json::from_str::<ProcessedSample>("{}").unwrap_err();
        let items: Vec<Result<ProcessedSample, serde_json::Error>> =
            vec![Err(bad), Ok(sample("btcusdt", 5.0, 1))];

        let result = consumer.run(futures::stream::iter(items).boxed()).await;
        assert!(result.is_err());
        assert_eq!(state.metrics.samples_malformed.load(Ordering::Relaxed), 1);
        assert_eq!(state.cache.price(), 5.0);
    }
}
