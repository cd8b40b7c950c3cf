//! Aggregation Hub
//!
//! Caches the latest processed sample, serves it over HTTP, fans price
//! updates out to WebSocket subscribers, writes history to storage, and owns
//! the instrument switch protocol.

pub mod cache;
pub mod config;
pub mod consumer;
pub mod control;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod router;
pub mod state;

use bus::{Bus, BusError};
use consumer::{SampleConsumer, spawn_storage_writer};
use persistence::TradeStore;
use state::{AppState, HubSettings};
use std::sync::Arc;
use tokio::task::JoinHandle;
use types::control::SymbolQuery;
use types::sample::ProcessedSample;

/// Storage writer queue depth.
const STORAGE_QUEUE: usize = 1024;

/// Background tasks of a running hub.
pub struct HubTasks {
    pub consumer: JoinHandle<Result<(), BusError>>,
    pub query_responder: JoinHandle<Result<(), BusError>>,
    pub storage_writer: Option<JoinHandle<()>>,
}

/// Build the hub state, make `symbol` current and start consuming samples.
///
/// The sample and query subscriptions are opened before the startup control
/// message is published, so no sample produced after the switch and no query
/// sent after it is missed.
pub async fn start(
    bus: Arc<dyn Bus>,
    store: Option<Arc<dyn TradeStore>>,
    symbol: &str,
    settings: HubSettings,
) -> anyhow::Result<(AppState, HubTasks)> {
    let state = AppState::new(bus, store, settings);

    let (storage_tx, storage_writer) = match &state.store {
        Some(store) => {
            let (tx, handle) = spawn_storage_writer(store.clone(), STORAGE_QUEUE, state.metrics.clone());
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    let samples = bus::typed::subscribe_decoded::<ProcessedSample>(state.bus.as_ref()).await?;
    let queries = bus::subscribe::<SymbolQuery>(state.bus.as_ref()).await?;
    control::switch_instrument(&state, symbol).await?;

    let consumer = tokio::spawn(SampleConsumer::new(state.clone(), storage_tx).run(samples));
    let query_responder = tokio::spawn(control::answer_queries(state.clone(), queries));

    Ok((
        state,
        HubTasks {
            consumer,
            query_responder,
            storage_writer,
        },
    ))
}
