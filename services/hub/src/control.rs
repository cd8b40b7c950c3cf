//! Instrument switch protocol
//!
//! The hub is the only writer of `symbol-control`. A switch validates the
//! symbol, makes it current (dropping the cached sample), then announces it.
//! Downstream components converge on their own; nothing waits for them.
//!
//! A component that starts later asks on `symbol-query`, and the hub repeats
//! the current announcement with the epoch of the switch it describes.

use crate::error::AppError;
use crate::metrics::HubMetrics;
use crate::state::AppState;
use bus::BusError;
use futures::StreamExt;
use futures::stream::BoxStream;
use thiserror::Error;
use tracing::{debug, info, warn};
use types::control::{SymbolControl, SymbolQuery};
use types::errors::InstrumentError;
use types::instrument::{self, Instrument};

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error(transparent)]
    Unknown(#[from] InstrumentError),

    /// State already changed; repeating the switch republishes.
    #[error("instrument set to {symbol} but the control message was not published: {source}")]
    Publish { symbol: String, source: BusError },
}

impl From<SwitchError> for AppError {
    fn from(err: SwitchError) -> Self {
        match err {
            SwitchError::Unknown(e) => AppError::BadRequest(e.to_string()),
            e @ SwitchError::Publish { .. } => AppError::ServiceUnavailable(e.to_string()),
        }
    }
}

/// Switch the pipeline to `symbol`.
///
/// Unknown symbols are rejected before any state changes. Switching to the
/// current instrument still clears the cached sample and republishes.
pub async fn switch_instrument(state: &AppState, symbol: &str) -> Result<Instrument, SwitchError> {
    let instrument = instrument::lookup(symbol)?;

    // Held across the publish so announcements go out in switch order.
    let _gate = state.switch_gate.lock().await;

    let previous = state.cache.switch_to(instrument.clone());
    HubMetrics::incr(&state.metrics.instrument_switches);
    info!(
        from = previous.as_ref().map_or("-", |p| p.symbol.as_str()),
        to = %instrument.symbol,
        "Instrument switched"
    );

    let control = SymbolControl::new(instrument.symbol.clone(), state.cache.epoch());
    if let Err(source) = bus::publish(state.bus.as_ref(), &control).await {
        warn!(symbol = %instrument.symbol, error = %source, "Failed to publish control message");
        return Err(SwitchError::Publish {
            symbol: instrument.symbol,
            source,
        });
    }

    Ok(instrument)
}

/// Repeat the current announcement. Idle hubs have nothing to repeat.
pub async fn reannounce(state: &AppState) -> Result<Option<SymbolControl>, BusError> {
    let _gate = state.switch_gate.lock().await;

    let Some(control) = state.cache.announcement() else {
        return Ok(None);
    };
    bus::publish(state.bus.as_ref(), &control).await?;
    HubMetrics::incr(&state.metrics.reannouncements);
    Ok(Some(control))
}

/// Answer `symbol-query` requests until the subscription ends.
pub async fn answer_queries(
    state: AppState,
    mut queries: BoxStream<'static, SymbolQuery>,
) -> Result<(), BusError> {
    while let Some(query) = queries.next().await {
        match reannounce(&state).await {
            Ok(Some(control)) => {
                debug!(requester = %query.requester, symbol = %control.symbol, "Instrument re-announced");
            }
            Ok(None) => debug!(requester = %query.requester, "Query while idle"),
            Err(err) => warn!(requester = %query.requester, error = %err, "Failed to re-announce instrument"),
        }
    }
    Err(BusError::Transport("symbol-query subscription ended".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HubSettings;
    use bus::{Bus, InMemoryBus};
    use futures::StreamExt;
    use std::sync::Arc;
    use types::sample::ProcessedSample;

    fn state_with_bus() -> (AppState, Arc<InMemoryBus>) {
        let bus = Arc::new(InMemoryBus::with_defaults());
        let dyn_bus: Arc<dyn Bus> = bus.clone();
        (AppState::new(dyn_bus, None, HubSettings::default()), bus)
    }

    #[tokio::test]
    async fn test_switch_publishes_control() {
        let (state, bus) = state_with_bus();
        let mut controls = bus::subscribe::<SymbolControl>(bus.as_ref()).await.unwrap();

        let instrument = switch_instrument(&state, "SOLUSDT").await.unwrap();
        assert_eq!(instrument.symbol, "solusdt");
        assert_eq!(instrument.name, "Solana (SOL)");
        assert_eq!(state.cache.instrument(), Some(instrument));
        assert_eq!(controls.next().await, Some(SymbolControl::new("solusdt", 1)));
    }

    #[tokio::test]
    async fn test_unknown_symbol_changes_nothing() {
        let (state, bus) = state_with_bus();
        switch_instrument(&state, "btcusdt").await.unwrap();
        let mut controls = bus::subscribe::<SymbolControl>(bus.as_ref()).await.unwrap();

        let result = switch_instrument(&state, "zzzusdt").await;
        assert!(matches!(result, Err(SwitchError::Unknown(_))));
        assert_eq!(state.cache.instrument().unwrap().symbol, "btcusdt");

        // Nothing was announced for the rejected switch.
        switch_instrument(&state, "ethusdt").await.unwrap();
        assert_eq!(controls.next().await, Some(SymbolControl::new("ethusdt", 2)));
    }

    #[tokio::test]
    async fn test_same_instrument_switch_clears_sample() {
        let (state, _bus) = state_with_bus();
        switch_instrument(&state, "btcusdt").await.unwrap();
        state.cache.apply(ProcessedSample {
            symbol: "btcusdt".into(),
            price: 43000.0,
            moving_average: 43000.0,
            high: 43000.0,
            low: 43000.0,
            time: 1,
        });
        assert_eq!(state.cache.price(), 43000.0);

        let again = switch_instrument(&state, "btcusdt").await.unwrap();
        assert_eq!(again.symbol, "btcusdt");
        assert_eq!(state.cache.price(), 0.0);
    }

    #[tokio::test]
    async fn test_query_repeats_current_epoch() {
        let (state, bus) = state_with_bus();
        switch_instrument(&state, "btcusdt").await.unwrap();
        switch_instrument(&state, "ethusdt").await.unwrap();

        let mut controls = bus::subscribe::<SymbolControl>(bus.as_ref()).await.unwrap();
        let queries = bus::subscribe::<SymbolQuery>(bus.as_ref()).await.unwrap();
        let responder = tokio::spawn(answer_queries(state.clone(), queries));

        bus::publish(bus.as_ref(), &SymbolQuery::new("stream-processor")).await.unwrap();
        assert_eq!(controls.next().await, Some(SymbolControl::new("ethusdt", 2)));

        // A repeat is not a switch.
        assert_eq!(state.metrics.instrument_switches.load(std::sync::atomic::Ordering::Relaxed), 2);
        responder.abort();
    }

    #[tokio::test]
    async fn test_idle_hub_has_nothing_to_repeat() {
        let (state, _bus) = state_with_bus();
        assert_eq!(reannounce(&state).await.unwrap(), None);
    }
}
