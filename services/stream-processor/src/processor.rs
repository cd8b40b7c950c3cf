//! Stream Processor
//!
//! Consumes `raw-trades`, folds each price into the statistics engine and
//! republishes the enriched sample on `processed-trades`. A `symbol-control`
//! message for a new switch resets the engine before any further trade is
//! handled. On startup the processor asks the hub for the current instrument,
//! since the one it was configured with may be out of date.

use crate::engine::StatisticsEngine;
use bus::{Bus, BusError};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::control::{SymbolControl, SymbolQuery};
use types::instrument::normalize_symbol;
use types::sample::ProcessedSample;
use types::trade::Trade;

/// What happened to one raw trade.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Processed(ProcessedSample),
    /// Tagged with an instrument other than the current one.
    Stale { symbol: String },
    /// Price the engine refuses to fold.
    Rejected,
}

#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    pub trades_processed: AtomicU64,
    pub stale_trades: AtomicU64,
    pub rejected_trades: AtomicU64,
    pub resets: AtomicU64,
    pub publish_failures: AtomicU64,
}

pub struct StreamProcessor {
    engine: StatisticsEngine,
    current_symbol: String,
    /// Epoch of the last control message seen, `None` until the first one.
    epoch: Option<u64>,
}

impl StreamProcessor {
    pub fn new(symbol: &str) -> Self {
        Self {
            engine: StatisticsEngine::new(),
            current_symbol: normalize_symbol(symbol),
            epoch: None,
        }
    }

    pub fn current_symbol(&self) -> &str {
        &self.current_symbol
    }

    pub fn engine(&self) -> &StatisticsEngine {
        &self.engine
    }

    /// Fold a trade and build its sample. Trades for another instrument are
    /// discarded before they touch the engine.
    pub fn handle_trade(&mut self, trade: &Trade) -> TradeOutcome {
        if normalize_symbol(&trade.symbol) != self.current_symbol {
            return TradeOutcome::Stale {
                symbol: trade.symbol.clone(),
            };
        }

        if !self.engine.fold(trade.price) {
            return TradeOutcome::Rejected;
        }

        TradeOutcome::Processed(ProcessedSample::from_trade(trade, self.engine.snapshot()))
    }

    /// Apply a control message and report whether the engine was reset.
    ///
    /// A switch to another instrument always resets. A message for the current
    /// instrument resets only when it carries a new epoch, so a fresh switch
    /// to the same instrument resets while a re-announcement does not. The
    /// first message after startup adopts its epoch without resetting.
    pub fn handle_control(&mut self, control: &SymbolControl) -> bool {
        let symbol = normalize_symbol(&control.symbol);
        let repeat = symbol == self.current_symbol
            && self.epoch.is_none_or(|epoch| epoch == control.epoch);
        self.epoch = Some(control.epoch);
        if repeat {
            return false;
        }

        self.engine.reset();
        self.current_symbol = symbol;
        true
    }
}

/// Run the processor against `bus` until a subscription ends.
pub async fn run(
    bus: Arc<dyn Bus>,
    symbol: &str,
    metrics: Arc<ProcessorMetrics>,
) -> Result<(), BusError> {
    // Control first, so no switch published after startup is missed.
    let mut controls = bus::subscribe::<SymbolControl>(bus.as_ref()).await?;
    let mut trades = bus::subscribe::<Trade>(bus.as_ref()).await?;
    let mut processor = StreamProcessor::new(symbol);

    // A hub that is already running repeats its decision; one that starts
    // later announces on its own.
    if let Err(err) = bus::publish(bus.as_ref(), &SymbolQuery::new("stream-processor")).await {
        warn!(error = %err, "Failed to query current instrument");
    }

    info!(symbol = %processor.current_symbol(), "Stream processor running");

    loop {
        tokio::select! {
            biased;

            control = controls.next() => {
                let Some(control) = control else {
                    return Err(BusError::Transport("symbol-control subscription ended".into()));
                };
                if processor.handle_control(&control) {
                    metrics.resets.fetch_add(1, Ordering::Relaxed);
                    info!(
                        symbol = %processor.current_symbol(),
                        epoch = control.epoch,
                        "Statistics reset for instrument switch"
                    );
                } else {
                    debug!(symbol = %control.symbol, epoch = control.epoch, "Instrument unchanged");
                }
            }

            trade = trades.next() => {
                let Some(trade) = trade else {
                    return Err(BusError::Transport("raw-trades subscription ended".into()));
                };
                match processor.handle_trade(&trade) {
                    TradeOutcome::Processed(sample) => {
                        metrics.trades_processed.fetch_add(1, Ordering::Relaxed);
                        if let Err(err) = bus::publish(bus.as_ref(), &sample).await {
                            metrics.publish_failures.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %err, "Failed to publish processed sample");
                        }
                    }
                    TradeOutcome::Stale { symbol } => {
                        metrics.stale_trades.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            trade_symbol = %symbol,
                            current = %processor.current_symbol(),
                            "Discarding trade for previous instrument"
                        );
                    }
                    TradeOutcome::Rejected => {
                        metrics.rejected_trades.fetch_add(1, Ordering::Relaxed);
                        debug!(price = trade.price, "Discarding trade with invalid price");
                    }
                }
            }
        }
    }
}
