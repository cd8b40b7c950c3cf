//! Stream Processor
//!
//! Stateful transform from raw trades to enriched samples.
//!
//! # Modules
//! - `engine`: running moving average / high / low
//! - `processor`: bus consumption, instrument tagging and reset on switch
//! - `config`: environment configuration

pub mod config;
pub mod engine;
pub mod processor;

pub use engine::StatisticsEngine;
pub use processor::{run, ProcessorMetrics, StreamProcessor, TradeOutcome};
