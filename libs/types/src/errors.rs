//! Error types shared across the pipeline

use thiserror::Error;

/// Price parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
    #[error("Invalid decimal price: {0}")]
    InvalidDecimal(String),

    #[error("Price not representable as f64: {0}")]
    NotRepresentable(String),

    #[error("Non-positive price: {0}")]
    NonPositive(String),
}

/// Instrument registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    #[error("Unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },
}
