//! Normalized trade records
//!
//! A `Trade` is what the feed adapter publishes on `raw-trades` after
//! decoding a venue event. It is immutable once created.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One trade print for one instrument.
///
/// Wire form: `{"symbol": "btcusdt", "price": 43250.12, "time": 1708123456789}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument the trade belongs to (lower-case venue symbol)
    pub symbol: String,
    /// Execution price, strictly positive
    pub price: f64,
    /// Observation time, Unix epoch milliseconds
    pub time: i64,
}

impl Trade {
    pub fn new(symbol: impl Into<String>, price: f64, time: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            time,
        }
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
