//! Enriched samples and running statistics
//!
//! A `ProcessedSample` is derived from exactly one `Trade` plus the
//! statistics engine state right after folding that trade's price.

use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// Running statistics at a point in time. All zero before the first fold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub moving_average: f64,
    pub high: f64,
    pub low: f64,
}

/// Trade enriched with statistics, published on `processed-trades`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSample {
    pub symbol: String,
    pub price: f64,
    pub moving_average: f64,
    pub high: f64,
    pub low: f64,
    /// Observation time of the originating trade, Unix epoch milliseconds
    pub time: i64,
}

impl ProcessedSample {
    /// Combine a trade with the statistics taken after folding it.
    pub fn from_trade(trade: &Trade, stats: StatsSnapshot) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            price: trade.price,
            moving_average: stats.moving_average,
            high: stats.high,
            low: stats.low,
            time: trade.time,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            moving_average: self.moving_average,
            high: self.high,
            low: self.low,
        }
    }
}

/// Minimal push message sent to live subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_trade_carries_trade_fields() {
        let trade = Trade::new("btcusdt", 102.0, 1708123456789);
        let stats = StatsSnapshot {
            moving_average: 101.0,
            high: 102.0,
            low: 100.0,
        };

        let sample = ProcessedSample::from_trade(&trade, stats);
        assert_eq!(sample.symbol, "btcusdt");
        assert_eq!(sample.price, 102.0);
        assert_eq!(sample.time, 1708123456789);
        assert_eq!(sample.stats(), stats);
    }

    #[test]
    fn test_sample_wire_format() {
        let sample = ProcessedSample {
            symbol: "btcusdt".to_string(),
            price: 100.5,
            moving_average: 100.0,
            high: 101.0,
            low: 99.0,
            time: 1,
        };
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["moving_average"], 100.0);
        assert_eq!(value["high"], 101.0);
        assert_eq!(value["low"], 99.0);
    }

    #[test]
    fn test_default_stats_are_zero() {
        let stats = StatsSnapshot::default();
        assert_eq!(stats.moving_average, 0.0);
        assert_eq!(stats.high, 0.0);
        assert_eq!(stats.low, 0.0);
    }
}
