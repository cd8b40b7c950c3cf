//! Statistics Engine
//!
//! Running moving average, high and low over a price stream. Pure state, no
//! I/O; owned and driven by exactly one task, so there is no locking.

use types::sample::StatsSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsEngine {
    count: u64,
    sum: f64,
    high: f64,
    low: f64,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one price into the running statistics.
    ///
    /// Non-positive and non-finite prices are discarded and leave the state
    /// untouched. Returns whether the price was folded.
    pub fn fold(&mut self, price: f64) -> bool {
        if !price.is_finite() || price <= 0.0 {
            return false;
        }

        if self.count == 0 {
            self.high = price;
            self.low = price;
        } else {
            self.high = self.high.max(price);
            self.low = self.low.min(price);
        }
        self.count += 1;
        self.sum += price;
        true
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let moving_average = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };
        StatsSnapshot {
            moving_average,
            high: self.high,
            low: self.low,
        }
    }

    /// Back to the no-folds baseline.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
