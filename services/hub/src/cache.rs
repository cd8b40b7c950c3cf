//! Current instrument and latest sample
//!
//! Both live behind one readers-writer lock, so a sample is checked against
//! the current instrument and applied in the same critical section as a
//! switch would run. The lock is never held across an await.

use parking_lot::RwLock;
use types::control::SymbolControl;
use types::instrument::{Instrument, normalize_symbol};
use types::sample::{ProcessedSample, StatsSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    /// Sample tagged with an instrument other than the current one.
    Stale { sample_symbol: String },
}

#[derive(Debug, Default)]
struct CacheState {
    instrument: Option<Instrument>,
    /// Number of switches since startup
    epoch: u64,
    latest: Option<ProcessedSample>,
}

#[derive(Debug, Default)]
pub struct HubCache {
    inner: RwLock<CacheState>,
}

impl HubCache {
    /// Idle: no instrument, no sample.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instrument(&self) -> Option<Instrument> {
        self.inner.read().instrument.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Control message describing the current instrument, `None` while idle.
    pub fn announcement(&self) -> Option<SymbolControl> {
        let state = self.inner.read();
        state
            .instrument
            .as_ref()
            .map(|i| SymbolControl::new(i.symbol.clone(), state.epoch))
    }

    pub fn latest(&self) -> Option<ProcessedSample> {
        self.inner.read().latest.clone()
    }

    /// Latest price, 0 before the first sample.
    pub fn price(&self) -> f64 {
        self.inner.read().latest.as_ref().map_or(0.0, |s| s.price)
    }

    /// Latest statistics, zeros before the first sample.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner
            .read()
            .latest
            .as_ref()
            .map(ProcessedSample::stats)
            .unwrap_or_default()
    }

    /// Apply a sample unless it belongs to another instrument.
    pub fn apply(&self, sample: ProcessedSample) -> ApplyOutcome {
        let mut state = self.inner.write();
        let current = state.instrument.as_ref().map(|i| i.symbol.as_str());
        if current != Some(normalize_symbol(&sample.symbol).as_str()) {
            return ApplyOutcome::Stale {
                sample_symbol: sample.symbol,
            };
        }
        state.latest = Some(sample);
        ApplyOutcome::Applied
    }

    /// Make `instrument` current and drop the cached sample. Returns the
    /// previous instrument.
    pub fn switch_to(&self, instrument: Instrument) -> Option<Instrument> {
        let mut state = self.inner.write();
        state.latest = None;
        state.epoch += 1;
        state.instrument.replace(instrument)
    }
}
