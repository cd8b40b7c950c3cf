//! Hub counters, exported through the health endpoint

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct HubMetrics {
    // Bus consumption
    pub samples_applied: AtomicU64,
    pub samples_stale: AtomicU64,
    pub samples_malformed: AtomicU64,

    // Fan-out
    pub broadcasts_sent: AtomicU64,
    /// Removed for a full or closed queue, or a failed write
    pub subscribers_dropped: AtomicU64,
    /// Closed by the client
    pub subscribers_disconnected: AtomicU64,

    // Storage side-write
    pub storage_writes: AtomicU64,
    pub storage_failures: AtomicU64,
    pub storage_overflow: AtomicU64,

    // Control plane
    pub instrument_switches: AtomicU64,
    pub reannouncements: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn export(&self) -> BTreeMap<String, u64> {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let mut m = BTreeMap::new();
        m.insert("samples_applied".to_string(), load(&self.samples_applied));
        m.insert("samples_stale".to_string(), load(&self.samples_stale));
        m.insert("samples_malformed".to_string(), load(&self.samples_malformed));
        m.insert("broadcasts_sent".to_string(), load(&self.broadcasts_sent));
        m.insert("subscribers_dropped".to_string(), load(&self.subscribers_dropped));
        m.insert("subscribers_disconnected".to_string(), load(&self.subscribers_disconnected));
        m.insert("storage_writes".to_string(), load(&self.storage_writes));
        m.insert("storage_failures".to_string(), load(&self.storage_failures));
        m.insert("storage_overflow".to_string(), load(&self.storage_overflow));
        m.insert("instrument_switches".to_string(), load(&self.instrument_switches));
        m.insert("reannouncements".to_string(), load(&self.reannouncements));
        m
    }
}
