use crate::cache::HubCache;
use crate::metrics::HubMetrics;
use crate::registry::SubscriberRegistry;
use bus::Bus;
use chrono::{DateTime, Utc};
use persistence::TradeStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct HubSettings {
    /// Default history page size.
    pub history_limit: usize,
    /// Outbound queue depth per push subscriber.
    pub subscriber_queue: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            subscriber_queue: 256,
        }
    }
}

/// Everything a handler or background task of the hub touches.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<HubCache>,
    pub registry: Arc<SubscriberRegistry>,
    pub metrics: Arc<HubMetrics>,
    pub bus: Arc<dyn Bus>,
    /// `None` when no storage is configured; history then reports unavailable.
    pub store: Option<Arc<dyn TradeStore>>,
    /// Serializes instrument switches end to end, including the publish.
    pub switch_gate: Arc<Mutex<()>>,
    pub settings: HubSettings,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(bus: Arc<dyn Bus>, store: Option<Arc<dyn TradeStore>>, settings: HubSettings) -> Self {
        Self {
            cache: Arc::new(HubCache::new()),
            registry: Arc::new(SubscriberRegistry::new(settings.subscriber_queue)),
            metrics: Arc::new(HubMetrics::new()),
            bus,
            store,
            switch_gate: Arc::new(Mutex::new(())),
            settings,
            started_at: Utc::now(),
        }
    }
}
