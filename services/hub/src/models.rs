use persistence::WindowStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound for one history page.
pub const MAX_HISTORY_LIMIT: usize = 1000;

pub const DEFAULT_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
pub struct SetSymbolRequest {
    pub symbol: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub window_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct WindowStatsResponse {
    pub symbol: String,
    pub window_secs: u64,
    #[serde(flatten)]
    pub stats: WindowStats,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub symbol: Option<String>,
    pub subscribers: usize,
    pub storage_available: bool,
    pub uptime_secs: i64,
    pub metrics: BTreeMap<String, u64>,
}
