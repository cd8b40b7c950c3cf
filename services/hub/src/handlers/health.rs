use crate::models::HealthResponse;
use crate::state::AppState;
use axum::{Json, extract::State};
use chrono::Utc;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        symbol: state.cache.instrument().map(|i| i.symbol),
        subscribers: state.registry.len(),
        storage_available: state.store.is_some(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        metrics: state.metrics.export(),
    })
}
