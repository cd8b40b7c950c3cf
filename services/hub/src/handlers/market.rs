use crate::state::AppState;
use axum::{Json, extract::State};
use types::sample::{PriceUpdate, StatsSnapshot};

/// Latest price; 0 before the first sample.
pub async fn get_price(State(state): State<AppState>) -> Json<PriceUpdate> {
    Json(PriceUpdate {
        price: state.cache.price(),
    })
}

/// Latest moving average / high / low; zeros before the first sample.
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.stats())
}
