use crate::error::AppError;
use crate::models::{
    DEFAULT_WINDOW_SECS, HistoryQuery, MAX_HISTORY_LIMIT, WindowQuery, WindowStatsResponse,
};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use persistence::{TradeRecord, TradeStore};
use std::sync::Arc;
use types::trade::now_millis;

fn store_and_symbol(state: &AppState) -> Result<(Arc<dyn TradeStore>, String), AppError> {
    let store = state
        .store
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("history storage is not configured".to_string()))?;
    let symbol = state
        .cache
        .instrument()
        .map(|i| i.symbol)
        .ok_or_else(|| AppError::NotFound("no active instrument".to_string()))?;
    Ok((store, symbol))
}

/// Recent trades of the current instrument, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TradeRecord>>, AppError> {
    let (store, symbol) = store_and_symbol(&state)?;
    let limit = query
        .limit
        .unwrap_or(state.settings.history_limit)
        .clamp(1, MAX_HISTORY_LIMIT);

    Ok(Json(store.recent(&symbol, limit).await?))
}

/// Average / high / low of the current instrument over the trailing window.
pub async fn get_window_stats(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<WindowStatsResponse>, AppError> {
    let (store, symbol) = store_and_symbol(&state)?;
    let window_secs = query.window_secs.unwrap_or(DEFAULT_WINDOW_SECS);
    let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    let since = now_millis().saturating_sub(window_ms);

    let stats = store.window_stats(&symbol, since).await?;
    Ok(Json(WindowStatsResponse {
        symbol,
        window_secs,
        stats,
    }))
}
