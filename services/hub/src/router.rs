use crate::handlers::{health, history, instrument, market, ws};
use crate::state::AppState;
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/price", get(market::get_price))
        .route("/stats", get(market::get_stats))
        .route(
            "/symbol",
            get(instrument::get_symbol).post(instrument::set_symbol),
        )
        .route("/coins", get(instrument::list_coins))
        .route("/history", get(history::get_history))
        .route("/history/stats", get(history::get_window_stats))
        .route("/health", get(health::health));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
