use crate::control::switch_instrument;
use crate::error::AppError;
use crate::models::SetSymbolRequest;
use crate::state::AppState;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use types::instrument::{self, Instrument};

pub async fn get_symbol(State(state): State<AppState>) -> Result<Json<Instrument>, AppError> {
    state
        .cache
        .instrument()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no active instrument".to_string()))
}

pub async fn set_symbol(
    State(state): State<AppState>,
    request: Result<Json<SetSymbolRequest>, JsonRejection>,
) -> Result<Json<Instrument>, AppError> {
    let Json(request) = request?;
    let instrument = switch_instrument(&state, &request.symbol).await?;
    Ok(Json(instrument))
}

pub async fn list_coins() -> Json<Vec<Instrument>> {
    Json(instrument::list())
}
