// Metrics endpoint

use crate::core::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Returns JSON with bot counters:
/// - Events handled and handler errors
/// - Check-ins recorded and duplicates
/// - Registrations completed and in progress
/// - Delivery outcomes and scheduled jobs run
///
/// Bound to the configured local address only; no authentication.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.metrics.get_snapshot(&state.sessions);

    (StatusCode::OK, Json(snapshot)).into_response()
}
