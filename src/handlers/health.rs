use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::core::error::MonitoringError;
use crate::core::state::AppState;

#[derive(Debug, Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
}

/// Health check handler
///
/// GET /health. Fails when the attendance database does not answer.
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, MonitoringError> {
    state.store.ping().map_err(|e| {
        error!(error = %e, "Health check failed: database unavailable");
        MonitoringError::InternalError(e.to_string())
    })?;

    Ok((
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp: Utc::now().timestamp(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::test_state;

    #[tokio::test]
    async fn test_health_handler() {
        let (state, _) = test_state(&[]);
        let response = health_handler(State(Arc::new(state))).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_response_has_timestamp() {
        use axum::body::Body;
        use http_body_util::BodyExt;

        let (state, _) = test_state(&[]);
        let response = health_handler(State(Arc::new(state))).await.into_response();

        let (parts, body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::OK);

        let body = Body::new(body);
        let bytes = body.collect().await.unwrap().to_bytes();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(health.status, "ok");
        assert!(health.timestamp > 0);
    }
}
