// HTTP routes configuration

use crate::core::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Monitoring surface; the bot itself talks to the platform by long polling
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::handlers::health::health_handler))
        .route("/metrics", get(crate::handlers::metrics::metrics_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn status_of(path: &str) -> StatusCode {
        let (state, _) = test_state(&[]);
        let app = build_router(Arc::new(state));
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_monitoring_routes() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
        assert_eq!(status_of("/metrics").await, StatusCode::OK);
        assert_eq!(status_of("/checkin").await, StatusCode::NOT_FOUND);
    }
}
