use axum::{Json, extract::State, response::IntoResponse};

use crate::AppState;
use crate::metrics;
use crate::state::WindowStateQuery;

/// Health check endpoint - returns server status
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let clients = state.notifier.client_count().await;
    let status = if clients.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(metrics::HealthStatus {
        status: status.to_string(),
        window: state.control.get_state(),
        clients,
        uptime_secs: state.metrics.uptime_secs(),
    })
}

/// Metrics endpoint - returns detailed server metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Liveness probe - returns 200 if the server is running
pub async fn health_live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_running_notifier() {
        let (state, _notifier) = crate::test_helpers::test_app_state();
        let app = Router::new()
            .route("/health", get(health_handler))
            .with_state(state);

        let json = get_json(app, "/health").await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["window"], "closed");
        assert_eq!(json["clients"], 0);
    }

    #[tokio::test]
    async fn test_health_degraded_when_notifier_stopped() {
        let (state, notifier) = crate::test_helpers::test_app_state();
        notifier.shutdown.cancel();
        notifier.task.await.unwrap();

        let app = Router::new()
            .route("/health", get(health_handler))
            .with_state(state);
        let json = get_json(app, "/health").await;
        assert_eq!(json["status"], "degraded");
        assert!(json["clients"].is_null());
    }

    #[tokio::test]
    async fn test_live_and_metrics() {
        let (state, _notifier) = crate::test_helpers::test_app_state();
        state.control.open();
        let app = Router::new()
            .route("/health/live", get(health_live_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state);

        let live = get_json(app.clone(), "/health/live").await;
        assert_eq!(live["status"], "alive");

        let metrics = get_json(app, "/metrics").await;
        assert_eq!(metrics["control"]["state_changes"], 1);
    }
}
