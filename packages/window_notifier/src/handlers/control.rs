use axum::{Json, extract::State, http::StatusCode};

use crate::AppState;
use crate::protocol::BroadcastMessage;
use crate::state::WindowStateQuery;

/// `POST /open`. Always 204; delivery to viewers happens later and never
/// affects the response.
pub async fn open_handler(State(state): State<AppState>) -> StatusCode {
    state.control.open();
    StatusCode::NO_CONTENT
}

/// `POST /close`. Always 204.
pub async fn close_handler(State(state): State<AppState>) -> StatusCode {
    state.control.close();
    StatusCode::NO_CONTENT
}

/// `GET /state` - the current state in the same shape viewers receive.
pub async fn get_state_handler(State(state): State<AppState>) -> Json<BroadcastMessage> {
    Json(BroadcastMessage::from(state.control.get_state()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::Request,
        routing::{get, post},
    };
    use tower::ServiceExt;

    use crate::state::WindowState;

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/open", post(open_handler))
            .route("/close", post(close_handler))
            .route("/state", get(get_state_handler))
            .with_state(state)
    }

    fn post_to(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_returns_no_content() {
        let (state, _notifier) = crate::test_helpers::test_app_state();
        let app = test_router(state.clone());

        let resp = app.oneshot(post_to("/open")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
        assert_eq!(state.control.get_state(), WindowState::Open);
    }

    #[tokio::test]
    async fn test_repeated_open_and_close_are_idempotent() {
        let (state, _notifier) = crate::test_helpers::test_app_state();
        let app = test_router(state.clone());

        for uri in ["/open", "/open", "/close", "/close"] {
            let resp = app.clone().oneshot(post_to(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }
        assert_eq!(state.control.get_state(), WindowState::Closed);

        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.control.state_changes, 2);
        assert_eq!(snapshot.control.redundant_commands, 2);
    }

    #[tokio::test]
    async fn test_get_state() {
        let (state, _notifier) = crate::test_helpers::test_app_state();
        let app = test_router(state.clone());

        app.clone().oneshot(post_to("/open")).await.unwrap();
        let resp = app
            .oneshot(Request::builder().uri("/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let msg: BroadcastMessage = serde_json::from_slice(&body).unwrap();
        assert!(msg.window_opened);
    }

    #[tokio::test]
    async fn test_open_rejects_get() {
        let (state, _notifier) = crate::test_helpers::test_app_state();
        let app = test_router(state);

        let resp = app
            .oneshot(Request::builder().uri("/open").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
