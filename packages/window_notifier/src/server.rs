//! Process wiring: binds both listeners, starts the notification loop and
//! serves until the shutdown token fires.

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;
use crate::config::ServerConfig;
use crate::control::WindowControl;
use crate::error::NotifierError;
use crate::handlers;
use crate::metrics::ServerMetrics;
use crate::notifier::spawn_notifier;
use crate::state::StateCell;
use crate::ws::{WsState, ws_router};

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

/// Routes served on the control port.
pub fn control_router(state: AppState) -> Router {
    Router::new()
        .route("/open", post(handlers::open_handler))
        .route("/close", post(handlers::close_handler))
        .route("/state", get(handlers::get_state_handler))
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A started server. Both listeners are bound and accepting.
pub struct RunningServer {
    pub control_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    pub app_state: AppState,
    task: JoinHandle<Result<(), NotifierError>>,
}

impl RunningServer {
    /// Wait for both listeners and the notification loop to finish.
    pub async fn wait(self) -> Result<(), NotifierError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(NotifierError::Serve(std::io::Error::other(e))),
        }
    }
}

async fn bind(role: &'static str, addr: SocketAddr) -> Result<TcpListener, NotifierError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| NotifierError::Bind { role, addr, source })
}

/// Bind both ports and start serving. Returns once the listeners are ready.
///
/// Cancelling `shutdown` stops both listeners from accepting and makes the
/// notification loop close every sink.
pub async fn start(
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<RunningServer, NotifierError> {
    let ws_listener = bind("notification", config.ws_addr).await?;
    let control_listener = bind("control", config.control_addr).await?;
    let ws_addr = ws_listener.local_addr()?;
    let control_addr = control_listener.local_addr()?;

    let state = Arc::new(StateCell::new());
    let metrics = Arc::new(ServerMetrics::new());
    let (notifier, notifier_task) =
        spawn_notifier(state.clone(), metrics.clone(), shutdown.clone());

    let app_state = AppState {
        control: WindowControl::new(state, notifier.scheduler(), metrics.clone()),
        notifier: notifier.clone(),
        metrics: metrics.clone(),
    };

    let ws_app = ws_router(WsState {
        notifier,
        settings: config.ws,
        metrics,
    });
    let control_app = control_router(app_state.clone());

    let ws_shutdown = shutdown.clone();
    let ws_server = async move {
        axum::serve(ws_listener, ws_app)
            .with_graceful_shutdown(async move { ws_shutdown.cancelled().await })
            .await
    };
    let control_shutdown = shutdown.clone();
    let control_server = async move {
        axum::serve(control_listener, control_app)
            .with_graceful_shutdown(async move { control_shutdown.cancelled().await })
            .await
    };

    let task = tokio::spawn(async move {
        let (ws_result, control_result, notifier_result) =
            tokio::join!(ws_server, control_server, notifier_task);
        if let Err(e) = notifier_result {
            error!("Notification loop panicked: {}", e);
        }
        ws_result?;
        control_result?;
        Ok::<(), NotifierError>(())
    });

    info!("Control endpoint listening on http://{}", control_addr);
    info!("Notification endpoint listening on ws://{}", ws_addr);

    Ok(RunningServer {
        control_addr,
        ws_addr,
        app_state,
        task,
    })
}
