use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::AppState;
use crate::config::{CliOverrides, FileConfig, ServerConfig};
use crate::control::WindowControl;
use crate::metrics::ServerMetrics;
use crate::notifier::spawn_notifier;
use crate::server::{self, RunningServer};
use crate::state::StateCell;

/// Keeps the notification loop of a test `AppState` controllable.
pub struct TestNotifier {
    pub shutdown: CancellationToken,
    pub task: tokio::task::JoinHandle<()>,
}

/// Build a fully-wired `AppState` with a running notification loop.
///
/// Must be called inside a Tokio runtime. Callers should hold the returned
/// `TestNotifier` for the lifetime of the test; dropping it does not stop the
/// loop, cancelling its token does.
pub fn test_app_state() -> (AppState, TestNotifier) {
    let state = Arc::new(StateCell::new());
    let metrics = Arc::new(ServerMetrics::new());
    let shutdown = CancellationToken::new();
    let (notifier, task) = spawn_notifier(state.clone(), metrics.clone(), shutdown.clone());

    let app_state = AppState {
        control: WindowControl::new(state, notifier.scheduler(), metrics.clone()),
        notifier,
        metrics,
    };

    (app_state, TestNotifier { shutdown, task })
}

/// Start a real server on ephemeral loopback ports.
pub async fn start_test_server() -> (RunningServer, CancellationToken) {
    let overrides = CliOverrides {
        host: Some("127.0.0.1".into()),
        control_port: Some(0),
        ws_port: Some(0),
    };
    let config = ServerConfig::from_file(&FileConfig::default(), &overrides).unwrap();
    let shutdown = CancellationToken::new();
    let running = server::start(&config, shutdown.clone())
        .await
        .expect("failed to start server");
    (running, shutdown)
}
