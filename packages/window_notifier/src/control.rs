//! Control Endpoint logic, independent of HTTP.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::metrics::ServerMetrics;
use crate::notifier::BroadcastScheduler;
use crate::state::{StateCell, WindowState, WindowStateQuery};

/// Opens and closes the window. Holds the state cell and a scheduler, never
/// a sink.
#[derive(Debug, Clone)]
pub struct WindowControl {
    state: Arc<StateCell>,
    scheduler: BroadcastScheduler,
    metrics: Arc<ServerMetrics>,
}

impl WindowControl {
    pub fn new(
        state: Arc<StateCell>,
        scheduler: BroadcastScheduler,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            state,
            scheduler,
            metrics,
        }
    }

    /// Returns whether a broadcast was requested.
    pub fn open(&self) -> bool {
        self.transition(WindowState::Open)
    }

    /// Returns whether a broadcast was requested.
    pub fn close(&self) -> bool {
        self.transition(WindowState::Closed)
    }

    fn transition(&self, target: WindowState) -> bool {
        let previous = self.state.replace(target);
        if previous == target {
            self.metrics.redundant_command();
            debug!(state = %target, "Window already in requested state");
            return false;
        }

        self.metrics.state_changed();
        info!(from = %previous, to = %target, "Window state changed");
        if !self.scheduler.schedule_broadcast() {
            warn!(state = %target, "Notification loop is not running; broadcast skipped");
        }
        true
    }
}

impl WindowStateQuery for WindowControl {
    fn get_state(&self) -> WindowState {
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotificationServer;
    use tokio_util::sync::CancellationToken;

    fn control() -> (WindowControl, Arc<ServerMetrics>, NotificationServer) {
        let state = Arc::new(StateCell::new());
        let metrics = Arc::new(ServerMetrics::new());
        let (server, handle) =
            NotificationServer::new(state.clone(), metrics.clone(), CancellationToken::new());
        let control = WindowControl::new(state, handle.scheduler(), metrics.clone());
        (control, metrics, server)
    }

    #[test]
    fn test_open_then_close() {
        let (control, _metrics, _server) = control();
        assert_eq!(control.get_state(), WindowState::Closed);

        assert!(control.open());
        assert_eq!(control.get_state(), WindowState::Open);

        assert!(control.close());
        assert_eq!(control.get_state(), WindowState::Closed);
    }

    #[test]
    fn test_repeated_command_requests_no_broadcast() {
        let (control, metrics, _server) = control();
        assert!(!control.close());
        assert!(control.open());
        assert!(!control.open());
        assert!(!control.open());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.control.state_changes, 1);
        assert_eq!(snapshot.control.redundant_commands, 3);
    }

    #[test]
    fn test_fold_of_command_sequence() {
        let (control, _metrics, _server) = control();
        let sequence = [true, true, false, true, false, false, true];

        let mut expected = WindowState::Closed;
        for &open in &sequence {
            let target = WindowState::from(open);
            let changed = if open { control.open() } else { control.close() };
            assert_eq!(changed, target != expected);
            expected = target;
        }
        assert_eq!(control.get_state(), expected);
    }

    #[test]
    fn test_stopped_notifier_does_not_fail_control() {
        let (control, _metrics, server) = control();
        drop(server);
        assert!(control.open());
        assert_eq!(control.get_state(), WindowState::Open);
    }
}
