//! Window Notifier
//!
//! Mirrors a single open/closed window flag to any number of live viewers.
//!
//! - `POST /open` and `POST /close` on the control port flip the flag.
//! - Viewers connect to the notification port over WebSocket, receive the
//!   current state immediately, then every change as `{"windowOpened": bool}`.
//!
//! The control plane and the notification loop never share connection
//! objects: the control plane writes the atomic [`state::StateCell`] and asks
//! for a broadcast through a [`notifier::BroadcastScheduler`]; the
//! notification loop owns every sink.

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod notifier;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod state;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use crate::control::WindowControl;
use crate::metrics::ServerMetrics;
use crate::notifier::NotifierHandle;

pub use crate::error::NotifierError;
pub use crate::state::{StateCell, WindowState, WindowStateQuery};

/// Shared state for the control-plane routes.
#[derive(Clone)]
pub struct AppState {
    pub control: WindowControl,
    /// Used only for read-only queries (client count); never for sinks.
    pub notifier: NotifierHandle,
    pub metrics: Arc<ServerMetrics>,
}
