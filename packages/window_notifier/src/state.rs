//! Window State
//!
//! The single authoritative open/closed flag. It is the only object shared
//! between the HTTP control plane and the notification loop, so it lives in
//! an atomic rather than behind the notifier's command queue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Binary window state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    Open,
    #[default]
    Closed,
}

impl WindowState {
    pub fn is_open(self) -> bool {
        matches!(self, WindowState::Open)
    }
}

impl From<bool> for WindowState {
    fn from(open: bool) -> Self {
        if open {
            WindowState::Open
        } else {
            WindowState::Closed
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowState::Open => write!(f, "open"),
            WindowState::Closed => write!(f, "closed"),
        }
    }
}

/// Read-only access to the current window state.
///
/// Collaborators that only need to answer "is the window open?" (a voice
/// intent handler, a status page) depend on this instead of subscribing.
pub trait WindowStateQuery {
    fn get_state(&self) -> WindowState;
}

/// Process-wide holder of the current [`WindowState`].
///
/// Writing never notifies anyone; callers decide whether a change warrants a
/// broadcast.
#[derive(Debug, Default)]
pub struct StateCell {
    open: AtomicBool,
}

impl StateCell {
    /// Starts closed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> WindowState {
        WindowState::from(self.open.load(Ordering::Acquire))
    }

    /// Unconditional overwrite.
    pub fn set(&self, state: WindowState) {
        self.open.store(state.is_open(), Ordering::Release);
    }

    /// Atomically store `state` and return what was there before.
    pub fn replace(&self, state: WindowState) -> WindowState {
        WindowState::from(self.open.swap(state.is_open(), Ordering::AcqRel))
    }
}

impl WindowStateQuery for StateCell {
    fn get_state(&self) -> WindowState {
        self.get()
    }
}
