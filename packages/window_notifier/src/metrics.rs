//! Server metrics for observability
//!
//! Counters are written from both the control plane and the notification
//! loop, so everything is a relaxed atomic.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    /// Currently open WebSocket connections
    pub active_connections: AtomicU64,
    /// Total connections since server start
    pub total_connections: AtomicU64,

    // Control metrics
    /// Open/close commands that changed the state
    pub state_changes: AtomicU64,
    /// Open/close commands that repeated the current state
    pub redundant_commands: AtomicU64,

    // Broadcast metrics
    /// Broadcast passes executed by the notification loop
    pub broadcast_passes: AtomicU64,
    /// Frames queued to sinks (initial state + broadcasts)
    pub frames_delivered: AtomicU64,
    /// Sinks removed because a delivery failed
    pub sinks_dropped: AtomicU64,

    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn state_changed(&self) {
        self.state_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn redundant_command(&self) {
        self.redundant_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn broadcast_pass(&self, delivered: usize, dropped: usize) {
        self.broadcast_passes.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.sinks_dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn frame_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sink_dropped(&self) {
        self.sinks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            connections: ConnectionMetrics {
                active: self.active_connections.load(Ordering::Relaxed),
                total: self.total_connections.load(Ordering::Relaxed),
            },
            control: ControlMetrics {
                state_changes: self.state_changes.load(Ordering::Relaxed),
                redundant_commands: self.redundant_commands.load(Ordering::Relaxed),
            },
            broadcast: BroadcastMetrics {
                passes: self.broadcast_passes.load(Ordering::Relaxed),
                frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
                sinks_dropped: self.sinks_dropped.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionMetrics,
    pub control: ControlMetrics,
    pub broadcast: BroadcastMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMetrics {
    pub state_changes: u64,
    pub redundant_commands: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastMetrics {
    pub passes: u64,
    pub frames_delivered: u64,
    pub sinks_dropped: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub window: crate::state::WindowState,
    /// Sinks currently registered with the notification loop
    pub clients: Option<usize>,
    pub uptime_secs: u64,
}
