//! Client Registry
//!
//! The set of live notification sinks. Only the notification loop owns a
//! registry, so nothing here is synchronized.

use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::error::DeliveryError;

/// Identity of one connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(Uuid);

impl SinkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle to one connected client.
///
/// Frames go into a bounded outbox drained by the connection's writer task.
/// Dropping the sink closes the outbox, which ends the connection.
#[derive(Debug)]
pub struct Sink {
    id: SinkId,
    outbox: mpsc::Sender<Utf8Bytes>,
}

impl Sink {
    pub fn new(id: SinkId, outbox: mpsc::Sender<Utf8Bytes>) -> Self {
        Self { id, outbox }
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Queue a frame without waiting.
    pub fn deliver(&self, frame: &Utf8Bytes) -> Result<(), DeliveryError> {
        self.outbox.try_send(frame.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Outcome of delivering one frame to every registered sink.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: Vec<(SinkId, DeliveryError)>,
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    sinks: HashMap<SinkId, Sink>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sink. Re-adding an id replaces the old sink, which closes it.
    pub fn add(&mut self, sink: Sink) {
        self.sinks.insert(sink.id, sink);
    }

    pub fn remove(&mut self, id: SinkId) -> Option<Sink> {
        self.sinks.remove(&id)
    }

    pub fn contains(&self, id: SinkId) -> bool {
        self.sinks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `frame` to every sink. A sink that cannot take the frame is
    /// removed; the rest of the pass carries on regardless.
    pub fn deliver_all(&mut self, frame: &Utf8Bytes) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for sink in self.sinks.values() {
            match sink.deliver(frame) {
                Ok(()) => report.delivered += 1,
                Err(e) => report.dropped.push((sink.id, e)),
            }
        }
        for (id, reason) in &report.dropped {
            debug!(sink_id = %id, %reason, "dropping sink after failed delivery");
            self.sinks.remove(id);
        }
        report
    }

    /// Drop every sink, closing all outboxes.
    pub fn clear(&mut self) -> usize {
        let n = self.sinks.len();
        self.sinks.clear();
        n
    }
}
