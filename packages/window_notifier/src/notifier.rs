//! Notification Server
//!
//! One task owns the [`ClientRegistry`] and processes commands from a single
//! FIFO queue. Connection tasks and the control plane never touch sinks
//! directly; they enqueue a [`ServerCommand`] and the loop does the work.
//! Every command is handled without awaiting, so the registry is never seen
//! half-updated.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics::ServerMetrics;
use crate::protocol;
use crate::registry::{ClientRegistry, Sink, SinkId};
use crate::state::StateCell;

/// Commands accepted by the notification loop.
#[derive(Debug)]
pub enum ServerCommand {
    /// A connection finished its handshake.
    Register { sink: Sink },
    /// A connection went away.
    Unregister { id: SinkId },
    /// Send the current state to every registered sink.
    Broadcast,
    ClientCount {
        respond_to: oneshot::Sender<usize>,
    },
}

/// Lets any thread ask the notification loop for a broadcast pass.
///
/// This is the only notifier capability the control plane holds. Scheduling
/// is synchronous and never blocks, so it is safe from blocking threads and
/// from async handlers alike.
#[derive(Debug, Clone)]
pub struct BroadcastScheduler {
    sender: mpsc::UnboundedSender<ServerCommand>,
}

impl BroadcastScheduler {
    /// Enqueue one broadcast pass. Passes run in submission order and read
    /// the state when they run, not when they were scheduled.
    ///
    /// Returns `false` once the notification loop has stopped.
    pub fn schedule_broadcast(&self) -> bool {
        self.sender.send(ServerCommand::Broadcast).is_ok()
    }
}

/// Handle used by connection tasks to talk to the notification loop.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    sender: mpsc::UnboundedSender<ServerCommand>,
}

impl NotifierHandle {
    /// Hand a freshly connected sink to the loop. The loop sends it the
    /// current state before any later broadcast.
    pub fn register(&self, sink: Sink) -> bool {
        self.sender.send(ServerCommand::Register { sink }).is_ok()
    }

    pub fn unregister(&self, id: SinkId) {
        let _ = self.sender.send(ServerCommand::Unregister { id });
    }

    /// Number of registered sinks, or `None` if the loop has stopped.
    pub async fn client_count(&self) -> Option<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ServerCommand::ClientCount { respond_to: tx })
            .ok()?;
        rx.await.ok()
    }

    pub fn scheduler(&self) -> BroadcastScheduler {
        BroadcastScheduler {
            sender: self.sender.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The notification event loop. Build with [`NotificationServer::new`] and
/// drive with [`NotificationServer::run`].
pub struct NotificationServer {
    state: Arc<StateCell>,
    registry: ClientRegistry,
    commands: mpsc::UnboundedReceiver<ServerCommand>,
    metrics: Arc<ServerMetrics>,
    shutdown: CancellationToken,
}

impl NotificationServer {
    pub fn new(
        state: Arc<StateCell>,
        metrics: Arc<ServerMetrics>,
        shutdown: CancellationToken,
    ) -> (Self, NotifierHandle) {
        let (sender, commands) = mpsc::unbounded_channel();
        let server = Self {
            state,
            registry: ClientRegistry::new(),
            commands,
            metrics,
            shutdown,
        };
        (server, NotifierHandle { sender })
    }

    /// Run until the shutdown token fires or every handle is dropped. On exit
    /// all sinks are dropped, which closes their connections.
    pub async fn run(mut self) {
        info!("Notification loop started");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("Notification loop received shutdown");
                    break;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
        self.commands.close();
        let closed = self.registry.clear();
        info!(closed, "Notification loop stopped");
    }

    fn handle(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register { sink } => self.register(sink),
            ServerCommand::Unregister { id } => {
                if self.registry.remove(id).is_some() {
                    debug!(sink_id = %id, clients = self.registry.len(), "Sink unregistered");
                }
            }
            ServerCommand::Broadcast => self.broadcast(),
            ServerCommand::ClientCount { respond_to } => {
                let _ = respond_to.send(self.registry.len());
            }
        }
    }

    fn register(&mut self, sink: Sink) {
        let id = sink.id();
        let state = self.state.get();
        let frame = match protocol::encode(state) {
            Ok(frame) => frame,
            Err(e) => {
                error!(sink_id = %id, error = %e, "Failed to encode state");
                return;
            }
        };
        if let Err(e) = sink.deliver(&frame) {
            // Disconnected before we got to it.
            debug!(sink_id = %id, error = %e, "Sink gone before registration");
            self.metrics.sink_dropped();
            return;
        }
        self.metrics.frame_delivered();
        self.registry.add(sink);
        debug!(sink_id = %id, %state, clients = self.registry.len(), "Sink registered");
    }

    /// One broadcast pass: read the state once, encode once, deliver to all.
    fn broadcast(&mut self) {
        let state = self.state.get();
        let frame = match protocol::encode(state) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to encode state; skipping broadcast");
                return;
            }
        };
        let report = self.registry.deliver_all(&frame);
        for (id, reason) in &report.dropped {
            warn!(sink_id = %id, %reason, "Dropped sink during broadcast");
        }
        self.metrics
            .broadcast_pass(report.delivered, report.dropped.len());
        debug!(
            %state,
            recipients = report.delivered,
            dropped = report.dropped.len(),
            "Broadcast pass complete"
        );
    }
}

/// Spawn the notification loop on the current runtime.
pub fn spawn_notifier(
    state: Arc<StateCell>,
    metrics: Arc<ServerMetrics>,
    shutdown: CancellationToken,
) -> (NotifierHandle, tokio::task::JoinHandle<()>) {
    let (server, handle) = NotificationServer::new(state, metrics, shutdown);
    let task = tokio::spawn(server.run());
    (handle, task)
}
