//! WebSocket Listener
//!
//! Each accepted connection becomes a [`Sink`]: it is handed to the
//! notification loop, then a writer drains its outbox into the socket while a
//! reader waits for the client to leave. Viewers never send application
//! messages; anything they do send is discarded.
//!
//! Sink lifecycle: connecting (upgrade handshake) → registered (in the loop's
//! registry, first frame is the current state) → closed. Closed is terminal:
//! the client left, a write failed or timed out, the loop dropped the sink
//! for falling behind, or the server shut down.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, Utf8Bytes, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures::{Sink as FrameSink, sink::SinkExt, stream::StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WsSettings;
use crate::metrics::ServerMetrics;
use crate::notifier::NotifierHandle;
use crate::registry::{Sink, SinkId};

#[derive(Clone)]
pub struct WsState {
    pub notifier: NotifierHandle,
    pub settings: WsSettings,
    pub metrics: Arc<ServerMetrics>,
}

/// Router for the notification port.
pub fn ws_router(state: WsState) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .with_state(state)
}

pub async fn websocket_handler(State(state): State<WsState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection from registration to close.
pub async fn handle_socket(socket: WebSocket, state: WsState) {
    let WsState {
        notifier,
        settings,
        metrics,
    } = state;

    let sink_id = SinkId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Utf8Bytes>(settings.sink_buffer);

    if !notifier.register(Sink::new(sink_id, tx)) {
        debug!(sink_id = %sink_id, "Notification loop stopped; refusing connection");
        let _ = ws_sender.send(Message::Close(None)).await;
        return;
    }
    metrics.connection_opened();
    info!(sink_id = %sink_id, "Viewer connected");

    let sender_task = write_frames(sink_id, rx, ws_sender, settings.send_timeout);

    let receiver_task = async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(sink_id = %sink_id, error = %e, "Read failed");
                    break;
                }
            }
        }
    };

    tokio::select! {
        exit = sender_task => debug!(sink_id = %sink_id, ?exit, "Writer finished"),
        _ = receiver_task => {}
    }

    notifier.unregister(sink_id);
    metrics.connection_closed();
    info!(sink_id = %sink_id, "Viewer disconnected");
}

/// Why a connection's writer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The loop dropped the sink (slow consumer or shutdown).
    OutboxClosed,
    WriteFailed,
    /// One frame took longer than the write budget.
    TimedOut,
}

/// Drain `outbox` into `out`, one frame at a time, each within `send_timeout`.
async fn write_frames<S>(
    sink_id: SinkId,
    mut outbox: mpsc::Receiver<Utf8Bytes>,
    mut out: S,
    send_timeout: Duration,
) -> WriterExit
where
    S: FrameSink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = outbox.recv().await {
        match tokio::time::timeout(send_timeout, out.send(Message::Text(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(sink_id = %sink_id, error = %e, "Write failed");
                return WriterExit::WriteFailed;
            }
            Err(_) => {
                warn!(sink_id = %sink_id, "Write timed out; closing connection");
                return WriterExit::TimedOut;
            }
        }
    }
    let _ = tokio::time::timeout(send_timeout, out.send(Message::Close(None))).await;
    WriterExit::OutboxClosed
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as frames;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn frame(open: bool) -> Utf8Bytes {
        crate::protocol::encode(open.into()).unwrap()
    }

    #[tokio::test]
    async fn test_writer_times_out_on_stalled_socket() {
        // Zero-capacity socket stand-in that nobody reads from.
        let (socket, _stalled) = frames::channel::<Message>(0);
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(frame(true)).unwrap();
        tx.try_send(frame(false)).unwrap();

        let exit = tokio::time::timeout(
            TEST_TIMEOUT,
            write_frames(SinkId::new(), rx, socket, Duration::from_millis(50)),
        )
        .await
        .expect("writer never gave up");
        assert_eq!(exit, WriterExit::TimedOut);
    }

    #[tokio::test]
    async fn test_writer_reports_failed_write() {
        let (socket, reader) = frames::channel::<Message>(4);
        drop(reader);
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(frame(true)).unwrap();

        let exit = write_frames(SinkId::new(), rx, socket, TEST_TIMEOUT).await;
        assert_eq!(exit, WriterExit::WriteFailed);
    }

    #[tokio::test]
    async fn test_writer_sends_close_when_outbox_closes() {
        let (socket, mut reader) = frames::channel::<Message>(4);
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(frame(true)).unwrap();
        drop(tx);

        let exit = write_frames(SinkId::new(), rx, socket, TEST_TIMEOUT).await;
        assert_eq!(exit, WriterExit::OutboxClosed);
        assert_eq!(reader.next().await, Some(Message::Text(frame(true))));
        assert_eq!(reader.next().await, Some(Message::Close(None)));
        assert_eq!(reader.next().await, None);
    }
}
