//! Per-connection outbound writer: drains a bounded `ServerMessage` queue to the socket
//! as JSON text frames, and enforces the backpressure policy (spec §5).
//!
//! Grounded in the teacher's `send_text_message` (serialize-or-log, drop the connection
//! on a write error) generalised with a capacity probe: since `RoomHandle`/`LobbyHandle`
//! already fan out with non-blocking `try_send`, a connection that can't keep up shows up
//! here as a persistently full queue rather than a blocked actor.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::mpsc;

use crate::metrics::ServerMetrics;
use crate::protocol::close_codes;
use crate::protocol::ServerMessage;

/// How often the writer checks whether its own outbound queue has backed up.
const BACKPRESSURE_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Drives `sink` from `rx` until the socket closes, the actor drops its sender, or the
/// queue is found full (`capacity_probe.capacity() == 0`), in which case the connection
/// is closed with the normal close code and `connections_dropped_backpressure` ticks.
pub async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerMessage>,
    capacity_probe: mpsc::Sender<ServerMessage>,
    metrics: Arc<ServerMetrics>,
) {
    let mut backpressure_tick = tokio::time::interval(BACKPRESSURE_CHECK_INTERVAL);
    backpressure_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so a connection isn't punished before
    // it has received anything.
    backpressure_tick.tick().await;

    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Some(message) => {
                        let text = match serde_json::to_string(&message) {
                            Ok(text) => text,
                            Err(err) => {
                                tracing::error!(error = %err, "failed to serialize outbound message");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = backpressure_tick.tick() => {
                if capacity_probe.capacity() == 0 {
                    ServerMetrics::inc(&metrics.connections_dropped_backpressure);
                    tracing::warn!("closing connection: outbound queue saturated (backpressure)");
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: close_codes::NORMAL,
                            reason: "backpressure".into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}
