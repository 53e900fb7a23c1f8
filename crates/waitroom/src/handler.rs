//! Per-connection handler: join requests in, queue events out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The loop waits on three things at once:
//!   1. frames from the browser (`joinQueue`)
//!   2. events the notification hub routes to this connection
//!   3. the heartbeat timer, which pings an otherwise idle socket
//!
//! A connection is bound in the hub under every identity it joins with,
//! and unbound from all of them when the handler exits.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use waitroom_admission::{EventSender, NotificationHub};
use waitroom_protocol::{ClientMessage, Codec, ServerMessage, SessionId};
use waitroom_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::WaitroomError;
use crate::server::ServerState;

/// Reply sent when a join carries no usable identity.
const INVALID_USER_ID: &str = "Invalid userId";

/// Drop guard that unbinds a connection from the hub when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct BindingGuard {
    conn_id: ConnectionId,
    hub: Arc<NotificationHub>,
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            let unbound = hub.unbind(conn_id).await;
            if !unbound.is_empty() {
                tracing::debug!(%conn_id, count = unbound.len(), "channel bindings removed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), WaitroomError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let _guard = BindingGuard {
        conn_id,
        hub: Arc::clone(state.coordinator.hub()),
    };

    let period = state.heartbeat_interval;
    let mut heartbeat = time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => {
                    handle_frame(&conn, &state, &events_tx, &data).await?;
                }
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            Some(event) = events_rx.recv() => {
                send_message(&conn, &state.codec, &ServerMessage::from(event)).await?;
            }
            _ = heartbeat.tick() => {
                if let Err(e) = conn.ping().await {
                    tracing::info!(%conn_id, error = %e, "heartbeat failed");
                    break;
                }
            }
        }
    }

    // _guard drops here → hub unbind fires.
    Ok(())
}

/// Decodes one frame and acts on it.
///
/// Bad input is answered with an `error` event and the connection stays
/// open; only a failed send ends the handler.
async fn handle_frame(
    conn: &WebSocketConnection,
    state: &ServerState,
    events_tx: &EventSender,
    data: &[u8],
) -> Result<(), WaitroomError> {
    let conn_id = conn.id();

    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode frame");
            return send_error(conn, state, &format!("invalid message: {e}")).await;
        }
    };

    match msg {
        ClientMessage::JoinQueue { user_id } => {
            let Some(user_id) = user_id.and_then(SessionId::new) else {
                tracing::warn!(%conn_id, "joinQueue without a userId");
                return send_error(conn, state, INVALID_USER_ID).await;
            };

            // Bind first: the join's own push (an error included), and any
            // promotion right after it, must find this connection.
            state
                .coordinator
                .hub()
                .bind(user_id.clone(), conn_id, events_tx.clone())
                .await;
            tracing::debug!(%conn_id, session_id = %user_id, "join requested");

            if let Err(e) = state.coordinator.join(&user_id).await {
                tracing::warn!(%conn_id, session_id = %user_id, error = %e, "join failed");
            }
        }
    }

    Ok(())
}

async fn send_message(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), WaitroomError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` event to the client.
async fn send_error(
    conn: &WebSocketConnection,
    state: &ServerState,
    message: &str,
) -> Result<(), WaitroomError> {
    let msg = ServerMessage::Error {
        message: message.to_string(),
    };
    send_message(conn, &state.codec, &msg).await
}
