//! Per-connection handler: event routing between one socket and the
//! presence/room layers.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Create the outbound channel other layers push events into
//!   2. Loop: forward outbound events to the wire, dispatch inbound
//!      client events
//!   3. On exit (close, error, timeout, panic) the guard leaves every
//!      room and reports the disconnect to presence

use std::sync::Arc;

use beacon_backend::{Backend, Credential};
use beacon_presence::EventSender;
use beacon_protocol::{ClientEvent, Codec, ServerEvent};
use beacon_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::server::ServerState;
use crate::RelayError;

/// Drop guard that cleans a connection out of rooms and presence when
/// the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since
/// `Drop` is synchronous, we spawn a fire-and-forget task for the async
/// locks.
struct DisconnectGuard<B: Backend> {
    conn: ConnectionId,
    state: Arc<ServerState<B>>,
}

impl<B: Backend> Drop for DisconnectGuard<B> {
    fn drop(&mut self) {
        let conn = self.conn;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.rooms.lock().await.leave_all(conn);
            state.presence.disconnect(conn).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<B: Backend>(
    conn: WebSocketConnection,
    state: Arc<ServerState<B>>,
) -> Result<(), RelayError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let _guard = DisconnectGuard {
        conn: conn_id,
        state: Arc::clone(&state),
    };

    // The idle timer bounds client silence. Only inbound frames push it
    // forward — outbound deliveries must not keep a mute client alive.
    let idle = tokio::time::sleep(state.heartbeat_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // Events pushed by presence fan-out and room broadcasts.
            outbound = rx.recv() => {
                // The handler holds a sender itself, so this never
                // yields `None` while the loop is alive.
                let Some(event) = outbound else { break };
                let bytes = state.codec.encode(&event)?;
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }

            () = &mut idle => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }

            inbound = conn.recv() => {
                match inbound {
                    Ok(Some(data)) => {
                        idle.as_mut()
                            .reset(Instant::now() + state.heartbeat_timeout);
                        dispatch(&data, conn_id, &tx, &state).await;
                    }
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                }
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → room and presence cleanup fires.
    Ok(())
}

/// Decodes and routes one inbound client event.
///
/// A frame that fails to decode is logged and dropped; one misbehaving
/// client must not tear down its own connection, let alone anyone
/// else's.
async fn dispatch<B: Backend>(
    data: &[u8],
    conn_id: ConnectionId,
    tx: &EventSender,
    state: &Arc<ServerState<B>>,
) {
    let event: ClientEvent = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode event");
            return;
        }
    };

    match event {
        ClientEvent::Login { identity, credential } => {
            state
                .presence
                .login(identity, Credential::new(credential), conn_id, tx.clone())
                .await;
        }

        ClientEvent::JoinRoom { room } => {
            state.rooms.lock().await.join(conn_id, tx.clone(), room);
        }

        ClientEvent::LeaveRoom { room } => {
            state.rooms.lock().await.leave(conn_id, &room);
        }

        ClientEvent::SendMessage { identity, room, message } => {
            let delivered = state.rooms.lock().await.broadcast(
                &room,
                ServerEvent::ReceiveMessage { identity, message },
            );
            tracing::debug!(%conn_id, %room, delivered, "room message");
        }

        ClientEvent::Announce { room, message } => {
            let delivered = state
                .rooms
                .lock()
                .await
                .broadcast(&room, ServerEvent::AnnounceMessage { message });
            tracing::debug!(%conn_id, %room, delivered, "announcement");
        }

        ClientEvent::SendMessageToFriends { identity, message } => {
            let delivered =
                state.presence.send_to_friends(&identity, message).await;
            tracing::debug!(%conn_id, %identity, delivered, "friend message");
        }
    }
}
