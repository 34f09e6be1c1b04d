//! WebSocket connection handling
//!
//! Each connection runs `Handshake -> Active -> Closed`. The first data
//! frame names the peer; every later frame is a JSON message draft that is
//! recorded, fanned out to the other peers and echoed back to the sender.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chatline_protocol::{Message, MessageDraft};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::broadcast::broadcast;
use crate::error::ChatError;
use crate::registry::{next_connection_id, Connection, PeerSender};
use crate::state::AppState;

const OUTBOUND_CAPACITY: usize = 100;
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of one connection.
#[derive(Debug)]
enum ConnectionState {
    Handshake,
    Active { identity: String },
    Closed { identity: Option<String> },
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive a WebSocket: a writer task drains the outbound queue while the
/// state machine consumes inbound frames.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = next_connection_id();
    info!(
        component = "websocket",
        event = "ws.connection.opened",
        connection_id = conn_id,
        "WebSocket connection opened"
    );

    let (mut ws_tx, ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(
                        component = "websocket",
                        event = "ws.send.serialize_failed",
                        connection_id = conn_id,
                        error = %e,
                        "Failed to serialize message"
                    );
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                debug!(
                    component = "websocket",
                    event = "ws.send.disconnected",
                    connection_id = conn_id,
                    "WebSocket send failed, client disconnected"
                );
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let outcome = run_connection(conn_id, ws_rx, outbound_tx, state).await;

    match &outcome {
        Ok(()) => info!(
            component = "websocket",
            event = "ws.connection.closed",
            connection_id = conn_id,
            "WebSocket connection closed"
        ),
        Err(e) => warn!(
            component = "websocket",
            event = "ws.connection.failed",
            connection_id = conn_id,
            error = %e,
            "WebSocket connection closed after error"
        ),
    }

    // All senders are gone once the registration is released, so the writer
    // flushes what is queued and exits. Give it a moment, then stop it.
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }
}

/// Run the connection state machine over `inbound` until the peer goes
/// away or a frame is rejected.
///
/// Returns `Ok` when the peer closed the stream and the error that ended
/// the connection otherwise. Either way the peer is deregistered on return.
pub async fn run_connection<S>(
    conn_id: u64,
    mut inbound: S,
    outbound: PeerSender,
    state: Arc<AppState>,
) -> Result<(), ChatError>
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    let mut conn_state = ConnectionState::Handshake;
    let mut outcome = Ok(());

    loop {
        conn_state = match conn_state {
            ConnectionState::Handshake => match handshake(&mut inbound).await {
                Ok(Some(identity)) => {
                    register(conn_id, &identity, &outbound, &state).await;
                    ConnectionState::Active { identity }
                }
                Ok(None) => ConnectionState::Closed { identity: None },
                Err(e) => {
                    debug!(
                        component = "websocket",
                        event = "ws.handshake.rejected",
                        connection_id = conn_id,
                        error = %e,
                        "Handshake rejected"
                    );
                    outcome = Err(e);
                    ConnectionState::Closed { identity: None }
                }
            },
            ConnectionState::Active { identity } => {
                match relay_next(conn_id, &mut inbound, &outbound, &state).await {
                    Ok(true) => ConnectionState::Active { identity },
                    Ok(false) => ConnectionState::Closed {
                        identity: Some(identity),
                    },
                    Err(e) => {
                        outcome = Err(e);
                        ConnectionState::Closed {
                            identity: Some(identity),
                        }
                    }
                }
            }
            ConnectionState::Closed { identity } => {
                if let Some(identity) = identity {
                    let released = state.connections.release(&identity, conn_id).await;
                    info!(
                        component = "websocket",
                        event = "ws.identity.deregistered",
                        connection_id = conn_id,
                        identity = %identity,
                        released,
                        "Connection left"
                    );
                }
                return outcome;
            }
        };
    }
}

/// Read the identity frame. `Ok(None)` means the peer left first.
async fn handshake<S>(inbound: &mut S) -> Result<Option<String>, ChatError>
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    match next_data_frame(inbound).await? {
        Some(identity) if identity.is_empty() => Err(ChatError::EmptyIdentity),
        other => Ok(other),
    }
}

async fn register(conn_id: u64, identity: &str, outbound: &PeerSender, state: &AppState) {
    let connection = Connection::new(conn_id, identity.to_string(), outbound.clone());
    let avatar = connection.avatar.clone();
    if let Some(replaced) = state.connections.register(connection).await {
        warn!(
            component = "websocket",
            event = "ws.identity.replaced",
            connection_id = conn_id,
            replaced_connection_id = replaced.id,
            identity = %identity,
            "Identity re-registered, previous connection no longer receives broadcasts"
        );
    }
    let peers = state.connections.len().await;
    info!(
        component = "websocket",
        event = "ws.identity.registered",
        connection_id = conn_id,
        identity = %identity,
        avatar = %avatar,
        peers,
        "Handshake accepted"
    );
}

/// Handle one inbound message frame. Returns `Ok(false)` once the peer
/// has closed the stream.
async fn relay_next<S>(
    conn_id: u64,
    inbound: &mut S,
    outbound: &PeerSender,
    state: &AppState,
) -> Result<bool, ChatError>
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    let Some(frame) = next_data_frame(inbound).await? else {
        return Ok(false);
    };

    let draft: MessageDraft = serde_json::from_str(&frame)?;
    if draft.from.is_empty() {
        return Err(ChatError::EmptySender);
    }

    let recorded = state.record(draft).await?;
    let message = recorded.message;
    let delivered = broadcast(&state.connections, &message).await;

    debug!(
        component = "websocket",
        event = "ws.message.relayed",
        connection_id = conn_id,
        message_id = message.id,
        from = %message.from,
        to = %message.to,
        summary_updated = recorded.summary_updated,
        delivered,
        "Message relayed"
    );

    let _ = outbound.send(message).await;
    Ok(true)
}

/// Next text payload, skipping control frames. `Ok(None)` on close or end
/// of stream.
async fn next_data_frame<S>(inbound: &mut S) -> Result<Option<String>, ChatError>
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        match frame? {
            WsMessage::Text(text) => return Ok(Some(text.as_str().to_owned())),
            WsMessage::Binary(bytes) => {
                return String::from_utf8(bytes.to_vec())
                    .map(Some)
                    .map_err(ChatError::from)
            }
            WsMessage::Close(_) => return Ok(None),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
        }
    }
    Ok(None)
}
