//! WebSocket handler: one session per connection.
//!
//! DESIGN
//! ======
//! On upgrade, generates a session id, registers an outbound channel with
//! the room registry and enters a `select!` loop:
//! - Incoming client text → parse + dispatch by message name
//! - Messages emitted to this session by room peers → forward to client
//!
//! Everything outbound goes through the session's channel, including
//! `init-room`, so the socket has a single writer.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → queue `init-room`
//! 2. Client sends `join-room` → presence announcements
//! 3. Client sends broadcasts / scene updates → event model / document store.
//!    Client `room-user-change` reports are ignored; presence is server-derived.
//! 4. Close → `disconnecting` → leave room → `disconnect` → unregister

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{Event, create_event};
use crate::payload::{
    DISCONNECT, DISCONNECTING, INIT_ROOM, InboundPayload, JOIN_ROOM, OutboundMessage, PayloadError, ROOM_USER_CHANGE,
    SCENE_UPDATE,
};
use crate::services;
use crate::services::room::SCENE_SYNC;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();

    let (session_tx, mut session_rx) = mpsc::channel::<OutboundMessage>(state.channel_capacity);
    state.rooms.connect(&session_id, session_tx);
    state
        .rooms
        .send_to(&session_id, OutboundMessage::new(INIT_ROOM, Value::Null));

    info!(%session_id, "ws: session connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, &session_id, text.as_str()).await;
                        if send_all(&mut socket, &replies).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(message) = session_rx.recv() => {
                if send_message(&mut socket, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    close_session(&state, &session_id).await;
    info!(%session_id, "ws: session disconnected");
}

/// Tear down a session: lifecycle events, room leave, unregister.
async fn close_session(state: &AppState, session_id: &str) {
    dispatch_lifecycle(state, DISCONNECTING, session_id);
    services::room::leave_current(state, session_id).await;
    dispatch_lifecycle(state, DISCONNECT, session_id);
    state.rooms.disconnect(session_id);
}

fn dispatch_lifecycle(state: &AppState, name: &str, session_id: &str) {
    let payload = InboundPayload::new(name, "").with_publisher(session_id);
    if let Some(event) = create_event(&payload) {
        event.handle(&state.rooms);
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return messages for the sender.
async fn process_inbound_text(state: &AppState, session_id: &str, text: &str) -> Vec<OutboundMessage> {
    let mut payload = match InboundPayload::parse(text) {
        Ok(p) => p,
        Err(e) => {
            warn!(%session_id, error = %e, "ws: invalid inbound payload");
            return vec![OutboundMessage::error_from(&e)];
        }
    };

    // The transport owns identity: whatever the client claimed is replaced.
    payload.publisher_id = Some(session_id.to_owned());
    debug!(%session_id, name = %payload.name, room_id = %payload.room_id, "ws: recv");

    let result = match payload.name.as_str() {
        JOIN_ROOM => handle_join(state, session_id, &payload).await,
        SCENE_UPDATE => handle_scene_update(state, session_id, payload).await,
        ROOM_USER_CHANGE => {
            // Member lists come from the registry only.
            debug!(%session_id, room_id = %payload.room_id, "ws: ignoring client presence report");
            Ok(())
        }
        _ => dispatch_event(state, session_id, &payload),
    };

    match result {
        Ok(()) => Vec::new(),
        Err(e) => {
            warn!(%session_id, error = %e, "ws: request failed");
            vec![OutboundMessage::error_from(&e)]
        }
    }
}

async fn handle_join(state: &AppState, session_id: &str, payload: &InboundPayload) -> Result<(), PayloadError> {
    let room_id = payload.require_room()?;
    services::room::join_room(state, room_id, session_id).await;
    Ok(())
}

async fn handle_scene_update(state: &AppState, session_id: &str, payload: InboundPayload) -> Result<(), PayloadError> {
    let room_id = payload.require_room()?.to_owned();
    if !state.rooms.is_member(&room_id, session_id) {
        return Err(PayloadError::NotInRoom(room_id));
    }
    let Some(elements) = payload.elements else {
        return Err(PayloadError::MissingElements { name: payload.name });
    };

    let outcome = state.documents.apply(&room_id, elements).await;
    let data = services::room::scene_body(SCENE_SYNC, &outcome.elements).map_err(PayloadError::Encode)?;

    // Every member, the sender included, converges on the merged list.
    Event::ServerBroadcast { room_id, publisher_id: None, data }.handle(&state.rooms);
    Ok(())
}

/// Route a payload through the event factory. Unknown names are dropped.
fn dispatch_event(state: &AppState, session_id: &str, payload: &InboundPayload) -> Result<(), PayloadError> {
    let Some(event) = create_event(payload) else {
        debug!(%session_id, name = %payload.name, "ws: dropping unrecognized message");
        return Ok(());
    };
    if let Some(room_id) = event.room_id() {
        if !state.rooms.is_member(room_id, session_id) {
            return Err(PayloadError::NotInRoom(room_id.to_owned()));
        }
    }
    event.handle(&state.rooms);
    Ok(())
}

// =============================================================================
// SEND
// =============================================================================

async fn send_all(socket: &mut WebSocket, messages: &[OutboundMessage]) -> Result<(), ()> {
    for message in messages {
        send_message(socket, message).await?;
    }
    Ok(())
}

async fn send_message(socket: &mut WebSocket, message: &OutboundMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
