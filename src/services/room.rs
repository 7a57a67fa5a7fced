//! Room service: join/leave and presence announcements.
//!
//! DESIGN
//! ======
//! A session is in at most one room. Joining a second room leaves the first.
//!
//! On join:
//! - the only member gets `first-in-room`;
//! - otherwise the existing members get `new-user` with the joiner's id;
//! - the joiner gets the stored document, if the room has one;
//! - everyone gets the updated member list via a `RoomUserChange` event.
//!
//! On leave the remaining members get a fresh member list. The last member
//! out evicts the room's document, unless a new member joined in between.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::element::Element;
use crate::event::Event;
use crate::payload::{CLIENT_BROADCAST, FIRST_IN_ROOM, NEW_USER, OutboundMessage};
use crate::state::AppState;

/// `type` of the client-broadcast body that carries a full element list.
pub const SCENE_INIT: &str = "scene-init";
/// `type` of the client-broadcast body that carries a merged element list.
pub const SCENE_SYNC: &str = "scene-sync";

/// Join `session_id` to `room_id` and announce it.
pub async fn join_room(state: &AppState, room_id: &str, session_id: &str) {
    if let Some(previous) = state.rooms.room_of(session_id) {
        if previous != room_id {
            leave_room(state, &previous, session_id).await;
        }
    }

    let members = state.rooms.join(room_id, session_id);
    info!(%room_id, %session_id, members, "room: session joined");

    if members == 1 {
        state.rooms.send_to(session_id, OutboundMessage::new(FIRST_IN_ROOM, Value::Null).with_room(room_id));
    } else {
        let message = OutboundMessage::new(NEW_USER, session_id).with_room(room_id);
        state.rooms.emit_except(room_id, &message, Some(session_id));
    }

    let snapshot = state.documents.snapshot(room_id).await;
    if !snapshot.is_empty() {
        match scene_body(SCENE_INIT, &snapshot) {
            Ok(body) => {
                let message = OutboundMessage::bytes(CLIENT_BROADCAST, &body).with_room(room_id);
                state.rooms.send_to(session_id, message);
            }
            Err(e) => warn!(%room_id, error = %e, "room: failed to encode scene snapshot"),
        }
    }

    announce_members(state, room_id);
}

/// Remove `session_id` from `room_id` and tell whoever is left.
pub async fn leave_room(state: &AppState, room_id: &str, session_id: &str) {
    let remaining = state.rooms.leave(room_id, session_id);
    info!(%room_id, %session_id, remaining, "room: session left");

    if remaining == 0 {
        evict_if_abandoned(state, room_id).await;
    } else {
        announce_members(state, room_id);
    }
}

/// Evict a room's document unless someone joined since the last leave.
async fn evict_if_abandoned(state: &AppState, room_id: &str) -> bool {
    state
        .documents
        .evict_if(room_id, || !state.rooms.has_members(room_id))
        .await
}

/// Leave whatever room the session is in.
pub async fn leave_current(state: &AppState, session_id: &str) {
    match state.rooms.room_of(session_id) {
        Some(room_id) => leave_room(state, &room_id, session_id).await,
        None => debug!(%session_id, "room: session was not in a room"),
    }
}

#[derive(Serialize)]
struct SceneBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    elements: &'a [Arc<Element>],
}

/// Broadcast body `{"type": kind, "elements": [...]}` encoded as JSON bytes.
///
/// # Errors
///
/// Returns a serialization error if the element list cannot be encoded.
pub fn scene_body(kind: &str, elements: &[Arc<Element>]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&SceneBody { kind, elements })
}

fn announce_members(state: &AppState, room_id: &str) {
    Event::RoomUserChange { room_id: room_id.to_owned(), socket_ids: Vec::new() }.handle(&state.rooms);
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
