//! Event model: typed inbound events and their room fan-out.
//!
//! DESIGN
//! ======
//! `create_event` is a pure switch over the payload's `name`. It never fails:
//! an unknown name yields `None` and the caller drops the message.
//!
//! Each event is consumed once by `Event::handle`, which talks to the room
//! only through a `RoomBroadcaster`. Handling is synchronous and
//! fire-and-forget; nothing is returned and nothing is awaited.
//!
//! PRESENCE
//! ========
//! Two transport nodes may each see only part of a room. `RoomUserChange`
//! unions what the local broadcaster knows with what the peer reported, so
//! every member ends up with the same sorted, deduplicated list.

use std::collections::BTreeSet;

use tracing::debug;

use crate::broadcast::RoomBroadcaster;
use crate::payload::{
    CLIENT_BROADCAST, DISCONNECT, DISCONNECTING, Delivery, InboundPayload, OutboundMessage, ROOM_USER_CHANGE,
    RoomId, SERVER_BROADCAST, SERVER_VOLATILE_BROADCAST, SessionId,
};

// =============================================================================
// EVENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Presence changed; `socket_ids` is what the publishing node knows.
    RoomUserChange { room_id: RoomId, socket_ids: Vec<SessionId> },
    /// Reliable broadcast of an opaque payload.
    ServerBroadcast { room_id: RoomId, publisher_id: Option<SessionId>, data: Vec<u8> },
    /// Best-effort broadcast of an opaque payload.
    ServerVolatileBroadcast { room_id: RoomId, publisher_id: Option<SessionId>, data: Vec<u8> },
    Disconnecting { session_id: SessionId },
    Disconnected { session_id: SessionId },
}

impl Event {
    /// Wire name of the message this event was built from.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomUserChange { .. } => ROOM_USER_CHANGE,
            Self::ServerBroadcast { .. } => SERVER_BROADCAST,
            Self::ServerVolatileBroadcast { .. } => SERVER_VOLATILE_BROADCAST,
            Self::Disconnecting { .. } => DISCONNECTING,
            Self::Disconnected { .. } => DISCONNECT,
        }
    }

    /// Room this event is scoped to, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::RoomUserChange { room_id, .. }
            | Self::ServerBroadcast { room_id, .. }
            | Self::ServerVolatileBroadcast { room_id, .. } => Some(room_id.as_str()),
            Self::Disconnecting { .. } | Self::Disconnected { .. } => None,
        }
    }

    /// Apply this event against a room broadcaster.
    pub fn handle(&self, broadcaster: &dyn RoomBroadcaster) {
        match self {
            Self::RoomUserChange { room_id, socket_ids } => {
                let members = presence_union(broadcaster.sessions(room_id), socket_ids);
                debug!(%room_id, members = members.len(), "event: room user change");
                let message = OutboundMessage::new(ROOM_USER_CHANGE, members).with_room(room_id.as_str());
                broadcaster.emit(room_id, message);
            }
            Self::ServerBroadcast { room_id, publisher_id, data } => {
                broadcaster.emit(room_id, client_broadcast(room_id, publisher_id.clone(), data, Delivery::Reliable));
            }
            Self::ServerVolatileBroadcast { room_id, publisher_id, data } => {
                broadcaster.emit(room_id, client_broadcast(room_id, publisher_id.clone(), data, Delivery::Volatile));
            }
            Self::Disconnecting { session_id } | Self::Disconnected { session_id } => {
                debug!(%session_id, event = self.name(), "event: no-op");
            }
        }
    }
}

fn client_broadcast(
    room_id: &str,
    publisher_id: Option<SessionId>,
    data: &[u8],
    delivery: Delivery,
) -> OutboundMessage {
    OutboundMessage::bytes(CLIENT_BROADCAST, data)
        .with_room(room_id)
        .with_publisher(publisher_id)
        .with_delivery(delivery)
}

/// Sorted, deduplicated union of two session lists.
#[must_use]
pub fn presence_union(known: Vec<SessionId>, reported: &[SessionId]) -> Vec<SessionId> {
    let mut members: BTreeSet<SessionId> = known.into_iter().collect();
    members.extend(reported.iter().cloned());
    members.into_iter().collect()
}

// =============================================================================
// FACTORY
// =============================================================================

/// Build the typed event for an inbound payload, or `None` for an unknown name.
#[must_use]
pub fn create_event(payload: &InboundPayload) -> Option<Event> {
    let room_id = payload.room_id.clone();
    let event = match payload.name.as_str() {
        ROOM_USER_CHANGE => Event::RoomUserChange { room_id, socket_ids: payload.socket_ids.clone().unwrap_or_default() },
        SERVER_BROADCAST => Event::ServerBroadcast {
            room_id,
            publisher_id: payload.publisher_id.clone(),
            data: payload.data.clone().unwrap_or_default(),
        },
        SERVER_VOLATILE_BROADCAST => Event::ServerVolatileBroadcast {
            room_id,
            publisher_id: payload.publisher_id.clone(),
            data: payload.data.clone().unwrap_or_default(),
        },
        DISCONNECTING => Event::Disconnecting { session_id: payload.publisher_id.clone().unwrap_or_default() },
        DISCONNECT => Event::Disconnected { session_id: payload.publisher_id.clone().unwrap_or_default() },
        _ => return None,
    };
    Some(event)
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
