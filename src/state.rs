//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the room registry (which session is connected, and to which room)
//! and the document store (one element list per room).
//!
//! The registry is the live `RoomBroadcaster`. Its lock is a plain
//! `std::sync::RwLock`: every operation is a short synchronous section and
//! emits are `try_send` onto bounded per-session channels, so nothing ever
//! waits while holding it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::broadcast::RoomBroadcaster;
use crate::payload::{Delivery, OutboundMessage, RoomId, SessionId};
use crate::services::document::DocumentStore;

// =============================================================================
// ROOM REGISTRY
// =============================================================================

/// A connected session: its outbound channel and the room it joined, if any.
struct SessionEntry {
    tx: mpsc::Sender<OutboundMessage>,
    room: Option<RoomId>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, SessionEntry>,
    /// Room id → joined sessions. Empty rooms are removed.
    rooms: HashMap<RoomId, BTreeSet<SessionId>>,
}

/// Session table and room membership for this node.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and its outbound channel.
    pub fn connect(&self, session_id: &str, tx: mpsc::Sender<OutboundMessage>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.insert(session_id.to_owned(), SessionEntry { tx, room: None });
    }

    /// Forget a session entirely, leaving its room if it still has one.
    pub fn disconnect(&self, session_id: &str) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.sessions.remove(session_id) {
            if let Some(room_id) = entry.room {
                remove_member(&mut inner.rooms, &room_id, session_id);
            }
        }
    }

    /// Add a session to a room. Returns the member count after joining.
    pub fn join(&self, room_id: &str, session_id: &str) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.sessions.get_mut(session_id) {
            entry.room = Some(room_id.to_owned());
        }
        let members = inner.rooms.entry(room_id.to_owned()).or_default();
        members.insert(session_id.to_owned());
        members.len()
    }

    /// Remove a session from a room. Returns the member count left behind.
    pub fn leave(&self, room_id: &str, session_id: &str) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.sessions.get_mut(session_id) {
            if entry.room.as_deref() == Some(room_id) {
                entry.room = None;
            }
        }
        remove_member(&mut inner.rooms, room_id, session_id)
    }

    /// The room a session has joined.
    #[must_use]
    pub fn room_of(&self, session_id: &str) -> Option<RoomId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.get(session_id).and_then(|entry| entry.room.clone())
    }

    #[must_use]
    pub fn is_member(&self, room_id: &str, session_id: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .rooms
            .get(room_id)
            .is_some_and(|members| members.contains(session_id))
    }

    /// Whether any session is joined to `room_id`.
    #[must_use]
    pub fn has_members(&self, room_id: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.rooms.get(room_id).is_some_and(|members| !members.is_empty())
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rooms
            .len()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }

    /// Send a message to one session.
    pub fn send_to(&self, session_id: &str, message: OutboundMessage) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.sessions.get(session_id) {
            deliver(session_id, &entry.tx, message);
        }
    }

    /// Send a message to every member of a room except `exclude`.
    pub fn emit_except(&self, room_id: &str, message: &OutboundMessage, exclude: Option<&str>) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = inner.rooms.get(room_id) else {
            return;
        };
        for session_id in members {
            if exclude == Some(session_id.as_str()) {
                continue;
            }
            if let Some(entry) = inner.sessions.get(session_id) {
                deliver(session_id, &entry.tx, message.clone());
            }
        }
    }
}

impl RoomBroadcaster for RoomRegistry {
    fn sessions(&self, room_id: &str) -> Vec<SessionId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Fan out to the room. A broadcast is never echoed to its publisher.
    fn emit(&self, room_id: &str, message: OutboundMessage) {
        let publisher = message.publisher_id.clone();
        self.emit_except(room_id, &message, publisher.as_deref());
    }
}

fn remove_member(rooms: &mut HashMap<RoomId, BTreeSet<SessionId>>, room_id: &str, session_id: &str) -> usize {
    let Some(members) = rooms.get_mut(room_id) else {
        return 0;
    };
    members.remove(session_id);
    let remaining = members.len();
    if remaining == 0 {
        rooms.remove(room_id);
    }
    remaining
}

/// Non-blocking hand-off to a session's channel.
fn deliver(session_id: &str, tx: &mpsc::Sender<OutboundMessage>, message: OutboundMessage) {
    let delivery = message.delivery;
    match tx.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(dropped)) => match delivery {
            Delivery::Reliable => {
                warn!(%session_id, name = %dropped.name, "outbound channel full; reliable message dropped");
            }
            Delivery::Volatile => {
                debug!(%session_id, name = %dropped.name, "outbound channel full; volatile message dropped");
            }
        },
        Err(TrySendError::Closed(_)) => {
            debug!(%session_id, "outbound channel closed");
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomRegistry,
    pub documents: DocumentStore,
    /// Capacity of each session's outbound channel.
    pub channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { rooms: RoomRegistry::new(), documents: DocumentStore::new(), channel_capacity: channel_capacity.max(1) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
