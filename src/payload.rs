//! Payload: the wire shapes exchanged with clients.
//!
//! ARCHITECTURE
//! ============
//! Every inbound message is one flat `InboundPayload` discriminated by
//! `name`. The transport stamps `publisherId` with the sending session, the
//! event factory turns the payload into a typed `Event`, and handlers fan out
//! `OutboundMessage`s through a `RoomBroadcaster`.
//!
//! DESIGN
//! ======
//! - Field names follow the whiteboard client (`roomID`, `socketIDs`,
//!   `publisherId`), so payloads pass through unchanged.
//! - `data` on a broadcast is opaque bytes. The core never decodes it. On the
//!   wire it is a base64 string; inbound, a plain byte array is also accepted.
//! - Delivery intent (reliable vs volatile) rides on the outbound message but
//!   never goes over the wire.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::element::RemoteElement;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Logical broadcast domain. One room per shared document.
pub type RoomId = String;

/// A connected transport session.
pub type SessionId = String;

// =============================================================================
// MESSAGE NAMES
// =============================================================================

/// Presence list for a room (inbound from peers and outbound to clients).
pub const ROOM_USER_CHANGE: &str = "room-user-change";
/// Reliable room broadcast request.
pub const SERVER_BROADCAST: &str = "server-broadcast";
/// Best-effort room broadcast request (cursors, pointers).
pub const SERVER_VOLATILE_BROADCAST: &str = "server-volatile-broadcast";
/// Session is about to leave its rooms.
pub const DISCONNECTING: &str = "disconnecting";
/// Session is gone.
pub const DISCONNECT: &str = "disconnect";

/// Client asks to join a room.
pub const JOIN_ROOM: &str = "join-room";
/// Client submits a batch of element edits for server-side reconciliation.
pub const SCENE_UPDATE: &str = "scene-update";

/// Broadcast payload delivered to room members.
pub const CLIENT_BROADCAST: &str = "client-broadcast";
/// Sent once on connect; the client answers with `join-room`.
pub const INIT_ROOM: &str = "init-room";
/// Sent to a session that joined an empty room.
pub const FIRST_IN_ROOM: &str = "first-in-room";
/// Sent to existing members when a session joins.
pub const NEW_USER: &str = "new-user";
/// Structured error sent back to the offending session.
pub const ERROR: &str = "error";

// =============================================================================
// INBOUND
// =============================================================================

/// One inbound message. Which fields are meaningful depends on `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundPayload {
    pub name: String,
    #[serde(rename = "roomID", default)]
    pub room_id: RoomId,
    #[serde(rename = "publisherId", default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<SessionId>,
    #[serde(default, with = "wire_bytes", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(rename = "socketIDs", default, skip_serializing_if = "Option::is_none")]
    pub socket_ids: Option<Vec<SessionId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<RemoteElement>>,
}

impl InboundPayload {
    pub fn new(name: impl Into<String>, room_id: impl Into<RoomId>) -> Self {
        Self { name: name.into(), room_id: room_id.into(), ..Self::default() }
    }

    /// Decode a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Decode` if the text is not a valid payload.
    pub fn parse(text: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher_id: impl Into<SessionId>) -> Self {
        self.publisher_id = Some(publisher_id.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn with_socket_ids(mut self, socket_ids: Vec<SessionId>) -> Self {
        self.socket_ids = Some(socket_ids);
        self
    }

    #[must_use]
    pub fn with_elements(mut self, elements: Vec<RemoteElement>) -> Self {
        self.elements = Some(elements);
        self
    }

    /// The room id, or `MissingRoom` when the payload names none.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingRoom` for an empty `roomID`.
    pub fn require_room(&self) -> Result<&str, PayloadError> {
        if self.room_id.is_empty() {
            return Err(PayloadError::MissingRoom { name: self.name.clone() });
        }
        Ok(&self.room_id)
    }
}

/// Serde adapter for `data`: base64 text out, base64 text or byte array in.
mod wire_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireBytes {
        Text(String),
        Array(Vec<u8>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<WireBytes>::deserialize(deserializer)? {
            None => Ok(None),
            Some(WireBytes::Array(bytes)) => Ok(Some(bytes)),
            Some(WireBytes::Text(text)) => STANDARD.decode(text).map(Some).map_err(D::Error::custom),
        }
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Delivery intent. The transport decides what each one costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// Must not be silently dropped (element batches).
    #[default]
    Reliable,
    /// Only the latest value matters (cursor positions).
    Volatile,
}

/// A named message emitted to one session or every session in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub name: String,
    #[serde(rename = "roomID", default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(rename = "publisherId", default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<SessionId>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(skip)]
    pub delivery: Delivery,
}

impl OutboundMessage {
    pub fn new(name: impl Into<String>, data: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            room_id: None,
            publisher_id: None,
            data: data.into(),
            delivery: Delivery::Reliable,
        }
    }

    /// A message carrying raw bytes, base64-encoded.
    pub fn bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(name, STANDARD.encode(bytes))
    }

    /// Structured error for a client, carrying a grepable code.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::new(
            ERROR,
            serde_json::json!({
                "code": err.error_code(),
                "message": err.to_string(),
            }),
        )
    }

    #[must_use]
    pub fn with_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher_id: Option<SessionId>) -> Self {
        self.publisher_id = publisher_id;
        self
    }

    #[must_use]
    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code for structured error messages.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to encode message: {0}")]
    Encode(serde_json::Error),
    #[error("roomID required for {name}")]
    MissingRoom { name: String },
    #[error("elements required for {name}")]
    MissingElements { name: String },
    #[error("session is not joined to room {0}")]
    NotInRoom(RoomId),
}

impl ErrorCode for PayloadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "E_INVALID_PAYLOAD",
            Self::Encode(_) => "E_ENCODE",
            Self::MissingRoom { .. } => "E_MISSING_ROOM",
            Self::MissingElements { .. } => "E_MISSING_ELEMENTS",
            Self::NotInRoom(_) => "E_NOT_IN_ROOM",
        }
    }
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
