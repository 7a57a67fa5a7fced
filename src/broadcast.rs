//! Room broadcast capability.
//!
//! The event model only needs two things from the transport: who is in a
//! room, and a way to hand every one of them a message. `RoomRegistry` is the
//! live implementation; tests use `test_helpers::RecordingBroadcaster`.

use crate::payload::{OutboundMessage, SessionId};

/// What the event model needs from a transport.
///
/// Both calls are synchronous. `emit` is fire-and-forget: it must not wait
/// for delivery or acknowledgement.
pub trait RoomBroadcaster: Send + Sync {
    /// Sessions the transport considers joined to `room_id`.
    fn sessions(&self, room_id: &str) -> Vec<SessionId>;

    /// Hand `message` to every session joined to `room_id`.
    fn emit(&self, room_id: &str, message: OutboundMessage);
}

// =============================================================================
// TEST HELPERS
// =============================================================================
