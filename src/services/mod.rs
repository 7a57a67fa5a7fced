//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the document and room logic so the route handler can
//! stay focused on protocol translation. `admission` and `document` hold the
//! per-room element list; `room` drives join/leave presence.

pub mod admission;
pub mod document;
pub mod room;
