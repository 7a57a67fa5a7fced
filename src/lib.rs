//! Room sync server for a collaborative whiteboard.
//!
//! ARCHITECTURE
//! ============
//! - `element` / `reconcile`: the element model and the merge of a remote
//!   batch into a room's list.
//! - `payload` / `event` / `broadcast`: wire shapes, the event factory, and
//!   the capability events use to reach a room.
//! - `state` / `services`: live rooms and documents on this node.
//! - `routes`: the axum router and the websocket session loop.

pub mod broadcast;
pub mod config;
pub mod element;
pub mod event;
pub mod payload;
pub mod reconcile;
pub mod routes;
pub mod services;
pub mod state;
