//! Room-based WebSocket chat relay.
//!
//! Clients join named rooms, get a bounded history replay on join, and chat
//! with everyone in the room. Chat is mirrored between server instances over a
//! message bus, and a stock quote bot injects messages into rooms through the
//! same bus.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
