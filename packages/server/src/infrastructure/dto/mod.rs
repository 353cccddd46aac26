//! Data Transfer Objects (DTOs).
//!
//! - `websocket`: frames pushed to WebSocket clients

pub mod websocket;
