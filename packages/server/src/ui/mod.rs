//! UI 層: HTTP / WebSocket サーバー

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, router};
pub use signal::shutdown_signal;
pub use state::AppState;
