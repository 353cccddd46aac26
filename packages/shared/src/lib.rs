//! Utilities shared by the Chatrelay binaries.

pub mod logger;
pub mod time;
