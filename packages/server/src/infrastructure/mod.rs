//! Infrastructure layer: concrete implementations of the domain traits.
//!
//! - `registry`: in-process room registry
//! - `auth`: bearer token validation
//! - `quote`: stock quote lookup
//! - `bus`: message bus backends (AMQP and in-process)
//! - `dto`: wire representations

pub mod auth;
pub mod bus;
pub mod dto;
pub mod quote;
pub mod registry;
