//! TokenGate implementations.

pub mod jwt;

pub use jwt::{Claims, JwtTokenGate};
