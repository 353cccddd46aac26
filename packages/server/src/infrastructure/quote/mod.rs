//! QuoteFetcher implementations.

pub mod stooq;

pub use stooq::{DEFAULT_STOOQ_URL, StooqQuoteFetcher, parse_close_price};
