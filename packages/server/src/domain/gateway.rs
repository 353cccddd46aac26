//! External collaborators consumed by the core: token validation and quote
//! lookup.

use async_trait::async_trait;

use super::{
    error::{AdmissionError, QuoteError},
    value_object::Identity,
};

/// Validates an opaque bearer credential and extracts the identity it names.
pub trait TokenGate: Send + Sync {
    fn validate(&self, token: &str) -> Result<Identity, AdmissionError>;
}

/// Looks up the latest price for a ticker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<String, QuoteError>;
}
