//! HS256 JWT implementation of TokenGate.
//!
//! Tokens carry the display name in a `username` claim and must not be
//! expired. Issuing tokens is handled elsewhere.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::domain::{AdmissionError, Identity, TokenGate};

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: u64,
}

/// Validates HS256-signed tokens against a shared secret.
pub struct JwtTokenGate {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenGate {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenGate for JwtTokenGate {
    fn validate(&self, token: &str) -> Result<Identity, AdmissionError> {
        if token.is_empty() {
            return Err(AdmissionError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AdmissionError::InvalidToken(e.to_string()))?;

        Identity::new(data.claims.username)
            .map_err(|e| AdmissionError::InvalidToken(e.to_string()))
    }
}
