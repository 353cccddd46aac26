//! WebSocket message DTOs.
//!
//! Client-to-server frames are raw text. Server-to-client frames are one JSON
//! object per message with PascalCase keys:
//!
//! ```json
//! {"User":"alice","Text":"hello","Timestamp":"2024-01-02T03:04:05.678Z","RoomName":"lobby"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;
use chatrelay_shared::time::to_rfc3339_millis;

/// Chat message frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageDto {
    pub user: String,
    pub text: String,
    /// ISO-8601 instant, UTC
    pub timestamp: String,
    pub room_name: String,
}

impl From<&ChatMessage> for MessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            user: message.user.as_str().to_string(),
            text: message.text.clone(),
            timestamp: to_rfc3339_millis(&message.timestamp),
            room_name: message.room_name.as_str().to_string(),
        }
    }
}

impl MessageDto {
    /// Parse the timestamp back into an instant.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
