//! Message bus abstraction
//!
//! The bus carries plain-text records of the form `<room-name>|<payload>`,
//! split on the first delimiter only. Optional metadata (author, origin
//! instance) travels beside the body so the body shape never changes.
//!
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::{error::BusError, error::DecodeError, value_object::RoomName};

/// Delimiter between room name and payload.
pub const RECORD_DELIMITER: char = '|';

/// Named delivery channels on the bus.
///
/// `ChatRelay` fans out: every subscriber gets its own copy of each record,
/// so every server instance sees every peer's chat. The other channels are
/// work queues shared by competing consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusChannel {
    /// Chat mirrored between server instances; records carry author and origin.
    ChatRelay,
    /// Chat injected by the bot, authored by the system identity.
    BotInbound,
    /// Quote lookup requests (`room|ticker`) for the bot worker.
    StockTrigger,
}

impl BusChannel {
    pub fn queue_name(&self) -> &'static str {
        match self {
            Self::ChatRelay => "chat_relay",
            Self::BotInbound => "chat_queue",
            Self::StockTrigger => "stock_queue",
        }
    }

    /// Whether each subscriber receives every record.
    pub fn is_fanout(&self) -> bool {
        matches!(self, Self::ChatRelay)
    }
}

/// One record on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusRecord {
    /// `<room-name>|<payload>`
    pub body: String,
    /// Original author, set on peer relay records
    pub author: Option<String>,
    /// Instance that published the record
    pub origin: Option<String>,
}

impl BusRecord {
    /// Build a record from its raw body.
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            author: None,
            origin: None,
        }
    }

    /// Encode `room|payload`.
    pub fn encode(room: &RoomName, payload: &str) -> Self {
        Self::from_body(format!("{}{}{}", room, RECORD_DELIMITER, payload))
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Split the body on the first delimiter into room and payload.
    pub fn decode(&self) -> Result<(RoomName, &str), DecodeError> {
        let (room, payload) = self
            .body
            .split_once(RECORD_DELIMITER)
            .ok_or_else(|| DecodeError::MissingDelimiter(self.body.clone()))?;
        Ok((RoomName::new(room.to_string())?, payload))
    }
}

/// Stream of records from one channel. An `Err` item means the subscription
/// is broken and the consumer should stop.
pub type BusSubscription = BoxStream<'static, Result<BusRecord, BusError>>;

/// Message bus trait
///
/// On a fanout channel each record is delivered once to every subscription
/// open at publish time. On any other channel each record is delivered to at
/// most one subscriber.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish one record. Failures are returned, never retried.
    async fn publish(&self, channel: BusChannel, record: BusRecord) -> Result<(), BusError>;

    /// Open a long-lived subscription to a channel.
    async fn subscribe(&self, channel: BusChannel) -> Result<BusSubscription, BusError>;
}
