//! Domain layer error definitions.

use thiserror::Error;

use super::bus::BusChannel;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// RoomName validation error
    #[error("RoomName cannot be empty")]
    RoomNameEmpty,

    /// RoomName too long error
    #[error("RoomName cannot exceed {max} characters (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    /// RoomName contains the bus record delimiter
    #[error("RoomName cannot contain '{0}'")]
    RoomNameContainsDelimiter(char),

    /// Identity validation error
    #[error("Identity cannot be empty")]
    IdentityEmpty,
}

/// Connection admission failures. Always rejected, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// A bus record or client frame that cannot be turned into a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record has no '|' delimiter: {0:?}")]
    MissingDelimiter(String),

    #[error("record names an invalid room: {0}")]
    InvalidRoom(#[from] ValueObjectError),

    #[error("relay record carries no author")]
    MissingAuthor,

    #[error("stock trigger carries no ticker")]
    EmptyTicker,

    #[error("{0:?} records are not relayed into rooms")]
    UnexpectedChannel(BusChannel),
}

/// Enqueueing a message onto a connection's outbound queue failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Disconnected,
}

/// Failures talking to the message bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("failed to connect to the bus: {0}")]
    Connect(String),

    #[error("failed to open or declare {channel:?}: {reason}")]
    Declare { channel: BusChannel, reason: String },

    #[error("failed to publish to {channel:?}: {reason}")]
    Publish { channel: BusChannel, reason: String },

    #[error("failed to consume from {channel:?}: {reason}")]
    Consume { channel: BusChannel, reason: String },

    #[error("subscription to {0:?} ended")]
    SubscriptionClosed(BusChannel),
}

/// Quote lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("no quote available for {0}")]
    NotFound(String),

    #[error("quote service unavailable: {0}")]
    Unavailable(String),
}
