//! Domain layer for the chat relay.
//!
//! This module contains business logic that is independent of
//! wire formats and infrastructure concerns.

pub mod bus;
pub mod command;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod value_object;

pub use bus::{BusChannel, BusRecord, BusSubscription, MessageBus, RECORD_DELIMITER};
pub use command::ChatCommand;
pub use entity::{
    ChatMessage, DEFAULT_HISTORY_LIMIT, OutboundReceiver, OutboundSender, Room, RoomClient,
};
pub use error::{
    AdmissionError, BusError, DecodeError, DeliveryError, QuoteError, ValueObjectError,
};
pub use gateway::{QuoteFetcher, TokenGate};
pub use registry::{RoomHandle, RoomRegistry};
pub use value_object::{ConnectionId, Identity, RoomName};

/// Identity used for messages injected by the bot.
pub const SYSTEM_IDENTITY: &str = "Bot";
