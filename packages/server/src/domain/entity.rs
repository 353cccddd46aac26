//! Entities for domain models.
//!
//! A `Room` owns its connected-client set and a bounded, FIFO-evicted message
//! history. Messages are immutable once built and shared read-only (`Arc`)
//! between the history and every recipient's outbound queue.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::{
    error::DeliveryError,
    value_object::{ConnectionId, Identity, RoomName},
};

/// Default number of messages a room keeps for replay.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Sending half of a connection's bounded outbound queue.
pub type OutboundSender = mpsc::Sender<Arc<ChatMessage>>;

/// Receiving half of a connection's bounded outbound queue.
pub type OutboundReceiver = mpsc::Receiver<Arc<ChatMessage>>;

/// Chat message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author identity
    pub user: Identity,
    /// Raw text, exactly as sent
    pub text: String,
    /// Instant the message was accepted
    pub timestamp: DateTime<Utc>,
    /// Room the message belongs to
    pub room_name: RoomName,
}

impl ChatMessage {
    pub fn new(user: Identity, text: String, timestamp: DateTime<Utc>, room_name: RoomName) -> Self {
        Self {
            user,
            text,
            timestamp,
            room_name,
        }
    }
}

/// A connection registered in a room.
#[derive(Debug)]
pub struct RoomClient {
    pub identity: Identity,
    outbound: OutboundSender,
}

impl RoomClient {
    pub fn new(identity: Identity, outbound: OutboundSender) -> Self {
        Self { identity, outbound }
    }

    /// Enqueue without waiting. A full queue counts as a failed delivery.
    fn try_deliver(&self, message: &Arc<ChatMessage>) -> Result<(), DeliveryError> {
        self.outbound
            .try_send(Arc::clone(message))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
            })
    }
}

/// Room entity
#[derive(Debug)]
pub struct Room {
    name: RoomName,
    clients: HashMap<ConnectionId, RoomClient>,
    history: VecDeque<Arc<ChatMessage>>,
    history_limit: usize,
}

impl Room {
    /// Create an empty room with the default history bound.
    pub fn new(name: RoomName) -> Self {
        Self::with_history_limit(name, DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty room keeping at most `history_limit` messages.
    pub fn with_history_limit(name: RoomName, history_limit: usize) -> Self {
        Self {
            name,
            clients: HashMap::new(),
            history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn add_client(&mut self, connection_id: ConnectionId, client: RoomClient) {
        self.clients.insert(connection_id, client);
    }

    /// Remove a client. Returns `None` if the handle was not registered.
    pub fn remove_client(&mut self, connection_id: &ConnectionId) -> Option<RoomClient> {
        self.clients.remove(connection_id)
    }

    pub fn contains_client(&self, connection_id: &ConnectionId) -> bool {
        self.clients.contains_key(connection_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Append to history, evicting the oldest entries beyond the bound.
    pub fn push_message(&mut self, message: Arc<ChatMessage>) {
        self.history.push_back(message);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// History in insertion order, oldest first.
    pub fn history_snapshot(&self) -> Vec<Arc<ChatMessage>> {
        self.history.iter().cloned().collect()
    }

    /// Enqueue `message` for every client and drop the clients that could not
    /// take it.
    ///
    /// Returns the number of successful deliveries together with the evicted
    /// handles and the reason each one failed.
    pub fn deliver(
        &mut self,
        message: &Arc<ChatMessage>,
    ) -> (usize, Vec<(ConnectionId, DeliveryError)>) {
        let mut failed = Vec::new();
        for (connection_id, client) in &self.clients {
            if let Err(e) = client.try_deliver(message) {
                failed.push((*connection_id, e));
            }
        }
        for (connection_id, _) in &failed {
            self.clients.remove(connection_id);
        }
        (self.clients.len(), failed)
    }
}
