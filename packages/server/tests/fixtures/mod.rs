//! Test fixtures shared by the integration tests.
//!
//! `TestServer` runs the full stack in-process on an ephemeral port, wired to
//! the in-memory bus so tests can publish and observe bus records directly.
//! Several servers can share one bus to stand in for a multi-instance
//! deployment.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use chatrelay_server::{
    domain::{BusChannel, DEFAULT_HISTORY_LIMIT, QuoteFetcher, RoomName, RoomRegistry},
    infrastructure::{
        auth::{Claims, JwtTokenGate},
        bus::InMemoryBus,
        dto::websocket::MessageDto,
        registry::InMemoryRoomRegistry,
    },
    ui::{AppState, router},
    usecase::{
        BotWorker, BusRelay, ConnectParticipantUseCase, DisconnectParticipantUseCase,
        GetRoomsUseCase, RelayPublisher, SendMessageUseCase,
    },
};
use chatrelay_shared::time::SystemClock;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const SECRET: &[u8] = b"integration-secret";
pub const INSTANCE_ID: &str = "test-node";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Mint a valid token for `username`.
pub fn token_for(username: &str) -> String {
    let claims = Claims {
        username: username.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .expect("Failed to encode token")
}

pub fn room(name: &str) -> RoomName {
    RoomName::new(name.to_string()).expect("Invalid room name")
}

/// Helper struct to manage an in-process server
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<InMemoryRoomRegistry>,
    pub bus: Arc<InMemoryBus>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server without a bot
    pub async fn start() -> Self {
        Self::start_inner(Arc::new(InMemoryBus::new()), INSTANCE_ID, None).await
    }

    /// Start a server with a bot worker on the same bus
    pub async fn start_with_bot(quote_fetcher: Arc<dyn QuoteFetcher>) -> Self {
        Self::start_inner(Arc::new(InMemoryBus::new()), INSTANCE_ID, Some(quote_fetcher)).await
    }

    /// Start one instance of a multi-instance deployment on a shared bus
    pub async fn start_on_bus(bus: Arc<InMemoryBus>, instance_id: &str) -> Self {
        Self::start_inner(bus, instance_id, None).await
    }

    async fn start_inner(
        bus: Arc<InMemoryBus>,
        instance_id: &str,
        quote_fetcher: Option<Arc<dyn QuoteFetcher>>,
    ) -> Self {
        let registry = Arc::new(InMemoryRoomRegistry::new());
        let relay_subscribers = bus.subscriber_count(BusChannel::ChatRelay).await;
        let clock = Arc::new(SystemClock);
        let mut tasks = Vec::new();

        let relay = Arc::new(BusRelay::new(
            registry.clone(),
            bus.clone(),
            instance_id,
            clock.clone(),
        ));
        for channel in BusRelay::CHANNELS {
            let relay = relay.clone();
            tasks.push(tokio::spawn(async move {
                let _ = relay.consume(channel).await;
            }));
        }

        // Peer chat published before the relay subscribes would be missed
        for _ in 0..100 {
            if bus.subscriber_count(BusChannel::ChatRelay).await > relay_subscribers {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        if let Some(quote_fetcher) = quote_fetcher {
            let bot = BotWorker::new(quote_fetcher, bus.clone(), "test-bot");
            tasks.push(tokio::spawn(async move {
                let _ = bot.run().await;
            }));
        }

        let state = Arc::new(AppState {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                registry.clone(),
                Arc::new(JwtTokenGate::new(SECRET)),
                room("general"),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                registry.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                registry.clone(),
                Arc::new(RelayPublisher::new(bus.clone(), instance_id)),
                clock,
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(registry.clone())),
            outbound_capacity: 64,
            history_limit: DEFAULT_HISTORY_LIMIT,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local addr");
        tasks.push(tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        }));

        TestServer {
            addr,
            registry,
            bus,
            tasks,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, token: &str, room: Option<&str>) -> String {
        match room {
            Some(room) => format!("ws://{}/ws?token={}&room={}", self.addr, token, room),
            None => format!("ws://{}/ws?token={}", self.addr, token),
        }
    }

    /// Connect as `username` and wait until the server has registered the
    /// connection.
    pub async fn connect(&self, username: &str, room_name: &str) -> WsClient {
        let before = self.registry.client_count(&room(room_name)).await;
        let (ws, _) = connect_async(self.ws_url(&token_for(username), Some(room_name)))
            .await
            .expect("Failed to connect");
        self.wait_for_clients(room_name, before + 1).await;
        ws
    }

    /// Poll until `room` has exactly `count` clients.
    pub async fn wait_for_clients(&self, room_name: &str, count: usize) {
        let room = room(room_name);
        for _ in 0..100 {
            if self.registry.client_count(&room).await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room '{}' never reached {} clients", room_name, count);
    }

    /// Poll until `room` holds `len` messages.
    pub async fn wait_for_history(&self, room_name: &str, len: usize) {
        let room = room(room_name);
        for _ in 0..100 {
            if self.registry.snapshot_history(&room).await.len() == len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room '{}' never reached {} messages", room_name, len);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.into()))
        .await
        .expect("Failed to send");
}

/// Next chat frame, or `None` if nothing arrives within `wait`.
pub async fn try_recv_message(ws: &mut WsClient, wait: Duration) -> Option<MessageDto> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next()).await.ok()??;
        if let Ok(Message::Text(text)) = frame {
            return Some(serde_json::from_str(text.as_str()).expect("Invalid message JSON"));
        }
    }
}

/// Next chat frame, panicking after two seconds.
pub async fn recv_message(ws: &mut WsClient) -> MessageDto {
    try_recv_message(ws, Duration::from_secs(2))
        .await
        .expect("No message received")
}
