//! Chat relay server.
//!
//! Serves WebSocket clients, mirrors chat over the message bus and relays bot
//! messages into rooms.
//!
//! Run with:
//! ```not_rust
//! JWT_SECRET=secret cargo run --bin chatrelay-server
//! cargo run --bin chatrelay-server -- --bus memory --embedded-bot --jwt-secret secret
//! ```

use std::sync::Arc;

use chatrelay_server::{
    domain::{MessageBus, RoomName, RoomRegistry},
    infrastructure::{
        auth::JwtTokenGate,
        bus::{AmqpBus, DEFAULT_AMQP_URL, InMemoryBus},
        quote::{DEFAULT_STOOQ_URL, StooqQuoteFetcher},
        registry::InMemoryRoomRegistry,
    },
    ui::{Server, state::DEFAULT_OUTBOUND_CAPACITY},
    usecase::{
        BotWorker, BusRelay, ConnectParticipantUseCase, DisconnectParticipantUseCase,
        GetRoomsUseCase, RelayPublisher, SendMessageUseCase,
    },
};
use chatrelay_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};
use clap::{Parser, ValueEnum};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BusKind {
    /// RabbitMQ
    Amqp,
    /// In-process queues (single instance)
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "chatrelay-server")]
#[command(about = "Room-based WebSocket chat relay", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Message bus backend
    #[arg(long, env = "BUS", value_enum, default_value_t = BusKind::Amqp)]
    bus: BusKind,

    /// AMQP broker URL
    #[arg(long, env = "AMQP_URL", default_value = DEFAULT_AMQP_URL)]
    amqp_url: String,

    /// Secret used to verify HS256 access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Room used when a client does not name one
    #[arg(long, env = "DEFAULT_ROOM", default_value = "general")]
    default_room: String,

    /// Messages kept per room for replay
    #[arg(long, env = "HISTORY_LIMIT", default_value_t = chatrelay_server::domain::DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    /// Outbound queue capacity per connection
    #[arg(long, env = "OUTBOUND_BUFFER", default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    outbound_buffer: usize,

    /// Run the stock quote bot inside this process
    #[arg(long, env = "EMBEDDED_BOT")]
    embedded_bot: bool,

    /// Base URL of the quote service
    #[arg(long, env = "QUOTE_URL", default_value = DEFAULT_STOOQ_URL)]
    quote_url: String,

    /// Identifier of this instance on the bus (random if omitted)
    #[arg(long, env = "INSTANCE_ID")]
    instance_id: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let default_room = match RoomName::new(args.default_room.clone()) {
        Ok(room) => room,
        Err(e) => {
            tracing::error!("Invalid default room '{}': {}", args.default_room, e);
            std::process::exit(1);
        }
    };
    if args.outbound_buffer == 0 {
        tracing::error!("--outbound-buffer must be at least 1");
        std::process::exit(1);
    }
    let instance_id = args
        .instance_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::info!("Instance id: {}", instance_id);

    // Initialize dependencies in order:
    // 1. Registry, bus and gateways
    // 2. Bus relay loops (and the bot, if embedded)
    // 3. UseCases
    // 4. Server

    // 1. Registry, bus and gateways
    let registry: Arc<dyn RoomRegistry> =
        Arc::new(InMemoryRoomRegistry::with_history_limit(args.history_limit));
    let bus: Arc<dyn MessageBus> = match args.bus {
        BusKind::Amqp => Arc::new(AmqpBus::new(args.amqp_url, instance_id.clone())),
        BusKind::Memory => Arc::new(InMemoryBus::new()),
    };
    let token_gate = Arc::new(JwtTokenGate::new(args.jwt_secret.as_bytes()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 2. Bus relay loops. Losing the bus is fatal.
    let relay = Arc::new(BusRelay::new(
        registry.clone(),
        bus.clone(),
        instance_id.clone(),
        clock.clone(),
    ));
    for channel in BusRelay::CHANNELS {
        let relay = relay.clone();
        tokio::spawn(async move {
            if let Err(e) = relay.consume(channel).await {
                tracing::error!("Relay loop for {} stopped: {}", channel.queue_name(), e);
                std::process::exit(1);
            }
        });
    }

    if args.embedded_bot {
        let bot = BotWorker::new(
            Arc::new(StooqQuoteFetcher::new(args.quote_url)),
            bus.clone(),
            instance_id.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = bot.run().await {
                tracing::error!("Bot worker stopped: {}", e);
                std::process::exit(1);
            }
        });
    } else if args.bus == BusKind::Memory {
        tracing::warn!("In-memory bus without --embedded-bot: stock commands get no answer");
    }

    // 3. Create UseCases
    let publisher = Arc::new(RelayPublisher::new(bus.clone(), instance_id));
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        registry.clone(),
        token_gate,
        default_room,
    ));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(registry.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        registry.clone(),
        publisher,
        clock,
    ));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(registry));

    // 4. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        get_rooms_usecase,
        args.outbound_buffer,
        args.history_limit,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
