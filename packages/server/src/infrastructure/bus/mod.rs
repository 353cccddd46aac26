//! MessageBus implementations.
//!
//! - `amqp`: RabbitMQ (AMQP 0-9-1) via lapin
//! - `inmemory`: in-process queues for single-node runs and tests

pub mod amqp;
pub mod inmemory;

pub use amqp::{AmqpBus, DEFAULT_AMQP_URL};
pub use inmemory::InMemoryBus;
