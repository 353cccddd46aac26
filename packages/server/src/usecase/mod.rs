//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層とバスの購読ループから呼び出され、Domain 層を操作します。

pub mod bot;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_rooms;
pub mod relay;
pub mod send_message;

pub use bot::{BotWorker, TriggerOutcome};
pub use connect_participant::{Admission, ConnectParticipantUseCase, Joined};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::ConnectError;
pub use get_rooms::GetRoomsUseCase;
pub use relay::{BusRelay, RelayOutcome, RelayPublisher};
pub use send_message::{SendMessageUseCase, SendOutcome};
