//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomsUseCase, SendMessageUseCase,
};

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// 接続ごとの送信キューの容量
    pub outbound_capacity: usize,
    /// 参加時に再生する履歴の最大件数（送信キューに上乗せして確保する）
    pub history_limit: usize,
}
