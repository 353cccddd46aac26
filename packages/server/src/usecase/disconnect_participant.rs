//! UseCase: 参加者切断処理

use std::sync::Arc;

use crate::domain::{ConnectionId, RoomName, RoomRegistry};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 参加者をルームから外す（冪等）
    ///
    /// 配送失敗で既に外されている場合は `false` を返す
    pub async fn execute(&self, room: &RoomName, connection_id: &ConnectionId) -> bool {
        let removed = self.registry.leave(room, connection_id).await;
        tracing::info!(
            room = %room,
            connection = %connection_id,
            "Connection left (was registered: {})",
            removed
        );
        removed
    }
}
