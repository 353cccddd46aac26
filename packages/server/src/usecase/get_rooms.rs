//! UseCase: ルーム一覧取得

use std::sync::Arc;

use crate::domain::{RoomName, RoomRegistry};

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl GetRoomsUseCase {
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 既知のルーム名（名前順）
    pub async fn execute(&self) -> Vec<RoomName> {
        self.registry.room_names().await
    }
}
