//! InMemory RoomRegistry 実装
//!
//! ドメイン層が定義する RoomRegistry trait の具体的な実装。
//! ルーム名 → ルームの HashMap をプロセス内で保持します。
//!
//! ## ロックの構成
//!
//! - ルームマップ全体のロック: ルームの作成と検索のみ（短時間）
//! - ルームごとのロック: クライアント集合と履歴の変更、配送
//!
//! ルームのロックを保持したままマップのロックを取得することはありません。
//! 配送は有界キューへの `try_send` なので、ロック内で待機は発生しません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, ConnectionId, DEFAULT_HISTORY_LIMIT, Identity, OutboundSender, Room, RoomClient,
    RoomHandle, RoomName, RoomRegistry,
};

/// インメモリ RoomRegistry 実装
pub struct InMemoryRoomRegistry {
    /// ルーム名 → ルーム
    rooms: Mutex<HashMap<RoomName, RoomHandle>>,
    /// 新規ルームの履歴上限
    history_limit: usize,
}

impl InMemoryRoomRegistry {
    /// 新しい InMemoryRoomRegistry を作成
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// 履歴上限を指定して作成
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            history_limit,
        }
    }
}

impl Default for InMemoryRoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Push, then deliver, reporting evictions. Caller holds the room lock.
fn append_and_deliver(room: &mut Room, message: Arc<ChatMessage>) -> usize {
    room.push_message(Arc::clone(&message));
    deliver(room, &message)
}

fn deliver(room: &mut Room, message: &Arc<ChatMessage>) -> usize {
    let (delivered, failed) = room.deliver(message);
    for (connection_id, e) in failed {
        tracing::warn!(
            room = %room.name(),
            connection = %connection_id,
            "Dropping client after failed delivery: {}",
            e
        );
    }
    delivered
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn get_or_create(&self, room: &RoomName) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room.clone())
            .or_insert_with(|| {
                tracing::info!(room = %room, "Room created");
                Arc::new(Mutex::new(Room::with_history_limit(
                    room.clone(),
                    self.history_limit,
                )))
            })
            .clone()
    }

    async fn find(&self, room: &RoomName) -> Option<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.get(room).cloned()
    }

    async fn join(
        &self,
        room: &RoomName,
        connection_id: ConnectionId,
        identity: Identity,
        outbound: OutboundSender,
    ) -> Vec<Arc<ChatMessage>> {
        let handle = self.get_or_create(room).await;
        let mut room = handle.lock().await;
        room.add_client(connection_id, RoomClient::new(identity, outbound));
        room.history_snapshot()
    }

    async fn leave(&self, room: &RoomName, connection_id: &ConnectionId) -> bool {
        let Some(handle) = self.find(room).await else {
            return false;
        };
        let mut room = handle.lock().await;
        room.remove_client(connection_id).is_some()
    }

    async fn append(&self, room: &RoomName, message: Arc<ChatMessage>) {
        let handle = self.get_or_create(room).await;
        handle.lock().await.push_message(message);
    }

    async fn snapshot_history(&self, room: &RoomName) -> Vec<Arc<ChatMessage>> {
        match self.find(room).await {
            Some(handle) => handle.lock().await.history_snapshot(),
            None => Vec::new(),
        }
    }

    async fn broadcast(&self, room: &RoomName, message: Arc<ChatMessage>) -> usize {
        let Some(handle) = self.find(room).await else {
            return 0;
        };
        let mut room = handle.lock().await;
        deliver(&mut room, &message)
    }

    async fn append_and_broadcast(&self, room: &RoomName, message: Arc<ChatMessage>) -> usize {
        let handle = self.get_or_create(room).await;
        let mut room = handle.lock().await;
        append_and_deliver(&mut room, message)
    }

    async fn append_and_broadcast_existing(
        &self,
        room: &RoomName,
        message: Arc<ChatMessage>,
    ) -> Option<usize> {
        let handle = self.find(room).await?;
        let mut room = handle.lock().await;
        Some(append_and_deliver(&mut room, message))
    }

    async fn room_names(&self) -> Vec<RoomName> {
        let rooms = self.rooms.lock().await;
        let mut names: Vec<RoomName> = rooms.keys().cloned().collect();
        names.sort();
        names
    }

    async fn client_count(&self, room: &RoomName) -> usize {
        match self.find(room).await {
            Some(handle) => handle.lock().await.client_count(),
            None => 0,
        }
    }
}
