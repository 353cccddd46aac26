//! RoomRegistry trait 定義
//!
//! ルームとその接続クライアント・メッセージ履歴へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 並行性の要件
//!
//! - ルームの作成とクライアントの追加・削除は直列化される
//! - 同じルームへの append と broadcast はルームのロック内でまとめて行う
//! - 履歴のスナップショットは途中状態を観測しない

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ChatMessage, ConnectionId, Identity, OutboundSender, Room, RoomName};

/// Shared handle to one room.
pub type RoomHandle = Arc<Mutex<Room>>;

/// Room Registry trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// 既存のルームを返すか、なければ作成する（失敗しない）
    async fn get_or_create(&self, room: &RoomName) -> RoomHandle;

    /// 既存のルームのみを返す
    async fn find(&self, room: &RoomName) -> Option<RoomHandle>;

    /// クライアントを登録し、登録時点の履歴スナップショットを返す
    ///
    /// 登録とスナップショットは同じロック内で行われるため、以降のメッセージは
    /// すべて `outbound` に届き、それ以前のものはすべてスナップショットに含まれる。
    async fn join(
        &self,
        room: &RoomName,
        connection_id: ConnectionId,
        identity: Identity,
        outbound: OutboundSender,
    ) -> Vec<Arc<ChatMessage>>;

    /// クライアントを削除（冪等）。削除した場合は `true`
    async fn leave(&self, room: &RoomName, connection_id: &ConnectionId) -> bool;

    /// 履歴に追加（上限を超えたら古いものから削除）
    async fn append(&self, room: &RoomName, message: Arc<ChatMessage>);

    /// 履歴を追加順で取得
    async fn snapshot_history(&self, room: &RoomName) -> Vec<Arc<ChatMessage>>;

    /// 現在のクライアント全員に配送し、配送できた数を返す
    async fn broadcast(&self, room: &RoomName, message: Arc<ChatMessage>) -> usize;

    /// append と broadcast を同じロック内で行う（ルームがなければ作成）
    async fn append_and_broadcast(&self, room: &RoomName, message: Arc<ChatMessage>) -> usize;

    /// ルームが存在する場合のみ append と broadcast を行う
    ///
    /// ルームが存在しない場合は `None`
    async fn append_and_broadcast_existing(
        &self,
        room: &RoomName,
        message: Arc<ChatMessage>,
    ) -> Option<usize>;

    /// 既知のルーム名一覧（名前順）
    async fn room_names(&self) -> Vec<RoomName>;

    /// ルームの接続クライアント数（ルームがなければ 0）
    async fn client_count(&self, room: &RoomName) -> usize;
}
