//! UseCase: 参加者接続処理
//!
//! 接続受付（トークン検証とルーム名の解決）と、ルームへの参加を分けて提供します。
//! 受付はルームの状態に一切触れないため、認証に失敗した接続がルームに
//! 痕跡を残すことはありません。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::admit() / join()
//!
//! ### なぜこのテストが必要か
//! - 無効なトークンでの接続がルームに参加しないことを保証
//! - ルーム名省略時のフォールバックを確認
//! - 参加時に履歴が追加順で返ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの参加、履歴の再生
//! - 異常系：トークン無し、無効なトークン、不正なルーム名
//! - エッジケース：ルーム名が空文字列

use std::sync::Arc;

use crate::domain::{
    ChatMessage, ConnectionId, Identity, OutboundSender, RoomName, RoomRegistry, TokenGate,
};

use super::error::ConnectError;

/// 受付済みの接続（まだルームには参加していない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: Identity,
    pub room: RoomName,
}

/// ルーム参加の結果
#[derive(Debug)]
pub struct Joined {
    pub connection_id: ConnectionId,
    /// 参加時点の履歴（古い順）
    pub history: Vec<Arc<ChatMessage>>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    registry: Arc<dyn RoomRegistry>,
    token_gate: Arc<dyn TokenGate>,
    /// ルーム名が指定されなかった場合のルーム
    default_room: RoomName,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        token_gate: Arc<dyn TokenGate>,
        default_room: RoomName,
    ) -> Self {
        Self {
            registry,
            token_gate,
            default_room,
        }
    }

    /// 接続を受け付ける
    ///
    /// # Arguments
    ///
    /// * `token` - bearer トークン（無ければ `None`）
    /// * `room` - 要求されたルーム名（無い、または空ならデフォルトのルーム）
    pub fn admit(
        &self,
        token: Option<&str>,
        room: Option<&str>,
    ) -> Result<Admission, ConnectError> {
        let identity = self.token_gate.validate(token.unwrap_or_default())?;

        let room = match room.filter(|r| !r.is_empty()) {
            Some(name) => RoomName::new(name.to_string())?,
            None => self.default_room.clone(),
        };

        Ok(Admission { identity, room })
    }

    /// 受付済みの接続をルームに参加させ、履歴スナップショットを返す
    pub async fn join(&self, admission: &Admission, outbound: OutboundSender) -> Joined {
        let connection_id = ConnectionId::generate();
        let history = self
            .registry
            .join(
                &admission.room,
                connection_id,
                admission.identity.clone(),
                outbound,
            )
            .await;

        tracing::info!(
            room = %admission.room,
            connection = %connection_id,
            "'{}' joined ({} messages to replay)",
            admission.identity,
            history.len()
        );

        Joined {
            connection_id,
            history,
        }
    }
}
