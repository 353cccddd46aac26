//! UseCase: メッセージ送信処理
//!
//! クライアントから受け取ったテキストを 1 回だけ分類し、
//! ルームへの追加・配送と、バスへの発行を行います。
//!
//! - テキストは常にそのままチャットとしてルームへ配送する
//! - `/stock=<ticker>` の場合は、ボット向けのトリガーも発行する
//! - 他インスタンス向けに、チャット中継チャネルへも発行する
//!
//! バスへの発行は別タスクで行い、配送を待たせない。発行の失敗はログに残すだけ。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - コマンドでもチャットとして配送されることを保証
//! - トリガーが正しいルームとティッカーで発行されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：通常のチャット、株価コマンド
//! - エッジケース：ティッカーが空白のみのコマンド

use std::sync::Arc;

use chatrelay_shared::time::Clock;

use crate::domain::{BusChannel, ChatCommand, ChatMessage, Identity, RoomName, RoomRegistry};

use super::relay::RelayPublisher;

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// 配送できたクライアント数
    pub delivered: usize,
    pub command: ChatCommand,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    registry: Arc<dyn RoomRegistry>,
    publisher: Arc<RelayPublisher>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        publisher: Arc<RelayPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            publisher,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `identity` - 送信者
    /// * `room` - 送信先のルーム
    /// * `text` - 受け取ったテキスト（加工しない）
    pub async fn execute(&self, identity: &Identity, room: &RoomName, text: String) -> SendOutcome {
        let message = Arc::new(ChatMessage::new(
            identity.clone(),
            text,
            self.clock.now(),
            room.clone(),
        ));
        let command = ChatCommand::classify(&message.text);

        if let ChatCommand::StockQuote { ticker } = &command {
            self.spawn_stock_trigger(room.clone(), ticker.clone());
        }

        let delivered = self
            .registry
            .append_and_broadcast(room, Arc::clone(&message))
            .await;
        tracing::debug!(room = %room, "'{}' sent to {} clients", identity, delivered);

        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            if let Err(e) = publisher.mirror(&message).await {
                tracing::warn!("Failed to relay message: {}", e);
            }
        });

        SendOutcome { delivered, command }
    }

    fn spawn_stock_trigger(&self, room: RoomName, ticker: String) {
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            match publisher
                .publish(BusChannel::StockTrigger, &room, &ticker)
                .await
            {
                Ok(()) => tracing::info!(room = %room, "Stock quote requested for '{}'", ticker),
                Err(e) => tracing::warn!("Failed to request stock quote: {}", e),
            }
        });
    }
}
