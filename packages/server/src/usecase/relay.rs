//! UseCase: バスとルームの中継
//!
//! - `RelayPublisher`: セッションとボットがバスへレコードを送る経路
//! - `BusRelay`: チャット中継チャネルとボット受信チャネルを購読し、
//!   受け取ったレコードをローカルのルームへ追加・配送する
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - BusRelay::handle_record() / consume()
//! - RelayPublisher::publish() / mirror()
//!
//! ### なぜこのテストが必要か
//! - 不正なレコードで購読ループが止まらないことを保証
//! - 中継元の作者がそのまま引き継がれることを確認
//! - 自インスタンスが発行したレコードを二重配送しないことを確認
//! - 同じバス上の全インスタンスへチャットが届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ピアからのチャット、ボットからの株価、3 インスタンス構成
//! - 異常系：区切り文字の無いレコード、作者の無い中継レコード
//! - エッジケース：ローカルに存在しないルーム宛てのレコード

use std::sync::Arc;

use chatrelay_shared::time::Clock;
use futures_util::StreamExt;

use crate::domain::{
    BusChannel, BusError, BusRecord, ChatMessage, DecodeError, Identity, MessageBus, RoomName,
    RoomRegistry, SYSTEM_IDENTITY,
};

/// バスへの発行経路
///
/// 発行は呼び出しごとに独立しており、失敗は呼び出し元へ返すだけで再送しない。
pub struct RelayPublisher {
    bus: Arc<dyn MessageBus>,
    /// このインスタンスの識別子（レコードの発行元として付与する）
    origin: String,
}

impl RelayPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, origin: impl Into<String>) -> Self {
        Self {
            bus,
            origin: origin.into(),
        }
    }

    /// `room|text` を指定チャネルへ発行
    pub async fn publish(
        &self,
        channel: BusChannel,
        room: &RoomName,
        text: &str,
    ) -> Result<(), BusError> {
        let record = BusRecord::encode(room, text).with_origin(self.origin.clone());
        self.bus.publish(channel, record).await
    }

    /// ローカルで受け付けたチャットを他インスタンスへ中継
    pub async fn mirror(&self, message: &ChatMessage) -> Result<(), BusError> {
        let record = BusRecord::encode(&message.room_name, &message.text)
            .with_author(message.user.as_str())
            .with_origin(self.origin.clone());
        self.bus.publish(BusChannel::ChatRelay, record).await
    }
}

/// 1 レコードの処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// ルームに追加し、この数のクライアントへ配送した
    Delivered(usize),
    /// 自インスタンスが発行した中継レコード
    SkippedOwnOrigin,
    /// ルームがローカルに存在しない
    RoomNotFound(RoomName),
    /// デコードできないレコード
    Malformed(DecodeError),
}

/// バス購読ループ
pub struct BusRelay {
    registry: Arc<dyn RoomRegistry>,
    bus: Arc<dyn MessageBus>,
    origin: String,
    clock: Arc<dyn Clock>,
}

impl BusRelay {
    /// 購読するチャネル
    pub const CHANNELS: [BusChannel; 2] = [BusChannel::ChatRelay, BusChannel::BotInbound];

    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        bus: Arc<dyn MessageBus>,
        origin: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            bus,
            origin: origin.into(),
            clock,
        }
    }

    /// チャネルを購読し続ける
    ///
    /// 不正なレコードはログに残して破棄する。購読そのものが失敗した場合、
    /// または購読が終了した場合のみエラーを返す。
    pub async fn consume(&self, channel: BusChannel) -> Result<(), BusError> {
        let mut records = self.bus.subscribe(channel).await?;
        tracing::info!(queue = channel.queue_name(), "Relay loop started");

        while let Some(record) = records.next().await {
            let record = record?;
            match self.handle_record(channel, &record).await {
                RelayOutcome::Delivered(count) => {
                    tracing::debug!(
                        queue = channel.queue_name(),
                        "Relayed '{}' to {} clients",
                        record.body,
                        count
                    );
                }
                RelayOutcome::SkippedOwnOrigin => {}
                RelayOutcome::RoomNotFound(room) => {
                    tracing::debug!(
                        queue = channel.queue_name(),
                        "Dropping record for unknown room '{}'",
                        room
                    );
                }
                RelayOutcome::Malformed(e) => {
                    tracing::warn!(queue = channel.queue_name(), "Dropping record: {}", e);
                }
            }
        }

        Err(BusError::SubscriptionClosed(channel))
    }

    /// 1 レコードをデコードしてルームへ追加・配送する
    pub async fn handle_record(&self, channel: BusChannel, record: &BusRecord) -> RelayOutcome {
        if channel == BusChannel::ChatRelay && record.origin.as_deref() == Some(self.origin.as_str())
        {
            return RelayOutcome::SkippedOwnOrigin;
        }

        let message = match self.decode(channel, record) {
            Ok(message) => Arc::new(message),
            Err(e) => return RelayOutcome::Malformed(e),
        };

        let room = message.room_name.clone();
        match self
            .registry
            .append_and_broadcast_existing(&room, message)
            .await
        {
            Some(count) => RelayOutcome::Delivered(count),
            None => RelayOutcome::RoomNotFound(room),
        }
    }

    fn decode(&self, channel: BusChannel, record: &BusRecord) -> Result<ChatMessage, DecodeError> {
        let (room, text) = record.decode()?;
        let author = match channel {
            BusChannel::ChatRelay => record
                .author
                .as_deref()
                .and_then(|author| Identity::new(author.to_string()).ok())
                .ok_or(DecodeError::MissingAuthor)?,
            BusChannel::BotInbound => Identity::new(SYSTEM_IDENTITY.to_string())?,
            BusChannel::StockTrigger => return Err(DecodeError::UnexpectedChannel(channel)),
        };
        Ok(ChatMessage::new(
            author,
            text.to_string(),
            self.clock.now(),
            room,
        ))
    }
}
