//! UseCase: 株価ボット
//!
//! トリガーチャネルの `room|ticker` を受け取り、株価を取得して
//! `"<TICKER> quote is $<price> per share"` をボット受信チャネルへ発行します。
//! 取得に失敗した場合はログに残すだけで、ルームには何も届きません。

use std::sync::Arc;

use futures_util::StreamExt;

use crate::domain::{
    BusChannel, BusError, BusRecord, DecodeError, MessageBus, QuoteError, QuoteFetcher, RoomName,
};

use super::relay::RelayPublisher;

/// トリガー 1 件の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Published { room: RoomName, text: String },
    Malformed(DecodeError),
    QuoteFailed(QuoteError),
    PublishFailed(BusError),
}

pub struct BotWorker {
    quote_fetcher: Arc<dyn QuoteFetcher>,
    bus: Arc<dyn MessageBus>,
    publisher: RelayPublisher,
}

impl BotWorker {
    pub fn new(
        quote_fetcher: Arc<dyn QuoteFetcher>,
        bus: Arc<dyn MessageBus>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            quote_fetcher,
            publisher: RelayPublisher::new(bus.clone(), origin),
            bus,
        }
    }

    /// トリガーチャネルを購読し続ける
    pub async fn run(&self) -> Result<(), BusError> {
        let mut triggers = self.bus.subscribe(BusChannel::StockTrigger).await?;
        tracing::info!("Bot worker waiting for stock triggers");

        while let Some(record) = triggers.next().await {
            match self.handle_trigger(&record?).await {
                TriggerOutcome::Published { room, text } => {
                    tracing::info!(room = %room, "{}", text);
                }
                TriggerOutcome::Malformed(e) => {
                    tracing::warn!("Dropping stock trigger: {}", e);
                }
                TriggerOutcome::QuoteFailed(e) => {
                    tracing::warn!("Stock quote lookup failed: {}", e);
                }
                TriggerOutcome::PublishFailed(e) => {
                    tracing::warn!("Failed to publish stock quote: {}", e);
                }
            }
        }

        Err(BusError::SubscriptionClosed(BusChannel::StockTrigger))
    }

    pub async fn handle_trigger(&self, record: &BusRecord) -> TriggerOutcome {
        let (room, ticker) = match record.decode() {
            Ok((room, ticker)) => (room, ticker.trim()),
            Err(e) => return TriggerOutcome::Malformed(e),
        };
        if ticker.is_empty() {
            return TriggerOutcome::Malformed(DecodeError::EmptyTicker);
        }

        let price = match self.quote_fetcher.fetch(ticker).await {
            Ok(price) => price,
            Err(e) => return TriggerOutcome::QuoteFailed(e),
        };

        let text = format_quote(ticker, &price);
        match self
            .publisher
            .publish(BusChannel::BotInbound, &room, &text)
            .await
        {
            Ok(()) => TriggerOutcome::Published { room, text },
            Err(e) => TriggerOutcome::PublishFailed(e),
        }
    }
}

pub fn format_quote(ticker: &str, price: &str) -> String {
    format!("{} quote is ${} per share", ticker.to_uppercase(), price)
}
