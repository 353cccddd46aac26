//! In-process MessageBus.
//!
//! Work-queue channels keep one unbounded queue whose receiving end is shared
//! by all subscribers, so each record is taken by exactly one of them, the
//! same way competing consumers share a broker queue. The fanout channel
//! gives every subscriber its own queue and copies each record into all of
//! them.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{Mutex, mpsc};

use crate::domain::{BusChannel, BusError, BusRecord, BusSubscription, MessageBus};

type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<BusRecord>>>;

enum Route {
    /// Competing consumers on one queue
    Shared {
        tx: mpsc::UnboundedSender<BusRecord>,
        rx: SharedReceiver,
    },
    /// One queue per subscriber
    Fanout(Mutex<Vec<mpsc::UnboundedSender<BusRecord>>>),
}

pub struct InMemoryBus {
    routes: HashMap<BusChannel, Route>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        let routes = [
            BusChannel::ChatRelay,
            BusChannel::BotInbound,
            BusChannel::StockTrigger,
        ]
        .into_iter()
        .map(|channel| {
            let route = if channel.is_fanout() {
                Route::Fanout(Mutex::new(Vec::new()))
            } else {
                let (tx, rx) = mpsc::unbounded_channel();
                Route::Shared {
                    tx,
                    rx: Arc::new(Mutex::new(rx)),
                }
            };
            (channel, route)
        })
        .collect();

        Self { routes }
    }

    fn route(&self, channel: BusChannel) -> Result<&Route, BusError> {
        self.routes.get(&channel).ok_or_else(|| BusError::Declare {
            channel,
            reason: "unknown channel".to_string(),
        })
    }

    /// Number of open subscriptions on `channel`.
    pub async fn subscriber_count(&self, channel: BusChannel) -> usize {
        match self.routes.get(&channel) {
            Some(Route::Shared { rx, .. }) => Arc::strong_count(rx) - 1,
            Some(Route::Fanout(subscribers)) => subscribers
                .lock()
                .await
                .iter()
                .filter(|tx| !tx.is_closed())
                .count(),
            None => 0,
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, channel: BusChannel, record: BusRecord) -> Result<(), BusError> {
        tracing::debug!(queue = channel.queue_name(), "Publishing: {}", record.body);
        match self.route(channel)? {
            Route::Shared { tx, .. } => tx.send(record).map_err(|e| BusError::Publish {
                channel,
                reason: e.to_string(),
            }),
            Route::Fanout(subscribers) => {
                // Dropped subscriptions are pruned here
                subscribers
                    .lock()
                    .await
                    .retain(|tx| tx.send(record.clone()).is_ok());
                Ok(())
            }
        }
    }

    async fn subscribe(&self, channel: BusChannel) -> Result<BusSubscription, BusError> {
        match self.route(channel)? {
            Route::Shared { rx, .. } => {
                let rx = Arc::clone(rx);
                let records = stream::unfold(rx, |rx| async move {
                    let record = rx.lock().await.recv().await?;
                    Some((Ok(record), rx))
                });
                Ok(Box::pin(records))
            }
            Route::Fanout(subscribers) => {
                let (tx, rx) = mpsc::unbounded_channel();
                subscribers.lock().await.push(tx);
                let records = stream::unfold(rx, |mut rx| async move {
                    let record = rx.recv().await?;
                    Some((Ok(record), rx))
                });
                Ok(Box::pin(records))
            }
        }
    }
}
