use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{Candle, CandleInterval, Result};

/// Abstraction over the market-data provider.
///
/// `TinkoffClient` implements this for live data. Tests use in-memory
/// sources. Implementations report every failure (network, auth, empty
/// result) as `Error::DataUnavailable`.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch candles for `instrument` in `[from, to]`, oldest first.
    async fn fetch(
        &self,
        instrument: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>>;
}

/// Delivers formatted text to a destination (a Telegram chat id).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, destination: i64, text: &str) -> Result<()>;
}

/// Remembers which chats are subscribed to notifications.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Every subscribed destination, in ascending order.
    async fn list(&self) -> Result<Vec<i64>>;
    /// Subscribe `destination`. Returns `false` if it already was.
    async fn add(&self, destination: i64) -> Result<bool>;
    /// Unsubscribe `destination`. Returns `false` if it was not subscribed.
    async fn remove(&self, destination: i64) -> Result<bool>;
}

/// Non-persistent destination store.
#[derive(Debug, Default)]
pub struct MemoryDestinationStore {
    destinations: RwLock<BTreeSet<i64>>,
}

impl MemoryDestinationStore {
    pub fn new(initial: impl IntoIterator<Item = i64>) -> Self {
        Self {
            destinations: RwLock::new(initial.into_iter().collect()),
        }
    }
}

#[async_trait]
impl DestinationStore for MemoryDestinationStore {
    async fn list(&self) -> Result<Vec<i64>> {
        Ok(self.destinations.read().await.iter().copied().collect())
    }

    async fn add(&self, destination: i64) -> Result<bool> {
        Ok(self.destinations.write().await.insert(destination))
    }

    async fn remove(&self, destination: i64) -> Result<bool> {
        Ok(self.destinations.write().await.remove(&destination))
    }
}
