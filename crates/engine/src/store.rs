use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use common::{DestinationStore, Result};

/// Persists subscribed chats in SQLite so a restart keeps delivering to
/// them. Expects the `destinations` table from `migrations/`.
pub struct SqliteDestinationStore {
    db: SqlitePool,
}

impl SqliteDestinationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DestinationStore for SqliteDestinationStore {
    async fn list(&self) -> Result<Vec<i64>> {
        let chat_ids =
            sqlx::query_scalar::<_, i64>("SELECT chat_id FROM destinations ORDER BY chat_id")
                .fetch_all(&self.db)
                .await?;
        Ok(chat_ids)
    }

    async fn add(&self, destination: i64) -> Result<bool> {
        let subscribed_at = Utc::now().to_rfc3339();
        let added = sqlx::query(
            "INSERT OR IGNORE INTO destinations (chat_id, subscribed_at) VALUES (?1, ?2)",
        )
        .bind(destination)
        .bind(subscribed_at)
        .execute(&self.db)
        .await?
        .rows_affected()
            > 0;

        if added {
            info!(destination, "Notification destination subscribed");
        }
        Ok(added)
    }

    async fn remove(&self, destination: i64) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM destinations WHERE chat_id = ?1")
            .bind(destination)
            .execute(&self.db)
            .await?
            .rows_affected()
            > 0;

        if removed {
            info!(destination, "Notification destination unsubscribed");
        }
        Ok(removed)
    }
}
