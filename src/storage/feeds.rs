use super::schema::Database;
use super::types::{Feed, StoreError};

const FEED_COLUMNS: &str = "id, created_at, updated_at, name, url, user_id, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Create a feed owned by `user_id` and follow it on the owner's behalf.
    ///
    /// Both rows are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if a feed with this URL already exists.
    pub async fn create_feed(&self, user_id: i64, name: &str, url: &str) -> Result<Feed, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let feed = sqlx::query_as::<_, Feed>(&format!(
            "INSERT INTO feeds (created_at, updated_at, name, url, user_id) \
             VALUES (?, ?, ?, ?, ?) RETURNING {FEED_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::from_write(e, url))?;

        sqlx::query(
            "INSERT INTO feed_follows (created_at, updated_at, user_id, feed_id) VALUES (?, ?, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .bind(user_id)
        .bind(feed.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(feed_id = feed.id, name = %feed.name, url = %feed.url, "Created feed");
        Ok(feed)
    }

    /// Get all feeds, oldest first
    pub async fn get_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Get a single feed by id
    pub async fn get_feed(&self, feed_id: i64) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, Feed>(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?"))
            .bind(feed_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("feed {feed_id}")))
    }

    /// Select up to `limit` feeds, stalest first.
    ///
    /// Never-fetched feeds (NULL `last_fetched_at`) come before every fetched
    /// feed; ties are broken by id so the order is deterministic.
    pub async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             ORDER BY last_fetched_at ASC NULLS FIRST, id ASC \
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Set `last_fetched_at` to now and return the new timestamp
    pub async fn mark_feed_fetched(&self, feed_id: i64) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ? \
             RETURNING last_fetched_at",
        )
        .bind(now)
        .bind(now)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(ts,)| ts)
            .ok_or_else(|| StoreError::NotFound(format!("feed {feed_id}")))
    }
}
