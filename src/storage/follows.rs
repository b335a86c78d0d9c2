use super::schema::Database;
use super::types::{FeedFollow, StoreError};

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Follow a feed
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the user already follows the feed and
    /// `StoreError::NotFound` if the feed does not exist.
    pub async fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow, StoreError> {
        // Surface a missing feed as NotFound rather than a foreign-key failure
        self.get_feed(feed_id).await?;

        let now = chrono::Utc::now().timestamp();
        let follow = sqlx::query_as::<_, FeedFollow>(
            r#"
            INSERT INTO feed_follows (created_at, updated_at, user_id, feed_id)
            VALUES (?, ?, ?, ?)
            RETURNING id, created_at, updated_at, user_id, feed_id
        "#,
        )
        .bind(now)
        .bind(now)
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, &format!("follow of feed {feed_id}")))?;

        Ok(follow)
    }

    /// Get every follow held by a user
    pub async fn get_feed_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>, StoreError> {
        let follows = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT id, created_at, updated_at, user_id, feed_id
            FROM feed_follows
            WHERE user_id = ?
            ORDER BY created_at, id
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Unfollow a feed
    pub async fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("follow of feed {feed_id}")));
        }
        Ok(())
    }
}
