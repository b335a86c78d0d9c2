use async_trait::async_trait;

use super::schema::Database;
use super::types::{Feed, NewPost, Post, StoreError};

/// The storage operations the scrape scheduler depends on.
///
/// Implemented by [`Database`]; tests substitute in-memory fakes.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Up to `limit` feeds, never-fetched first, then oldest `last_fetched_at`.
    async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, StoreError>;

    /// Stamp the feed as fetched now; returns the stored timestamp.
    async fn mark_fetched(&self, feed_id: i64) -> Result<i64, StoreError>;

    /// Insert a post, failing with [`StoreError::Duplicate`] if its URL exists.
    async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError>;
}

#[async_trait]
impl FeedStore for Database {
    async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, StoreError> {
        Database::select_due_feeds(self, limit).await
    }

    async fn mark_fetched(&self, feed_id: i64) -> Result<i64, StoreError> {
        self.mark_feed_fetched(feed_id).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        Database::insert_post(self, post).await
    }
}
