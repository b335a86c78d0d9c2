use super::schema::Database;
use super::types::{NewPost, Post, StoreError};

const POST_COLUMNS: &str =
    "id, created_at, updated_at, feed_id, title, description, published_at, url";

/// Maximum number of posts returned by a single listing query
const MAX_POSTS: i64 = 500;

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post unless its URL is already stored.
    ///
    /// There is no existence pre-check: the `UNIQUE(url)` constraint decides,
    /// so two workers racing on the same URL store it exactly once.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` when the URL already exists. Every other
    /// failure is `StoreError::Database`.
    pub async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (created_at, updated_at, feed_id, title, description, published_at, url) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {POST_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(&post.url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, &post.url))
    }

    /// Get all posts of one feed, newest first
    pub async fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE feed_id = ? \
             ORDER BY published_at DESC, id DESC LIMIT ?"
        ))
        .bind(feed_id)
        .bind(MAX_POSTS)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// Get the newest posts across every feed the user follows
    pub async fn get_posts_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>, StoreError> {
        let limit = limit.clamp(0, MAX_POSTS);
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.created_at, p.updated_at, p.feed_id, p.title, p.description,
                   p.published_at, p.url
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// Count all stored posts
    pub async fn count_posts(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
