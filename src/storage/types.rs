use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the feed store.
///
/// `Duplicate` is the only variant the scrape worker treats as expected: it is
/// how the store reports that a post URL already exists.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the row (post URL, feed URL, follow pair)
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// Another process holds the database lock
    #[error("Another instance of harvest appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A row addressed by id or key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify an open/connect error, mapping lock conditions to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StoreError::InstanceLocked;
        }

        StoreError::Database(err)
    }

    /// Classify a write error, mapping unique-constraint violations to `Duplicate`.
    ///
    /// Classification goes through the driver's error kind, never the message text.
    pub(crate) fn from_write(err: sqlx::Error, key: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(key.to_string())
            }
            _ => StoreError::Database(err),
        }
    }

    /// True when the error is the expected "row already present" outcome.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// An account that owns feeds and follows them.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub api_key: String,
}

/// A subscribed feed.
///
/// `last_fetched_at` is `None` until the scheduler first picks the feed up.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub last_fetched_at: Option<i64>,
}

/// A user's subscription to a feed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_id: i64,
    pub feed_id: i64,
}

/// A stored post. Posts are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub feed_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub url: String,
}

/// A post record built by the scrape worker and submitted for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub url: String,
}
