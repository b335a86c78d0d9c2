use sha2::{Digest, Sha256};

use super::schema::Database;
use super::types::{StoreError, User};

/// Generate a fresh 64-character hex API key.
fn generate_api_key() -> String {
    let seed = uuid::Uuid::new_v4();
    let hash = Sha256::digest(seed.as_bytes());
    format!("{:x}", hash)
}

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user with a newly generated API key
    pub async fn create_user(&self, name: &str) -> Result<User, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let api_key = generate_api_key();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (created_at, updated_at, name, api_key)
            VALUES (?, ?, ?, ?)
            RETURNING id, created_at, updated_at, name, api_key
        "#,
        )
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(&api_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, name))?;

        tracing::debug!(user_id = user.id, name = %user.name, "Created user");
        Ok(user)
    }

    /// Look up a user by API key
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when no user holds the key.
    pub async fn get_user_by_api_key(&self, api_key: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name, api_key FROM users WHERE api_key = ?",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("user for API key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[test]
    fn test_generate_api_key_shape() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[tokio::test]
    async fn test_create_user_and_lookup_by_key() {
        let db = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.name, "alice");

        let found = db.get_user_by_api_key(&user.api_key).await.unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_unknown_api_key_is_not_found() {
        let db = test_db().await;
        db.create_user("alice").await.unwrap();

        let err = db.get_user_by_api_key("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_keys() {
        let db = test_db().await;
        let a = db.create_user("bob").await.unwrap();
        let b = db.create_user("bob").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.api_key, b.api_key);
    }
}
