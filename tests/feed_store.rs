//! Integration tests for the store as the CLI uses it: users, feeds,
//! follows and the per-user post listing.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use harvest::auth::api_key_from_header;
use harvest::storage::{Database, NewPost, StoreError};
use pretty_assertions::assert_eq;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn post(feed_id: i64, url: &str, published_at: i64) -> NewPost {
    NewPost {
        feed_id,
        title: format!("Title of {url}"),
        description: None,
        published_at,
        url: url.to_string(),
    }
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_resolved_from_authorization_value() {
    let db = test_db().await;
    let user = db.create_user("alice").await.unwrap();

    let header = format!("APIKey {}", user.api_key);
    let key = api_key_from_header(&header).unwrap();
    let found = db.get_user_by_api_key(key).await.unwrap();
    assert_eq!(found, user);
}

#[tokio::test]
async fn test_unknown_api_key_not_found() {
    let db = test_db().await;
    db.create_user("alice").await.unwrap();

    let err = db.get_user_by_api_key("0".repeat(64).as_str()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

// ============================================================================
// Feeds and Follows
// ============================================================================

#[tokio::test]
async fn test_feed_owner_follows_automatically() {
    let db = test_db().await;
    let owner = db.create_user("owner").await.unwrap();
    let feed = db
        .create_feed(owner.id, "Blog", "https://blog.example/rss")
        .await
        .unwrap();

    let follows = db.get_feed_follows_for_user(owner.id).await.unwrap();
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].feed_id, feed.id);
    assert_eq!(feed.last_fetched_at, None);
}

#[tokio::test]
async fn test_duplicate_feed_url_rejected_without_side_effects() {
    let db = test_db().await;
    let owner = db.create_user("owner").await.unwrap();
    let other = db.create_user("other").await.unwrap();
    db.create_feed(owner.id, "Blog", "https://blog.example/rss")
        .await
        .unwrap();

    let err = db
        .create_feed(other.id, "Same blog", "https://blog.example/rss")
        .await
        .unwrap_err();
    assert!(err.is_duplicate());

    // The failed transaction left no follow behind
    assert!(db.get_feed_follows_for_user(other.id).await.unwrap().is_empty());
    assert_eq!(db.get_feeds().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_follow_lifecycle() {
    let db = test_db().await;
    let owner = db.create_user("owner").await.unwrap();
    let reader = db.create_user("reader").await.unwrap();
    let feed = db
        .create_feed(owner.id, "Blog", "https://blog.example/rss")
        .await
        .unwrap();

    db.create_feed_follow(reader.id, feed.id).await.unwrap();
    assert!(db
        .create_feed_follow(reader.id, feed.id)
        .await
        .unwrap_err()
        .is_duplicate());

    db.delete_feed_follow(reader.id, feed.id).await.unwrap();
    assert!(matches!(
        db.delete_feed_follow(reader.id, feed.id).await,
        Err(StoreError::NotFound(_))
    ));

    // The owner's follow is untouched
    assert_eq!(db.get_feed_follows_for_user(owner.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_follow_missing_feed_not_found() {
    let db = test_db().await;
    let reader = db.create_user("reader").await.unwrap();
    assert!(matches!(
        db.create_feed_follow(reader.id, 999).await,
        Err(StoreError::NotFound(_))
    ));
}

// ============================================================================
// Posts
// ============================================================================

#[tokio::test]
async fn test_posts_for_user_only_followed_feeds_newest_first() {
    let db = test_db().await;
    let alice = db.create_user("alice").await.unwrap();
    let bob = db.create_user("bob").await.unwrap();
    let tech = db
        .create_feed(alice.id, "Tech", "https://tech.example/rss")
        .await
        .unwrap();
    let food = db
        .create_feed(bob.id, "Food", "https://food.example/rss")
        .await
        .unwrap();

    db.insert_post(&post(tech.id, "https://tech.example/1", 100))
        .await
        .unwrap();
    db.insert_post(&post(tech.id, "https://tech.example/2", 300))
        .await
        .unwrap();
    db.insert_post(&post(food.id, "https://food.example/1", 200))
        .await
        .unwrap();

    let urls = |posts: Vec<harvest::storage::Post>| -> Vec<String> {
        posts.into_iter().map(|p| p.url).collect()
    };

    assert_eq!(
        urls(db.get_posts_for_user(alice.id, 10).await.unwrap()),
        vec!["https://tech.example/2", "https://tech.example/1"]
    );

    db.create_feed_follow(alice.id, food.id).await.unwrap();
    assert_eq!(
        urls(db.get_posts_for_user(alice.id, 2).await.unwrap()),
        vec!["https://tech.example/2", "https://food.example/1"]
    );

    db.delete_feed_follow(alice.id, tech.id).await.unwrap();
    assert_eq!(
        urls(db.get_posts_for_user(alice.id, 10).await.unwrap()),
        vec!["https://food.example/1"]
    );
}

#[tokio::test]
async fn test_concurrent_inserts_of_same_url_store_one() {
    let db = test_db().await;
    let owner = db.create_user("owner").await.unwrap();
    let feed = db
        .create_feed(owner.id, "Blog", "https://blog.example/rss")
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let db = db.clone();
        let new_post = post(feed.id, "https://blog.example/race", 1);
        tasks.spawn(async move { db.insert_post(&new_post).await });
    }

    let mut stored = 0;
    let mut duplicates = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => stored += 1,
            Err(e) if e.is_duplicate() => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((stored, duplicates), (1, 7));
    assert_eq!(db.count_posts().await.unwrap(), 1);
}
