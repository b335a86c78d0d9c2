//! SQLite persistence for users, feeds, follows and posts.
//!
//! [`Database`] owns the connection pool and exposes the CRUD operations used
//! by the CLI. The subset the scheduler needs is abstracted behind the
//! [`FeedStore`] trait.

mod feeds;
mod follows;
mod posts;
mod schema;
mod store;
mod types;
mod users;

pub use schema::Database;
pub use store::FeedStore;
pub use types::{Feed, FeedFollow, NewPost, Post, StoreError, User};
