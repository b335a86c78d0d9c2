//! harvest: a periodic RSS scraper.
//!
//! Feeds registered by users are fetched on a fixed interval, at most
//! `concurrency` at a time, stalest first. New items become posts; items whose
//! URL is already stored are skipped.
//!
//! - [`storage`] - SQLite store for users, feeds, follows and posts
//! - [`feed`] - HTTP retrieval and RSS 2.0 parsing
//! - [`scheduler`] - the round loop and the per-feed worker
//! - [`config`] - TOML configuration
//! - [`auth`] - API key extraction for the CLI
//! - [`util`] - feed URL validation

pub mod auth;
pub mod config;
pub mod feed;
pub mod scheduler;
pub mod storage;
pub mod util;
