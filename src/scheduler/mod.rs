//! Periodic, bounded-concurrency scraping.
//!
//! The [`Scheduler`] wakes on a fixed interval, asks the store for the
//! stalest feeds (at most `concurrency` of them) and runs [`scrape_feed`] for
//! each one on its own task. A round ends only when every worker has
//! finished, so the next selection always sees the previous round's
//! `last_fetched_at` stamps.

mod runner;
mod worker;

pub use runner::{Scheduler, SchedulerConfig};
pub use worker::{scrape_feed, ItemTally, ScrapeOutcome};
