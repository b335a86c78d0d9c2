use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::worker::scrape_feed;
use crate::feed::DocumentFetcher;
use crate::storage::FeedStore;

/// Tuning for the scrape loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum feeds scraped per round, and so the maximum concurrent workers
    pub concurrency: usize,
    /// Time between round starts
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            interval: Duration::from_secs(60),
        }
    }
}

/// Periodic scraper: every tick, scrape the stalest feeds in parallel and
/// wait for all of them before the next tick may select again.
pub struct Scheduler {
    store: Arc<dyn FeedStore>,
    fetcher: Arc<dyn DocumentFetcher>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn FeedStore>,
        fetcher: Arc<dyn DocumentFetcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run rounds forever. The first round starts immediately.
    ///
    /// A round that outlasts the interval delays the next one; rounds never
    /// overlap and ticks are never dropped.
    pub async fn run(&self) {
        tracing::info!(
            concurrency = self.config.concurrency,
            interval_secs = self.config.interval.as_secs_f64(),
            "Scraping started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_round().await;
        }
    }

    /// Run one round and return how many feeds it scraped.
    ///
    /// Returns only after every worker of the round has finished. A failed
    /// batch selection is logged and the round is skipped.
    pub async fn run_round(&self) -> usize {
        let limit = self.config.concurrency;
        let mut feeds = match self.store.select_due_feeds(limit).await {
            Ok(feeds) => feeds,
            Err(e) => {
                tracing::error!(error = %e, "Failed to select feeds to fetch");
                return 0;
            }
        };

        if feeds.is_empty() {
            tracing::debug!("No feeds due");
            return 0;
        }

        if feeds.len() > limit {
            tracing::warn!(
                selected = feeds.len(),
                limit = limit,
                "Store returned more feeds than requested, truncating batch"
            );
            feeds.truncate(limit);
        }

        let dispatched = feeds.len();
        let mut workers = JoinSet::new();
        for feed in feeds {
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            workers.spawn(async move {
                let outcome = scrape_feed(store.as_ref(), fetcher.as_ref(), &feed).await;
                (feed.id, outcome)
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((feed_id, outcome)) => {
                    tracing::trace!(feed_id = feed_id, outcome = ?outcome, "Worker finished");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scrape worker panicked");
                }
            }
        }

        tracing::debug!(feeds = dispatched, "Round complete");
        dispatched
    }
}
