use crate::feed::{DocumentFetcher, RssItem};
use crate::storage::{Feed, FeedStore, NewPost};

/// Per-item counts from one scrape of one feed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ItemTally {
    /// Items present in the fetched document
    pub seen: usize,
    /// Posts newly stored
    pub inserted: usize,
    /// Items whose URL was already stored
    pub duplicates: usize,
    /// Items skipped because the publish date did not parse
    pub bad_dates: usize,
    /// Items skipped because the insert failed for another reason
    pub failed: usize,
}

/// How a single scrape ended. Informational only: the scheduler never acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The feed could not be stamped as fetched; nothing was requested
    MarkFailed,
    /// Stamped, but the document could not be fetched or parsed
    FetchFailed,
    /// Document processed item by item
    Completed(ItemTally),
}

/// Scrape one feed: stamp it, fetch its document, store every new item.
///
/// The feed is stamped before the network call, so a feed that keeps failing
/// still moves to the back of the queue. Failures are logged and contained:
/// a bad item skips that item, a failed fetch skips the feed, and nothing is
/// returned to the caller as an error.
pub async fn scrape_feed(
    store: &dyn FeedStore,
    fetcher: &dyn DocumentFetcher,
    feed: &Feed,
) -> ScrapeOutcome {
    if let Err(e) = store.mark_fetched(feed.id).await {
        tracing::error!(feed_id = feed.id, feed = %feed.name, error = %e, "Failed to mark feed as fetched");
        return ScrapeOutcome::MarkFailed;
    }

    let document = match fetcher.fetch_document(&feed.url).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(feed_id = feed.id, url = %feed.url, error = %e, "Failed to fetch feed");
            return ScrapeOutcome::FetchFailed;
        }
    };

    let items = &document.channel.items;
    let mut tally = ItemTally {
        seen: items.len(),
        ..ItemTally::default()
    };

    for item in items {
        let post = match build_post(feed.id, item) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(
                    feed_id = feed.id,
                    pub_date = %item.pub_date,
                    error = %e,
                    "Skipping item with unparsable publish date"
                );
                tally.bad_dates += 1;
                continue;
            }
        };

        match store.insert_post(&post).await {
            Ok(_) => tally.inserted += 1,
            Err(e) if e.is_duplicate() => {
                tracing::trace!(feed_id = feed.id, url = %post.url, "Post already stored");
                tally.duplicates += 1;
            }
            Err(e) => {
                tracing::error!(feed_id = feed.id, url = %post.url, error = %e, "Failed to store post");
                tally.failed += 1;
            }
        }
    }

    tracing::info!(feed = %feed.name, posts = tally.seen, "Feed collected");
    tracing::debug!(
        feed_id = feed.id,
        inserted = tally.inserted,
        duplicates = tally.duplicates,
        bad_dates = tally.bad_dates,
        failed = tally.failed,
        "Scrape tally"
    );

    ScrapeOutcome::Completed(tally)
}

/// Turn a document item into an insertable post.
fn build_post(feed_id: i64, item: &RssItem) -> Result<NewPost, chrono::ParseError> {
    Ok(NewPost {
        feed_id,
        title: item.title.clone(),
        description: item.description().map(str::to_owned),
        published_at: item.published_at()?,
        url: item.link.clone(),
    })
}
