//! Feed document retrieval and parsing.
//!
//! - [`parser`] - RSS 2.0 deserialization via `quick-xml` and the fixed
//!   publish-date layout
//! - [`fetcher`] - single-shot HTTP retrieval behind the [`DocumentFetcher`]
//!   trait
//!
//! # Example
//!
//! ```ignore
//! use harvest::feed::{DocumentFetcher, HttpFetcher, DEFAULT_MAX_FEED_BYTES};
//!
//! let fetcher = HttpFetcher::build("harvest/0.1", None, DEFAULT_MAX_FEED_BYTES)?;
//! let doc = fetcher.fetch_document("https://example.com/rss").await?;
//! for item in &doc.channel.items {
//!     println!("{} {}", item.title, item.link);
//! }
//! ```

mod fetcher;
mod parser;

pub use fetcher::{DocumentFetcher, FetchError, HttpFetcher, DEFAULT_MAX_FEED_BYTES};
pub use parser::{
    parse_document, parse_pub_date, RssChannel, RssDocument, RssItem, PUB_DATE_FORMAT,
};
