//! Small helpers shared by the CLI.
//!
//! - **Feed URL validation**: refuse URLs that would let a stored feed reach
//!   local or private network addresses

mod url_validator;

pub use url_validator::{validate_feed_url, FeedUrlError};
