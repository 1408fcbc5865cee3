// jobsieve Infrastructure - HTTP Source Adapters
// Implements: SourceAdapter (generic JSON search API)

mod json_feed;

pub use json_feed::{convert, extract_listings, DetailRequest, JsonFeedConfig, JsonFeedSource};
