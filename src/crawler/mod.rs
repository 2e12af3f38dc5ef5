//! Listing crawl: page retrieval, row extraction and stopping rules.

pub mod date;
pub mod extractor;
pub mod fetcher;
pub mod pagination;

pub use extractor::{extract, parse_listing, ListingPage};
pub use fetcher::{FetchError, HttpListingSource, ListingSource};
pub use pagination::{crawl, CrawlOptions, CrawlOutcome, CrawlState, RowDecision, StopReason};
