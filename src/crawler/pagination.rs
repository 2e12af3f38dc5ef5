//! Page-by-page crawl of a gallery listing with its stopping rules.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use url::Url;

use crate::archive::PostRecord;
use crate::config::Config;
use crate::crawler::extractor::parse_listing;
use crate::crawler::fetcher::ListingSource;

/// Why a crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page could not be fetched; earlier pages are kept.
    FetchFailed { page: u32, error: String },
    /// A page had no listing rows at all.
    EmptyPage { page: u32 },
    /// Too many already-archived posts in a row.
    DuplicateRun { page: u32, post_id: String },
    /// A new post older than the trailing window.
    CutoffReached {
        page: u32,
        post_id: String,
        datetime: NaiveDateTime,
    },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed { page, error } => write!(f, "page {page} failed to load: {error}"),
            Self::EmptyPage { page } => write!(f, "page {page} has no rows"),
            Self::DuplicateRun { page, post_id } => {
                write!(f, "consecutive archived posts on page {page} (last id {post_id})")
            }
            Self::CutoffReached {
                page,
                post_id,
                datetime,
            } => write!(f, "post {post_id} on page {page} is older than the window ({datetime})"),
        }
    }
}

/// Parameters of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Reference time for abbreviated listing dates.
    pub now: NaiveDateTime,
    /// Oldest timestamp still collected.
    pub cutoff: NaiveDateTime,
    /// Base for resolving post links.
    pub origin: Url,
    pub duplicate_stop_threshold: u32,
    pub page_delay: Duration,
}

impl CrawlOptions {
    #[must_use]
    pub fn from_config(config: &Config, now: NaiveDateTime) -> Self {
        Self {
            now,
            cutoff: config.cutoff(now),
            origin: config.site_origin.clone(),
            duplicate_stop_threshold: config.duplicate_stop_threshold,
            page_delay: config.page_delay,
        }
    }
}

/// What the crawl did with one extracted post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDecision {
    Accepted,
    /// Already archived, skipped.
    Duplicate,
    Stop(StopReason),
}

/// Per-row crawl state: the consecutive-duplicate counter and the posts
/// accepted so far.
///
/// Duplicates are judged against the archive snapshot in `known_ids` only,
/// never against posts accepted during this crawl.
#[derive(Debug)]
pub struct CrawlState<'a> {
    known_ids: &'a HashSet<String>,
    cutoff: NaiveDateTime,
    threshold: u32,
    consecutive_duplicates: u32,
    collected: Vec<PostRecord>,
}

impl<'a> CrawlState<'a> {
    #[must_use]
    pub fn new(known_ids: &'a HashSet<String>, cutoff: NaiveDateTime, threshold: u32) -> Self {
        Self {
            known_ids,
            cutoff,
            threshold,
            consecutive_duplicates: 0,
            collected: Vec::new(),
        }
    }

    /// Apply the stopping rules to the next post in listing order.
    ///
    /// The duplicate rule is checked before the date rule.
    pub fn observe(&mut self, page: u32, post: PostRecord) -> RowDecision {
        if self.known_ids.contains(&post.post_id) {
            self.consecutive_duplicates += 1;
            if self.consecutive_duplicates >= self.threshold {
                return RowDecision::Stop(StopReason::DuplicateRun {
                    page,
                    post_id: post.post_id,
                });
            }
            return RowDecision::Duplicate;
        }

        self.consecutive_duplicates = 0;

        if post.datetime >= self.cutoff {
            self.collected.push(post);
            RowDecision::Accepted
        } else {
            RowDecision::Stop(StopReason::CutoffReached {
                page,
                post_id: post.post_id,
                datetime: post.datetime,
            })
        }
    }

    #[must_use]
    pub fn consecutive_duplicates(&self) -> u32 {
        self.consecutive_duplicates
    }

    #[must_use]
    pub fn collected(&self) -> &[PostRecord] {
        &self.collected
    }

    #[must_use]
    pub fn into_collected(self) -> Vec<PostRecord> {
        self.collected
    }
}

/// Result of a crawl.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Posts accepted this run, in listing order.
    pub posts: Vec<PostRecord>,
    /// Pages fetched successfully.
    pub pages_fetched: u32,
    pub stop: StopReason,
}

/// Crawl listing pages from page 1 until a stopping rule fires.
///
/// Fetch failures end the crawl rather than failing it, so whatever was
/// collected from earlier pages is still returned.
pub async fn crawl(
    source: &dyn ListingSource,
    options: &CrawlOptions,
    known_ids: &HashSet<String>,
) -> CrawlOutcome {
    info!(
        known = known_ids.len(),
        cutoff = %options.cutoff,
        "Starting crawl"
    );

    let mut state = CrawlState::new(known_ids, options.cutoff, options.duplicate_stop_threshold);
    let mut pages_fetched = 0u32;
    let mut page = 1u32;

    let stop = loop {
        debug!(page, collected = state.collected().len(), "Fetching listing page");

        let html = match source.fetch_page(page).await {
            Ok(html) => html,
            Err(e) => {
                warn!(page, "Failed to load listing page: {e:#}");
                break StopReason::FetchFailed {
                    page,
                    error: e.to_string(),
                };
            }
        };
        pages_fetched += 1;

        let listing = parse_listing(&html, options.now, &options.origin);
        if listing.is_empty() {
            break StopReason::EmptyPage { page };
        }

        let mut stopped = None;
        for post in listing.posts {
            if let RowDecision::Stop(reason) = state.observe(page, post) {
                stopped = Some(reason);
                break;
            }
        }
        if let Some(reason) = stopped {
            break reason;
        }

        page += 1;
        tokio::time::sleep(options.page_delay).await;
    };

    let posts = state.into_collected();
    info!(
        collected = posts.len(),
        pages = pages_fetched,
        reason = %stop,
        "Crawl finished"
    );

    CrawlOutcome {
        posts,
        pages_fetched,
        stop,
    }
}
