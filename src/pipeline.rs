//! One archiving run: crawl new posts, split them by week and merge each
//! week into the archive.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use tracing::{error, info};

use crate::archive::{partition, ArchiveStore, MergeReport};
use crate::config::Config;
use crate::crawler::{crawl, CrawlOptions, ListingSource, StopReason};

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Posts accepted by the crawl, before per-week deduplication.
    pub collected: usize,
    pub pages_fetched: u32,
    pub stop: StopReason,
    /// One entry per week file written, in week order.
    pub weeks: Vec<MergeReport>,
}

impl RunSummary {
    /// Posts newly written to the archive.
    #[must_use]
    pub fn added(&self) -> usize {
        self.weeks.iter().map(|w| w.added).sum()
    }
}

/// Run once against the current time in the configured zone.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or a week file cannot be
/// written. Fetch failures only end the crawl early.
pub async fn run(config: &Config, source: &dyn ListingSource) -> Result<RunSummary> {
    run_at(config, source, config.now()).await
}

/// Run once with `now` as the reference time.
///
/// # Errors
///
/// See [`run`].
pub async fn run_at(
    config: &Config,
    source: &dyn ListingSource,
    now: DateTime<FixedOffset>,
) -> Result<RunSummary> {
    let store = ArchiveStore::new(&config.data_dir, &config.gallery_id, &config.gallery_name);

    let known_ids = store
        .build_id_index()
        .await
        .context("Failed to index existing archive")?;
    info!(
        gallery = %config.gallery_id,
        known = known_ids.len(),
        days = config.days_limit,
        "Loaded archive index"
    );

    let options = CrawlOptions::from_config(config, now.naive_local());
    let outcome = crawl(source, &options, &known_ids).await;

    let mut summary = RunSummary {
        collected: outcome.posts.len(),
        pages_fetched: outcome.pages_fetched,
        stop: outcome.stop,
        weeks: Vec::new(),
    };

    if outcome.posts.is_empty() {
        info!("No new posts collected");
        return Ok(summary);
    }

    let last_updated = now.format("%Y-%m-%dT%H:%M:%S%:z").to_string();

    for (week_id, bucket) in partition(outcome.posts) {
        match store.merge_and_persist(&bucket, &last_updated).await {
            Ok(report) => summary.weeks.push(report),
            Err(e) => {
                error!(
                    week = %week_id,
                    collected = summary.collected,
                    weeks_written = summary.weeks.len(),
                    added = summary.added(),
                    "Failed to save week; earlier weeks are already on disk"
                );
                return Err(e).with_context(|| format!("Failed to save week {week_id}"));
            }
        }
    }

    info!(
        collected = summary.collected,
        added = summary.added(),
        weeks = summary.weeks.len(),
        "Archive updated"
    );

    Ok(summary)
}
