//! Week-partitioned JSON archive on local disk.
//!
//! Each ISO week lives in `{data_dir}/{week_id}.json`. Files are only ever
//! appended to (new unique posts merged in) and rewritten whole.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::archive::models::{PostRecord, WeekFile};
use crate::archive::week::WeekBucket;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode week file {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode week {week}: {source}")]
    Encode {
        week: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of merging one week's batch into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub week: String,
    pub existing: usize,
    pub added: usize,
    pub total: usize,
    /// The week file did not exist before this merge.
    pub created: bool,
}

/// Handle on the archive directory of one gallery.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
    gallery_id: String,
    gallery_name: String,
}

impl ArchiveStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, gallery_id: &str, gallery_name: &str) -> Self {
        Self {
            dir: dir.into(),
            gallery_id: gallery_id.to_string(),
            gallery_name: gallery_name.to_string(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `week_id`.
    #[must_use]
    pub fn week_path(&self, week_id: &str) -> PathBuf {
        self.dir.join(format!("{week_id}.json"))
    }

    /// Collect every post id present in any week file.
    ///
    /// This is a full scan of the directory, done once per run. A missing
    /// directory is an empty archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or any week file cannot be read or decoded.
    pub async fn build_id_index(&self) -> Result<HashSet<String>, StoreError> {
        let mut ids = HashSet::new();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(StoreError::io("read directory", &self.dir, e)),
        };

        let mut files = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io("read directory", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let file = read_week_file(&path).await?;
            ids.extend(file.posts.into_iter().map(|p| p.post_id));
            files += 1;
        }

        debug!(files, ids = ids.len(), "Built post id index");
        Ok(ids)
    }

    /// Load the week file for `week_id`, if one has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn load_week(&self, week_id: &str) -> Result<Option<WeekFile>, StoreError> {
        let path = self.week_path(week_id);
        match fs::try_exists(&path).await {
            Ok(true) => read_week_file(&path).await.map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(StoreError::io("stat", &path, e)),
        }
    }

    /// Write a week file, replacing any previous version.
    ///
    /// The content goes to a sibling temp file first and is renamed into
    /// place, so readers never see a half-written file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any filesystem step fails.
    pub async fn save_week(&self, file: &WeekFile) -> Result<PathBuf, StoreError> {
        let path = self.week_path(&file.week);
        let tmp_path = self.dir.join(format!("{}.json.tmp", file.week));

        let json = serde_json::to_string_pretty(file).map_err(|e| StoreError::Encode {
            week: file.week.clone(),
            source: e,
        })?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io("create directory", &self.dir, e))?;
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| StoreError::io("write", &tmp_path, e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::io("replace", &path, e))?;

        Ok(path)
    }

    /// Merge a week's freshly collected posts into its file and persist it.
    ///
    /// Posts whose id is already in the file are dropped, as are repeats
    /// within the batch. The result is sorted newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing file cannot be loaded or the new one
    /// cannot be written.
    pub async fn merge_and_persist(
        &self,
        bucket: &WeekBucket,
        last_updated: &str,
    ) -> Result<MergeReport, StoreError> {
        let week_id = &bucket.info.week_id;
        let existing = self.load_week(week_id).await?;
        let created = existing.is_none();
        let existing_posts = existing.map(|f| f.posts).unwrap_or_default();
        let existing_count = existing_posts.len();

        let (merged, added) = merge_posts(existing_posts, &bucket.posts);

        let file = WeekFile::new(
            &self.gallery_id,
            &self.gallery_name,
            &bucket.info,
            last_updated.to_string(),
            merged,
        );
        let path = self.save_week(&file).await?;

        if created {
            info!(week = %week_id, total = file.total_posts, "Created week file");
        } else {
            info!(
                week = %week_id,
                existing = existing_count,
                added,
                total = file.total_posts,
                "Merged week file"
            );
        }
        debug!(path = %path.display(), "Week file written");

        Ok(MergeReport {
            week: week_id.clone(),
            existing: existing_count,
            added,
            total: file.total_posts,
            created,
        })
    }
}

/// Append the posts of `incoming` whose ids are not yet present, then sort
/// by `datetime` descending.
///
/// The sort is stable, so posts sharing a timestamp keep their relative
/// order (existing posts first, then new ones in batch order). Returns the
/// merged list and how many posts were added.
#[must_use]
pub fn merge_posts(existing: Vec<PostRecord>, incoming: &[PostRecord]) -> (Vec<PostRecord>, usize) {
    let mut seen: HashSet<String> = existing.iter().map(|p| p.post_id.clone()).collect();
    let mut merged = existing;
    let before = merged.len();

    for post in incoming {
        if seen.insert(post.post_id.clone()) {
            merged.push(post.clone());
        }
    }

    let added = merged.len() - before;
    merged.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    (merged, added)
}

async fn read_week_file(path: &Path) -> Result<WeekFile, StoreError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::io("read", path, e))?;
    serde_json::from_str(&content).map_err(|e| StoreError::Decode {
        path: path.to_path_buf(),
        source: e,
    })
}
