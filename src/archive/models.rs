//! Records and week files as they appear on disk.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// How the forum identified the author of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorType {
    /// Logged-in account (row carries a user id).
    Member,
    /// Anonymous poster shown with a partial IP.
    Ip,
    /// Anonymous poster using the forum's default nickname.
    SemiAnonymous,
    #[default]
    Unknown,
}

/// One listing row, as persisted in a week file.
///
/// `date`, `time` and `datetime` always describe the same instant; build
/// records through [`PostRecord::new`] to keep them in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub post_id: String,
    pub title: String,
    pub author: String,
    pub author_ip: String,
    pub author_type: AuthorType,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub datetime: NaiveDateTime,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub url: String,
}

/// Fields of a listing row other than its timestamp.
#[derive(Debug, Clone, Default)]
pub struct PostFields {
    pub post_id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub author_ip: String,
    pub author_type: AuthorType,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

impl PostRecord {
    /// Build a record, deriving the date and time columns from `posted_at`.
    #[must_use]
    pub fn new(fields: PostFields, posted_at: NaiveDateTime) -> Self {
        Self {
            post_id: fields.post_id,
            title: fields.title,
            author: fields.author,
            author_ip: fields.author_ip,
            author_type: fields.author_type,
            date: posted_at.date(),
            time: posted_at.time(),
            datetime: posted_at,
            views: fields.views,
            likes: fields.likes,
            comments: fields.comments,
            url: fields.url,
        }
    }
}

/// ISO-8601 week a post belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekInfo {
    /// `{iso_year}_W{week:02}`, also the file stem.
    pub week_id: String,
    pub year: i32,
    pub week: u32,
    /// Monday.
    pub week_start: NaiveDate,
    /// Sunday.
    pub week_end: NaiveDate,
}

impl WeekInfo {
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        let week_start =
            date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday()));
        Self {
            week_id: format!("{}_W{:02}", iso.year(), iso.week()),
            year: iso.year(),
            week: iso.week(),
            week_start,
            week_end: week_start + TimeDelta::days(6),
        }
    }
}

/// The persisted unit: every archived post of one gallery for one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekFile {
    pub gallery_id: String,
    pub gallery_name: String,
    pub week: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub last_updated: String,
    pub posts: Vec<PostRecord>,
    pub total_posts: usize,
}

impl WeekFile {
    /// Create a week file holding `posts`, with `total_posts` matching.
    #[must_use]
    pub fn new(
        gallery_id: &str,
        gallery_name: &str,
        info: &WeekInfo,
        last_updated: String,
        posts: Vec<PostRecord>,
    ) -> Self {
        Self {
            gallery_id: gallery_id.to_string(),
            gallery_name: gallery_name.to_string(),
            week: info.week_id.clone(),
            week_start: info.week_start,
            week_end: info.week_end,
            last_updated,
            total_posts: posts.len(),
            posts,
        }
    }
}
