//! Grouping of freshly collected posts by ISO week.

use std::collections::BTreeMap;

use crate::archive::models::{PostRecord, WeekInfo};

/// Posts collected this run that belong to one week.
#[derive(Debug, Clone)]
pub struct WeekBucket {
    pub info: WeekInfo,
    pub posts: Vec<PostRecord>,
}

/// Group records by the ISO week of their own `datetime`.
///
/// No deduplication happens here and input order is kept inside each bucket.
/// Buckets are keyed (and iterate) by week id.
#[must_use]
pub fn partition(records: Vec<PostRecord>) -> BTreeMap<String, WeekBucket> {
    let mut weeks: BTreeMap<String, WeekBucket> = BTreeMap::new();

    for record in records {
        let info = WeekInfo::for_date(record.datetime.date());
        weeks
            .entry(info.week_id.clone())
            .or_insert_with(|| WeekBucket {
                info,
                posts: Vec::new(),
            })
            .posts
            .push(record);
    }

    weeks
}
