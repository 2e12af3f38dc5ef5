//! Durable state: weekly JSON files of archived posts.

pub mod models;
pub mod store;
pub mod week;

pub use models::{AuthorType, PostFields, PostRecord, WeekFile, WeekInfo};
pub use store::{merge_posts, ArchiveStore, MergeReport, StoreError};
pub use week::{partition, WeekBucket};
