//! DCInside gallery archiver library.
//!
//! Crawls the listing pages of one gallery and keeps a deduplicated archive
//! of post metadata on disk, one JSON file per ISO week. Each run only adds
//! posts that are not archived yet and fall inside a trailing time window.

pub mod archive;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod pipeline;
