use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use thiserror::Error;
use url::Url;

use crate::constants::{
    BROWSER_USER_AGENT, DEFAULT_GALLERY_ID, DEFAULT_GALLERY_NAME, DEFAULT_LISTING_URL,
    DEFAULT_SITE_ORIGIN, DEFAULT_UTC_OFFSET_HOURS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as URL: {source}")]
    ParseUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },
}

/// Run parameters loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Gallery
    pub gallery_id: String,
    pub gallery_name: String,
    pub listing_url: Url,
    pub site_origin: Url,

    // Crawl policy
    pub days_limit: u32,
    pub page_delay: Duration,
    pub request_timeout: Duration,
    pub duplicate_stop_threshold: u32,
    pub user_agent: String,
    pub utc_offset: FixedOffset,

    // Archive
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let offset_hours = parse_env_i32("UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;

        Ok(Self {
            // Gallery
            gallery_id: env_or_default("GALLERY_ID", DEFAULT_GALLERY_ID),
            gallery_name: env_or_default("GALLERY_NAME", DEFAULT_GALLERY_NAME),
            listing_url: parse_env_url("LISTING_URL", DEFAULT_LISTING_URL)?,
            site_origin: parse_env_url("SITE_ORIGIN", DEFAULT_SITE_ORIGIN)?,

            // Crawl policy
            days_limit: parse_env_u32("DAYS_LIMIT", 28)?,
            page_delay: Duration::from_millis(parse_env_u64("PAGE_DELAY_MS", 500)?),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),
            duplicate_stop_threshold: parse_env_u32("DUPLICATE_STOP_THRESHOLD", 5)?,
            user_agent: env_or_default("USER_AGENT", BROWSER_USER_AGENT),
            utc_offset: offset_from_hours(offset_hours)?,

            // Archive
            data_dir: PathBuf::from(env_or_default("DATA_DIR", "./data")),
        })
    }

    /// Configuration pointing at a local listing endpoint, for tests.
    ///
    /// # Panics
    ///
    /// Panics if `listing_url` is not a valid URL.
    #[doc(hidden)]
    #[must_use]
    pub fn for_testing(listing_url: &str, data_dir: impl Into<PathBuf>) -> Self {
        let listing_url = Url::parse(listing_url).expect("test listing URL must be valid");
        Self {
            gallery_id: "testgall".to_string(),
            gallery_name: "Test Gallery".to_string(),
            site_origin: listing_url.clone(),
            listing_url,
            days_limit: 28,
            page_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            duplicate_stop_threshold: 5,
            user_agent: BROWSER_USER_AGENT.to_string(),
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .expect("default offset is in range"),
            data_dir: data_dir.into(),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gallery_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "GALLERY_ID".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.days_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "DAYS_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.duplicate_stop_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                name: "DUPLICATE_STOP_THRESHOLD".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.listing_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                name: "LISTING_URL".to_string(),
                message: format!("'{}' is not an http(s) URL", self.listing_url),
            });
        }
        Ok(())
    }

    /// Current wall-clock time in the forum's time zone.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }

    /// Oldest timestamp still inside the trailing window ending at `now`.
    #[must_use]
    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        now - TimeDelta::days(i64::from(self.days_limit))
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i32(name: &str, default: i32) -> Result<i32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_url(name: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = env_or_default(name, default);
    Url::parse(&raw).map_err(|e| ConfigError::ParseUrl {
        name: name.to_string(),
        source: e,
    })
}

fn offset_from_hours(hours: i32) -> Result<FixedOffset, ConfigError> {
    if !(-23..=23).contains(&hours) {
        return Err(ConfigError::InvalidValue {
            name: "UTC_OFFSET_HOURS".to_string(),
            message: format!("must be between -23 and 23, got {hours}"),
        });
    }
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| ConfigError::InvalidValue {
        name: "UTC_OFFSET_HOURS".to_string(),
        message: format!("offset {hours}h is out of range"),
    })
}
