//! Retrieval of raw listing pages.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;
use url::Url;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("page {page} returned status {status}")]
    Status {
        page: u32,
        status: reqwest::StatusCode,
    },
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Source of listing page documents, numbered from 1.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the raw HTML of listing page `page`.
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError>;
}

/// Fetches listing pages of one gallery over HTTP.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: reqwest::Client,
    listing_url: Url,
    gallery_id: String,
}

impl HttpListingSource {
    /// Build a client sending browser-like headers with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the user agent is not a valid header value or the
    /// client cannot be built.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ko-KR,ko;q=0.9,en;q=0.8"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            listing_url: config.listing_url.clone(),
            gallery_id: config.gallery_id.clone(),
        })
    }

    /// URL of listing page `page`.
    #[must_use]
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair("id", &self.gallery_id)
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        let response = self
            .client
            .get(self.page_url(page))
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { page, status });
        }

        response
            .text()
            .await
            .map_err(|source| FetchError::Transport { page, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url() {
        let config = Config::for_testing(
            "https://gall.dcinside.com/mgallery/board/lists/",
            "/tmp/unused",
        );
        let source = HttpListingSource::new(&config).unwrap();
        assert_eq!(
            source.page_url(3).as_str(),
            "https://gall.dcinside.com/mgallery/board/lists/?id=testgall&page=3"
        );
    }
}
