// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Outbound HTTP: fetching third-party HTML pages.
//!
//! One [`HttpFetcher`] is created per run and shared by all scrapers,
//! so the timeout, retry, rate and connection limits hold
//! for all the requests going out of the process.

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{
    header::{self, HeaderMap, HeaderValue, InvalidHeaderValue},
    Client, StatusCode,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::instrument;
use url::Url;

use crate::settings::HttpSettings;

pub type RL = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::QuantaClock,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Why a page could not be fetched.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Not a valid URL: '{0}': {1}")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("Network/Internet download of '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest_middleware::Error,
    },
    #[error("Page '{url}' does not exist (HTTP {status})")]
    NotFound { url: String, status: u16 },
    #[error("Fetching page '{url}' failed with HTTP status {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Whether trying again later might succeed.
    /// Timeouts, connection problems, server errors and throttling are transient;
    /// a missing page or a client error are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || StatusCode::from_u16(*status).is_ok_and(|code| code.is_server_error())
            }
            Self::InvalidUrl(..) | Self::NotFound { .. } => false,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Thrown when setting up the HTTP client failed.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Invalid HTTP User-Agent value: {0}")]
    UserAgent(#[from] InvalidHeaderValue),
    #[error("Failed to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Parses a URL, mapping the error to the fetch-layer taxonomy.
pub fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|err| FetchError::InvalidUrl(url.to_owned(), err))
}

/// Fetches the HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the body of the page at `url`.
    ///
    /// # Errors
    ///
    /// Any non-success status is an error,
    /// with 404 and 410 being reported as [`FetchError::NotFound`].
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Creates a default set of headers for downloads.
fn create_headers(user_agent: &str) -> Result<HeaderMap, SetupError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_str(user_agent)?);
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml"),
    );
    Ok(headers)
}

/// Creates a new [`reqwest::Client`] with the supplied retry and timeout settings.
/// @param retries Number of retries for a single fetch
/// @param timeout Total timeout per request in milliseconds (ms)
pub fn create_downloader(
    retries: u32,
    timeout: u64,
    headers: Option<HeaderMap>,
) -> Result<ClientWithMiddleware, SetupError> {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(retries);
    let mut client_builder = Client::builder().timeout(Duration::from_millis(timeout));
    if let Some(headers_val) = headers {
        client_builder = client_builder.default_headers(headers_val);
    }
    Ok(ClientBuilder::new(client_builder.build()?)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// The real, network based [`PageFetcher`].
pub struct HttpFetcher {
    client: ClientWithMiddleware,
    rate_limiter: Option<Arc<RL>>,
    permits: Arc<Semaphore>,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// If the user agent is not a valid header value,
    /// or the TLS back-end fails to initialize.
    pub fn new(user_agent: &str, http: &HttpSettings) -> Result<Self, SetupError> {
        let client = create_downloader(
            http.retries,
            http.timeout,
            Some(create_headers(user_agent)?),
        )?;
        let rate_limiter = NonZeroU32::new(http.requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));
        if rate_limiter.is_none() {
            tracing::warn!("HTTP requests are not rate-limited (requests_per_second = 0)");
        }
        Ok(Self {
            client,
            rate_limiter,
            permits: Arc::new(Semaphore::new(http.max_concurrent_requests.max(1))),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        // The semaphore is never closed, so this always yields a permit.
        let _permit = self.permits.acquire().await.ok();
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.until_ready().await;
        }

        tracing::debug!("Fetching page ...");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                source: err.into(),
            })
    }
}

/// A map backed stand-in for [`HttpFetcher`].
#[cfg(test)]
pub mod testing {
    use super::{async_trait, FetchError, PageFetcher, Url};
    use std::{collections::HashMap, sync::Mutex};

    pub enum FakeResponse {
        Page(String),
        NotFound,
        Unavailable,
    }

    /// Answers from a fixed set of pages;
    /// unknown URLs are not found.
    #[derive(Default)]
    pub struct FakeFetcher {
        responses: HashMap<String, FakeResponse>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
            self.responses
                .insert(url.to_owned(), FakeResponse::Page(html.into()));
            self
        }

        #[must_use]
        pub fn with_response(mut self, url: &str, response: FakeResponse) -> Self {
            self.responses.insert(url.to_owned(), response);
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }

        pub fn request_count(&self, url: &str) -> usize {
            self.requested
                .lock()
                .unwrap()
                .iter()
                .filter(|requested| requested.as_str() == url)
                .count()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.responses.get(url.as_str()) {
                Some(FakeResponse::Page(html)) => Ok(html.clone()),
                Some(FakeResponse::Unavailable) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                }),
                Some(FakeResponse::NotFound) | None => Err(FetchError::NotFound {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}
