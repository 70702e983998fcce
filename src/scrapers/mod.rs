//! Page fetching for the configured aggregator sites.
//!
//! Fetching is split in two so the crawl can run offline in tests:
//!
//! 1. **Transport**: [`PageSource`] turns a URL into an HTML body. The
//!    production implementation is [`HttpPageSource`] (reqwest).
//! 2. **Parsing**: [`tophub`] reads the ranking table rows out of the body and
//!    drives the sequential per-site crawl.
//!
//! Errors are classified by [`FetchError`]; only transport-level failures
//! (connection errors and non-success statuses) are handed to the retry policy.

pub mod tophub;

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("domain not allowed: {0}")]
    ForbiddenDomain(String),
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

impl FetchError {
    /// Whether a retry has any chance of producing a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}

/// Something that can fetch a page body for a URL.
pub trait PageSource {
    /// Fetch `url` and return its body text.
    fn get(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// [`PageSource`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
    allowed_domains: Vec<String>,
}

impl HttpPageSource {
    /// Build a client sending `user_agent`, limited to `allowed_domains`
    /// (empty allows every host). `timeout` of `None` waits indefinitely.
    pub fn new(
        user_agent: &str,
        timeout: Option<Duration>,
        allowed_domains: Vec<String>,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            allowed_domains,
        })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let target = check_domain(url, &self.allowed_domains)?;
        let resp = self.client.get(target).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

/// Parse `url` and make sure its host is one of `allowed` (or a subdomain of one).
pub fn check_domain(url: &str, allowed: &[String]) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if allowed.is_empty() {
        return Ok(parsed);
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let permitted = allowed.iter().any(|domain| {
        let domain = domain.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{}", domain))
    });
    if permitted {
        Ok(parsed)
    } else {
        Err(FetchError::ForbiddenDomain(host))
    }
}
