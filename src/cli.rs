//! Command-line interface definitions for News Digest.
//!
//! Every option can also be set through an environment variable prefixed
//! with `NEWS_DIGEST_`.

use crate::retry::{BudgetScope, RetryPolicy};
use crate::scrapers::tophub::CrawlOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Command-line arguments for News Digest.
///
/// # Examples
///
/// ```sh
/// # Scrape (or reuse today's snapshot) and open the page
/// news_digest
///
/// # Keep snapshots elsewhere, custom site list, no browser
/// news_digest -d ~/.news --sites sites.yaml --no-browser
///
/// # Ignore today's snapshot
/// news_digest --refresh
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding the daily news_<date>.json snapshots
    #[arg(short, long, env = "NEWS_DIGEST_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// YAML file with the site list (built-in list when omitted)
    #[arg(short, long, env = "NEWS_DIGEST_SITES")]
    pub sites: Option<PathBuf>,

    /// Address to serve the page on
    #[arg(long, env = "NEWS_DIGEST_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to serve the page on
    #[arg(short, long, env = "NEWS_DIGEST_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Retries per budget for failed page fetches
    #[arg(long, env = "NEWS_DIGEST_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Backoff unit in milliseconds; the n-th retry waits n units
    #[arg(long, env = "NEWS_DIGEST_RETRY_BASE_DELAY_MS", default_value_t = 1000)]
    pub retry_base_delay_ms: u64,

    /// Share one retry budget across all sites instead of one per site
    #[arg(long, env = "NEWS_DIGEST_SHARED_RETRY_BUDGET")]
    pub shared_retry_budget: bool,

    /// Upper bound in milliseconds of the random pause between site visits
    #[arg(long, env = "NEWS_DIGEST_MAX_SITE_DELAY_MS", default_value_t = 2000)]
    pub max_site_delay_ms: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "NEWS_DIGEST_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Per-request timeout in seconds (none when omitted)
    #[arg(long, env = "NEWS_DIGEST_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Scrape even if today's snapshot is fresh
    #[arg(long, env = "NEWS_DIGEST_REFRESH")]
    pub refresh: bool,

    /// Do not open the page in a browser
    #[arg(long, env = "NEWS_DIGEST_NO_BROWSER")]
    pub no_browser: bool,
}

impl Cli {
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
                scope: if self.shared_retry_budget {
                    BudgetScope::Shared
                } else {
                    BudgetScope::PerSite
                },
            },
            max_site_delay: Duration::from_millis(self.max_site_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// URL the browser is pointed at.
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
