//! Ranking-table scraper for aggregator list pages.
//!
//! Each configured site is one list page whose headlines sit in table rows:
//!
//! ```html
//! <table class="table"><tbody>
//!   <tr><td>1.</td><td class="al"><a href="https://x/1">Headline</a></td><td>3 hours ago</td></tr>
//! </tbody></table>
//! ```
//!
//! Sites are visited one at a time in configuration order. A row becomes an
//! [`Article`] only when both its title text and its link are non-empty after
//! trimming; other rows are dropped without comment. A site whose fetch fails
//! after retries is logged and skipped, and the crawl moves on.

use crate::config::SiteConfig;
use crate::models::Article;
use crate::retry::{fetch_with_retry, BudgetScope, RetryBudget, RetryPolicy};
use crate::scrapers::{FetchError, PageSource};
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Compiled selector paths for one site.
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    row: Selector,
    title: Selector,
    link: Selector,
    time: Selector,
}

impl SiteSelectors {
    pub fn compile(site: &SiteConfig) -> Result<Self, FetchError> {
        Ok(Self {
            row: parse_selector(&site.row_path)?,
            title: parse_selector(&site.title_path)?,
            link: parse_selector(&site.link_path)?,
            time: parse_selector(&site.time_path)?,
        })
    }
}

fn parse_selector(path: &str) -> Result<Selector, FetchError> {
    Selector::parse(path).map_err(|e| FetchError::Selector {
        selector: path.to_string(),
        reason: e.to_string(),
    })
}

/// Concatenated text of every node under `row` matching `selector`, trimmed.
fn child_text(row: ElementRef<'_>, selector: &Selector) -> String {
    row.select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Trimmed `href` of the first node under `row` matching `selector`.
fn child_href<'a>(row: ElementRef<'a>, selector: &Selector) -> &'a str {
    row.select(selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .unwrap_or_default()
}

/// Absolute hrefs are kept exactly as written; only relative ones are joined
/// onto the site URL. Anything unparseable is kept verbatim.
fn resolve_href(base: Option<&Url>, href: &str) -> String {
    match Url::parse(href) {
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .and_then(|b| b.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string()),
        _ => href.to_string(),
    }
}

/// Parse every matching row of `html` into articles for `site`.
pub fn parse_rows(html: &str, site: &SiteConfig, selectors: &SiteSelectors) -> Vec<Article> {
    let document = Html::parse_document(html);
    let base = Url::parse(&site.url).ok();

    document
        .select(&selectors.row)
        .filter_map(|row| {
            let title = child_text(row, &selectors.title);
            let href = child_href(row, &selectors.link);
            if title.is_empty() || href.is_empty() {
                return None;
            }
            Some(Article {
                title,
                url: resolve_href(base.as_ref(), href),
                site: site.name.clone(),
                time: child_text(row, &selectors.time),
            })
        })
        .collect()
}

/// Knobs for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub retry: RetryPolicy,
    /// Upper bound of the random pause taken before every site after the first.
    pub max_site_delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_site_delay: Duration::from_secs(2),
        }
    }
}

/// What a crawl produced.
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// All articles, in site order then row order.
    pub articles: Vec<Article>,
    /// Names of sites skipped because their fetch failed.
    pub failed_sites: Vec<String>,
    /// Retries spent across the run.
    pub retries_used: u32,
}

/// Visit one site and parse its rows.
#[instrument(level = "info", skip_all, fields(site = %site.name, url = %site.url))]
pub async fn visit_site<S: PageSource>(
    source: &S,
    site: &SiteConfig,
    policy: &RetryPolicy,
    budget: &mut RetryBudget,
) -> Result<Vec<Article>, FetchError> {
    let selectors = SiteSelectors::compile(site)?;
    let html = fetch_with_retry(source, &site.url, policy, budget).await?;
    let articles = parse_rows(&html, site, &selectors);
    debug!(bytes = html.len(), count = articles.len(), "Parsed site rows");
    Ok(articles)
}

/// Visit every site in order and collect their articles into one list.
#[instrument(level = "info", skip_all, fields(sites = sites.len()))]
pub async fn crawl<S: PageSource>(
    source: &S,
    sites: &[SiteConfig],
    options: &CrawlOptions,
) -> CrawlReport {
    let mut report = CrawlReport::default();
    let mut shared = options.retry.budget();

    for (i, site) in sites.iter().enumerate() {
        if i > 0 {
            pause_between_sites(options.max_site_delay).await;
        }

        let mut own;
        let budget = match options.retry.scope {
            BudgetScope::Shared => &mut shared,
            BudgetScope::PerSite => {
                own = options.retry.budget();
                &mut own
            }
        };
        let used_before = budget.used();

        match visit_site(source, site, &options.retry, budget).await {
            Ok(found) => {
                info!(site = %site.name, count = found.len(), "Scraped site");
                report.articles.extend(found);
            }
            Err(e) => {
                error!(site = %site.name, error = %e, "Error visiting site; skipping");
                report.failed_sites.push(site.name.clone());
                if options.retry.scope == BudgetScope::Shared && budget.is_exhausted() {
                    warn!("Shared retry budget exhausted; later failures will not be retried");
                }
            }
        }
        report.retries_used += budget.used() - used_before;
    }

    info!(
        total = report.articles.len(),
        failed = report.failed_sites.len(),
        retries = report.retries_used,
        "Crawl complete"
    );
    report
}

async fn pause_between_sites(max: Duration) {
    if max.is_zero() {
        return;
    }
    let ms = rand::rng().random_range(0..=max.as_millis() as u64);
    sleep(Duration::from_millis(ms)).await;
}
