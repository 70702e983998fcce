//! One run of the digest: cache gate, then either load or scrape-and-save.
//!
//! ```text
//! DailyCacheGate ─ hit ──▶ snapshot articles ─────────────────────┐
//!        └──────── miss ─▶ crawl(sites) ─▶ SnapshotStore::write ──┴▶ GroupedView
//! ```
//!
//! A snapshot write failure is returned to the caller, which treats it as fatal.

use crate::cache::{CacheDecision, DailyCacheGate, MissReason};
use crate::config::SiteConfig;
use crate::models::{group_by_site, Article, GroupedView};
use crate::outputs::snapshot::SnapshotError;
use crate::scrapers::tophub::{crawl, CrawlOptions};
use crate::scrapers::PageSource;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

/// Where a run's articles came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Scrape { failed_sites: Vec<String> },
}

#[derive(Debug)]
pub struct Digest {
    pub date: NaiveDate,
    pub origin: Origin,
    pub grouped: GroupedView,
}

/// Produce today's grouped articles, scraping only when the cache gate says so.
#[instrument(level = "info", skip_all, fields(%today, refresh = refresh))]
pub async fn load_or_scrape<S: PageSource>(
    source: &S,
    sites: &[SiteConfig],
    options: &CrawlOptions,
    gate: &DailyCacheGate,
    today: NaiveDate,
    now: DateTime<Utc>,
    refresh: bool,
) -> Result<Digest, SnapshotError> {
    let decision = if refresh {
        CacheDecision::Miss(MissReason::Refresh)
    } else {
        gate.check(today, now).await
    };

    match decision {
        CacheDecision::Hit { path, articles } => {
            info!(path = %path.display(), count = articles.len(), "Serving today's snapshot");
            Ok(Digest {
                date: today,
                origin: Origin::Cache,
                grouped: group_by_site(articles),
            })
        }
        CacheDecision::Miss(reason) => {
            info!(%reason, "Fetching new data");
            let report = crawl(source, sites, options).await;
            let articles: Vec<Article> = report.articles;
            gate.store().write(today, &articles, Utc::now()).await?;
            Ok(Digest {
                date: today,
                origin: Origin::Scrape {
                    failed_sites: report.failed_sites,
                },
                grouped: group_by_site(articles),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::snapshot::SnapshotStore;
    use crate::retry::tests::{fast_policy, ScriptedSource};
    use crate::retry::BudgetScope;
    use std::time::Duration;

    fn options() -> CrawlOptions {
        CrawlOptions {
            retry: fast_policy(BudgetScope::PerSite),
            max_site_delay: Duration::ZERO,
        }
    }

    fn sites() -> Vec<SiteConfig> {
        vec![
            SiteConfig::tophub("36氪", "https://tophub.today/n/1"),
            SiteConfig::tophub("掘金", "https://tophub.today/n/2"),
        ]
    }

    fn page(title: &str) -> Result<String, u16> {
        Ok(format!(
            r#"<table class="table"><tbody><tr><td>1</td><td class="al"><a href="https://x/{0}">{0}</a></td><td>1h</td></tr></tbody></table>"#,
            title
        ))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_every_site_visit() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let today = Utc::now().date_naive();
        let cached = vec![Article {
            title: "Cached".to_string(),
            url: "https://x/c".to_string(),
            site: "36氪".to_string(),
            time: "1h".to_string(),
        }];
        store
            .write(today, &cached, Utc::now() - chrono::TimeDelta::hours(1))
            .await
            .unwrap();
        let gate = DailyCacheGate::new(store);
        let source = ScriptedSource::new(vec![page("fresh"), page("fresh")]);

        let digest = load_or_scrape(&source, &sites(), &options(), &gate, today, Utc::now(), false)
            .await
            .unwrap();

        assert_eq!(source.call_count(), 0);
        assert_eq!(digest.origin, Origin::Cache);
        assert_eq!(digest.grouped.site("36氪").unwrap(), cached.as_slice());
    }

    #[tokio::test]
    async fn test_cache_miss_scrapes_all_sites_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DailyCacheGate::new(SnapshotStore::new(dir.path()));
        let today = Utc::now().date_naive();
        let source = ScriptedSource::new(vec![page("a"), page("b")]);

        let digest = load_or_scrape(&source, &sites(), &options(), &gate, today, Utc::now(), false)
            .await
            .unwrap();

        assert_eq!(
            *source.calls.borrow(),
            vec!["https://tophub.today/n/1", "https://tophub.today/n/2"]
        );
        assert_eq!(digest.origin, Origin::Scrape { failed_sites: vec![] });
        assert_eq!(digest.grouped.article_count(), 2);

        let saved = gate
            .store()
            .read(&gate.store().snapshot_path(today))
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].site, "36氪");
        assert_eq!(saved[1].site, "掘金");
    }

    #[tokio::test]
    async fn test_second_run_same_day_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DailyCacheGate::new(SnapshotStore::new(dir.path()));
        let today = Utc::now().date_naive();

        let first = ScriptedSource::new(vec![page("a"), page("b")]);
        load_or_scrape(&first, &sites(), &options(), &gate, today, Utc::now(), false)
            .await
            .unwrap();

        let second = ScriptedSource::new(vec![]);
        let digest = load_or_scrape(&second, &sites(), &options(), &gate, today, Utc::now(), false)
            .await
            .unwrap();

        assert_eq!(second.call_count(), 0);
        assert_eq!(digest.origin, Origin::Cache);
        assert_eq!(digest.grouped.article_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_ignores_fresh_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let today = Utc::now().date_naive();
        store.write(today, &[], Utc::now()).await.unwrap();
        let gate = DailyCacheGate::new(store);
        let source = ScriptedSource::new(vec![page("a"), page("b")]);

        let digest = load_or_scrape(&source, &sites(), &options(), &gate, today, Utc::now(), true)
            .await
            .unwrap();

        assert_eq!(source.call_count(), 2);
        assert_eq!(digest.grouped.article_count(), 2);
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DailyCacheGate::new(SnapshotStore::new(dir.path().join("gone")));
        let source = ScriptedSource::new(vec![page("a"), page("b")]);

        let result = load_or_scrape(
            &source,
            &sites(),
            &options(),
            &gate,
            Utc::now().date_naive(),
            Utc::now(),
            false,
        )
        .await;

        assert!(result.is_err());
    }
}
