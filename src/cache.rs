//! Daily cache gate: reuse today's snapshot or scrape afresh.
//!
//! A snapshot is trusted only if its dated name is today's and it is younger
//! than 24 hours. Age comes from the snapshot's metadata record when one is
//! readable; snapshots without a record fall back to the file's modification
//! time. A snapshot that cannot be loaded, or whose article count disagrees
//! with its metadata, is treated as a miss and never merged with new data.

use crate::models::Article;
use crate::outputs::snapshot::{SnapshotError, SnapshotStore};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Why a snapshot was not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No snapshot file for today.
    Absent,
    /// Today's file exists but is 24 hours old or more.
    Stale,
    /// Today's file looked fresh but could not be loaded.
    LoadFailed(String),
    /// The caller asked for a fresh scrape.
    Refresh,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::Absent => write!(f, "no snapshot for today"),
            MissReason::Stale => write!(f, "snapshot is stale"),
            MissReason::LoadFailed(e) => write!(f, "snapshot could not be loaded: {}", e),
            MissReason::Refresh => write!(f, "refresh requested"),
        }
    }
}

#[derive(Debug)]
pub enum CacheDecision {
    Hit { path: PathBuf, articles: Vec<Article> },
    Miss(MissReason),
}

enum Freshness {
    /// Fresh; carries the article count promised by the metadata record, if any.
    Fresh(Option<usize>),
    Stale,
}

#[derive(Debug, Clone)]
pub struct DailyCacheGate {
    store: SnapshotStore,
    max_age: TimeDelta,
}

impl DailyCacheGate {
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            max_age: TimeDelta::hours(24),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// A timestamp from the future counts as stale, not fresh.
    fn is_fresh(&self, age: TimeDelta) -> bool {
        age >= TimeDelta::zero() && age < self.max_age
    }

    /// Decide whether today's snapshot can be served as-is.
    #[instrument(level = "info", skip(self))]
    pub async fn check(&self, today: NaiveDate, now: DateTime<Utc>) -> CacheDecision {
        let path = self.store.snapshot_path(today);
        let file_meta = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => return CacheDecision::Miss(MissReason::Absent),
        };

        let freshness = match self.store.read_meta(today).await {
            Ok(meta) => {
                let age = now.signed_duration_since(meta.fetched_at);
                if meta.date == today && self.is_fresh(age) {
                    Freshness::Fresh(Some(meta.article_count))
                } else {
                    Freshness::Stale
                }
            }
            Err(e) => {
                debug!(error = %e, "No usable snapshot metadata; using file mtime");
                match file_meta.modified() {
                    Ok(modified) => {
                        let age = now.signed_duration_since(DateTime::<Utc>::from(modified));
                        if self.is_fresh(age) {
                            Freshness::Fresh(None)
                        } else {
                            Freshness::Stale
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Snapshot mtime unavailable; treating as stale");
                        Freshness::Stale
                    }
                }
            }
        };

        let expected = match freshness {
            Freshness::Fresh(expected) => expected,
            Freshness::Stale => return CacheDecision::Miss(MissReason::Stale),
        };

        info!(path = %path.display(), "Loading existing data for today");
        let loaded = self.store.read(&path).await.and_then(|articles| match expected {
            Some(expected) if expected != articles.len() => Err(SnapshotError::CountMismatch {
                expected,
                found: articles.len(),
            }),
            _ => Ok(articles),
        });

        match loaded {
            Ok(articles) => CacheDecision::Hit { path, articles },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error loading existing data");
                CacheDecision::Miss(MissReason::LoadFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn sample() -> Vec<Article> {
        vec![Article {
            title: "Headline A".to_string(),
            url: "https://x/1".to_string(),
            site: "36氪".to_string(),
            time: "3 hours ago".to_string(),
        }]
    }

    fn write_legacy_snapshot(store: &SnapshotStore, date: NaiveDate, age: Duration) {
        let path = store.snapshot_path(date);
        std::fs::write(&path, serde_json::to_string_pretty(&sample()).unwrap()).unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[tokio::test]
    async fn test_absent() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DailyCacheGate::new(SnapshotStore::new(dir.path()));
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::Absent)));
    }

    #[tokio::test]
    async fn test_legacy_snapshot_one_hour_old_is_hit() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        write_legacy_snapshot(&store, today(), Duration::from_secs(3600));

        let gate = DailyCacheGate::new(store);
        match gate.check(today(), Utc::now()).await {
            CacheDecision::Hit { articles, .. } => assert_eq!(articles, sample()),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_legacy_snapshot_over_a_day_old_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        write_legacy_snapshot(&store, today(), Duration::from_secs(25 * 3600));

        let gate = DailyCacheGate::new(store);
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::Stale)));
    }

    #[tokio::test]
    async fn test_metadata_age_wins_over_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let fetched_at = Utc::now() - TimeDelta::hours(25);
        store.write(today(), &sample(), fetched_at).await.unwrap();

        // file was just written, so its mtime alone would look fresh
        let gate = DailyCacheGate::new(store);
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::Stale)));
    }

    #[tokio::test]
    async fn test_fresh_snapshot_with_metadata_is_hit() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store
            .write(today(), &sample(), Utc::now() - TimeDelta::hours(1))
            .await
            .unwrap();

        let gate = DailyCacheGate::new(store);
        assert!(matches!(
            gate.check(today(), Utc::now()).await,
            CacheDecision::Hit { .. }
        ));
    }

    #[tokio::test]
    async fn test_fetched_at_in_future_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store
            .write(today(), &sample(), Utc::now() + TimeDelta::hours(2))
            .await
            .unwrap();

        let gate = DailyCacheGate::new(store);
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::Stale)));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write(today(), &sample(), Utc::now()).await.unwrap();
        std::fs::write(store.snapshot_path(today()), "[]").unwrap();

        let gate = DailyCacheGate::new(store);
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::LoadFailed(_))));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        std::fs::write(store.snapshot_path(today()), "{not json").unwrap();

        let gate = DailyCacheGate::new(store);
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::LoadFailed(_))));
    }

    #[tokio::test]
    async fn test_yesterdays_file_is_not_todays() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let yesterday = today().pred_opt().unwrap();
        write_legacy_snapshot(&store, yesterday, Duration::from_secs(60));

        let gate = DailyCacheGate::new(store);
        let decision = gate.check(today(), Utc::now()).await;
        assert!(matches!(decision, CacheDecision::Miss(MissReason::Absent)));
    }
}
