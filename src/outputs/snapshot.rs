//! Daily snapshot files.
//!
//! One scrape run per day is persisted as a pretty-printed JSON array of
//! [`Article`] named after the calendar date, next to a small metadata record
//! describing it:
//!
//! ```text
//! data_dir/
//! ├── news_2025-05-06.json        # [{"title", "url", "site", "time"}, ...]
//! ├── news_2025-05-06.meta.json   # {"date", "article_count", "fetched_at"}
//! └── news_2025-05-07.json
//! ```
//!
//! Snapshots are written once and never updated in place. Files from earlier
//! days are left alone.

use crate::models::Article;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot holds {found} articles but its metadata says {expected}")]
    CountMismatch { expected: usize, found: usize },
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Record written next to each snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotMeta {
    /// Calendar day the snapshot belongs to.
    pub date: NaiveDate,
    /// Number of articles in the snapshot.
    pub article_count: usize,
    /// When the scrape finished.
    pub fetched_at: DateTime<Utc>,
}

/// `news_<YYYY-MM-DD>.json`
pub fn snapshot_filename(date: NaiveDate) -> String {
    format!("news_{}.json", date.format("%Y-%m-%d"))
}

/// `news_<YYYY-MM-DD>.meta.json`
pub fn metadata_filename(date: NaiveDate) -> String {
    format!("news_{}.meta.json", date.format("%Y-%m-%d"))
}

/// Dated snapshot files inside one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(snapshot_filename(date))
    }

    pub fn metadata_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(metadata_filename(date))
    }

    /// Serialize `articles` to the snapshot for `date`, then its metadata record.
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    pub async fn write(
        &self,
        date: NaiveDate,
        articles: &[Article],
        fetched_at: DateTime<Utc>,
    ) -> Result<PathBuf, SnapshotError> {
        let path = self.snapshot_path(date);
        let json = serde_json::to_string_pretty(articles)?;
        fs::write(&path, json)
            .await
            .map_err(|e| SnapshotError::io(&path, e))?;

        let meta = SnapshotMeta {
            date,
            article_count: articles.len(),
            fetched_at,
        };
        let meta_path = self.metadata_path(date);
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)
            .await
            .map_err(|e| SnapshotError::io(&meta_path, e))?;

        info!(path = %path.display(), count = articles.len(), "Saved snapshot");
        Ok(path)
    }

    /// Deserialize a snapshot file into a flat article list.
    #[instrument(level = "info", skip(self))]
    pub async fn read(&self, path: &Path) -> Result<Vec<Article>, SnapshotError> {
        let data = fs::read(path)
            .await
            .map_err(|e| SnapshotError::io(path, e))?;
        let articles: Vec<Article> = serde_json::from_slice(&data)?;
        debug!(count = articles.len(), "Read snapshot");
        Ok(articles)
    }

    /// Read the metadata record for `date`.
    pub async fn read_meta(&self, date: NaiveDate) -> Result<SnapshotMeta, SnapshotError> {
        let path = self.metadata_path(date);
        let data = fs::read(&path)
            .await
            .map_err(|e| SnapshotError::io(&path, e))?;
        Ok(serde_json::from_slice(&data)?)
    }
}
