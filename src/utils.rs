//! Small helpers for dates and the data directory.

use chrono::{Local, NaiveDate};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Today's calendar date in local time; snapshot names follow the local day.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and removes a
/// probe file. Called before scraping so an unwritable data directory fails
/// fast instead of after every site has been visited.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Data directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_writable_dir(&file).await.is_err());
    }
}
