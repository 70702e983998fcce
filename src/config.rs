//! Site configuration: which pages to visit and how to read their tables.
//!
//! The list is injected into the scraper. It comes either from the built-in
//! defaults ([`SiteList::default`]) or from a YAML file passed with `--sites`:
//!
//! ```yaml
//! allowed_domains: [tophub.today]
//! sites:
//!   - name: 36氪
//!     url: https://tophub.today/n/Q1Vd5Ko85R
//!     title_path: td.al a
//!     link_path: td.al a
//!     time_path: td:nth-child(3)
//! ```
//!
//! Every selector is compiled when the file is loaded, so a typo fails at
//! startup rather than silently yielding zero rows.

use crate::scrapers::tophub::SiteSelectors;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Rows of the aggregator's ranking table.
pub const DEFAULT_ROW_PATH: &str = "table.table tbody tr";

const DEFAULT_TITLE_PATH: &str = "td.al a";
const DEFAULT_LINK_PATH: &str = "td.al a";
const DEFAULT_TIME_PATH: &str = "td:nth-child(3)";
const DEFAULT_DOMAIN: &str = "tophub.today";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read site file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse site file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid site configuration: {0}")]
    Invalid(String),
}

/// One target page plus the selector paths used to pull rows out of it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Display name; becomes [`Article::site`](crate::models::Article::site).
    pub name: String,
    /// Page to visit.
    pub url: String,
    /// Selector (relative to a row) whose text is the headline.
    pub title_path: String,
    /// Selector (relative to a row) whose `href` is the link.
    pub link_path: String,
    /// Selector (relative to a row) whose text is the time column.
    pub time_path: String,
    /// Selector for the rows themselves.
    #[serde(default = "default_row_path")]
    pub row_path: String,
}

fn default_row_path() -> String {
    DEFAULT_ROW_PATH.to_string()
}

fn default_allowed_domains() -> Vec<String> {
    vec![DEFAULT_DOMAIN.to_string()]
}

impl SiteConfig {
    /// A site using the aggregator's standard table layout.
    pub fn tophub(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            title_path: DEFAULT_TITLE_PATH.to_string(),
            link_path: DEFAULT_LINK_PATH.to_string(),
            time_path: DEFAULT_TIME_PATH.to_string(),
            row_path: default_row_path(),
        }
    }
}

/// The ordered site list and the hosts the scraper may contact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteList {
    /// Hosts (and their subdomains) requests may go to. Empty allows any host.
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,
    /// Sites in visit order.
    pub sites: Vec<SiteConfig>,
}

impl Default for SiteList {
    fn default() -> Self {
        Self {
            allowed_domains: default_allowed_domains(),
            sites: vec![
                SiteConfig::tophub("36氪", "https://tophub.today/n/Q1Vd5Ko85R"),
                SiteConfig::tophub("少数派", "https://tophub.today/n/Y2KeDGQdNP"),
                SiteConfig::tophub("虎嗅网", "https://tophub.today/n/5VaobgvAj1"),
                SiteConfig::tophub("掘金", "https://tophub.today/n/QaqeEaVe9R"),
                SiteConfig::tophub("机器之心", "https://tophub.today/n/5VaobgvAj1"),
                SiteConfig::tophub("AI新智界", "https://tophub.today/n/EZ7jl0X9kO"),
            ],
        }
    }
}

impl SiteList {
    /// Parse a YAML site list and validate it.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let list: SiteList = serde_yaml::from_str(text)?;
        list.validate()?;
        Ok(list)
    }

    /// Check that the list is usable: non-empty, named, and every selector compiles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid("site list is empty".to_string()));
        }
        for site in &self.sites {
            if site.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "site with url {} has no name",
                    site.url
                )));
            }
            url::Url::parse(&site.url).map_err(|e| {
                ConfigError::Invalid(format!("site {}: bad url {}: {}", site.name, site.url, e))
            })?;
            SiteSelectors::compile(site)
                .map_err(|e| ConfigError::Invalid(format!("site {}: {}", site.name, e)))?;
        }
        Ok(())
    }
}

/// Load the site list from `path`, or fall back to the built-in defaults.
#[instrument(level = "info")]
pub async fn load_sites(path: Option<&Path>) -> Result<SiteList, ConfigError> {
    let list = match path {
        Some(path) => {
            let text = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            SiteList::from_yaml(&text)?
        }
        None => SiteList::default(),
    };
    info!(
        sites = list.sites.len(),
        allowed_domains = ?list.allowed_domains,
        "Loaded site configuration"
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_list_is_valid() {
        let list = SiteList::default();
        assert_eq!(list.sites.len(), 6);
        assert_eq!(list.sites[0].name, "36氪");
        assert_eq!(list.allowed_domains, vec!["tophub.today".to_string()]);
        list.validate().unwrap();
    }

    #[test]
    fn test_yaml_defaults_row_path_and_domains() {
        let yaml = r#"
sites:
  - name: Example
    url: https://tophub.today/n/abc
    title_path: td.al a
    link_path: td.al a
    time_path: td:nth-child(3)
"#;
        let list = SiteList::from_yaml(yaml).unwrap();
        assert_eq!(list.sites[0].row_path, DEFAULT_ROW_PATH);
        assert_eq!(list.allowed_domains, vec!["tophub.today".to_string()]);
    }

    #[test]
    fn test_yaml_keeps_order() {
        let yaml = r#"
allowed_domains: []
sites:
  - { name: B, url: "https://b.example/", title_path: a, link_path: a, time_path: span }
  - { name: A, url: "https://a.example/", title_path: a, link_path: a, time_path: span, row_path: li }
"#;
        let list = SiteList::from_yaml(yaml).unwrap();
        let names: Vec<_> = list.sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(list.sites[1].row_path, "li");
        assert!(list.allowed_domains.is_empty());
    }

    #[test]
    fn test_yaml_rejects_bad_selector() {
        let yaml = r#"
sites:
  - { name: X, url: "https://tophub.today/", title_path: "td[[", link_path: a, time_path: span }
"#;
        let err = SiteList::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_yaml_rejects_empty_list() {
        let err = SiteList::from_yaml("sites: []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_yaml_rejects_bad_url() {
        let yaml = r#"
sites:
  - { name: X, url: "not a url", title_path: a, link_path: a, time_path: span }
"#;
        assert!(matches!(
            SiteList::from_yaml(yaml).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn test_load_sites_without_path_uses_defaults() {
        let list = load_sites(None).await.unwrap();
        assert_eq!(list, SiteList::default());
    }

    #[tokio::test]
    async fn test_load_sites_missing_file() {
        let err = load_sites(Some(Path::new("/definitely/not/here.yaml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
