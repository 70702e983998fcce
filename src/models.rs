//! Data models for scraped headlines and their grouped presentation.
//!
//! - [`Article`]: one headline row scraped from a site (also the snapshot record)
//! - [`GroupedView`]: articles organized by originating site, in first-seen order
//!
//! Neither type enforces identity: duplicate titles or URLs, within a site or
//! across sites, are kept as scraped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single headline as scraped from a site's table.
///
/// The field names are the snapshot file's JSON keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// Headline text, whitespace-trimmed.
    pub title: String,
    /// Link target of the headline.
    pub url: String,
    /// Name of the configured site this row came from.
    pub site: String,
    /// Site-supplied time text ("3 hours ago", "12万热度"...). Never parsed.
    pub time: String,
}

/// The articles of one site, in scrape (or file) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteGroup {
    pub site: String,
    pub articles: Vec<Article>,
}

/// Articles grouped by site.
///
/// Sites appear in the order their first article was seen; inside a group the
/// articles keep their relative order from the flat list. This is derived data
/// and is rebuilt from either a fresh scrape or a loaded snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedView {
    pub groups: Vec<SiteGroup>,
}

impl GroupedView {
    /// Total number of articles across all groups.
    pub fn article_count(&self) -> usize {
        self.groups.iter().map(|g| g.articles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Articles for a single site, if any were gathered.
    #[cfg(test)]
    pub fn site(&self, name: &str) -> Option<&[Article]> {
        self.groups
            .iter()
            .find(|g| g.site == name)
            .map(|g| g.articles.as_slice())
    }
}

/// Group a flat article list by site without sorting or deduplicating.
pub fn group_by_site<I>(articles: I) -> GroupedView
where
    I: IntoIterator<Item = Article>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<SiteGroup> = Vec::new();

    for article in articles {
        match index.get(&article.site) {
            Some(&i) => groups[i].articles.push(article),
            None => {
                index.insert(article.site.clone(), groups.len());
                groups.push(SiteGroup {
                    site: article.site.clone(),
                    articles: vec![article],
                });
            }
        }
    }

    GroupedView { groups }
}
