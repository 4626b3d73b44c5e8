//! Data models for scraped headlines and their classified representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`CandidateArticle`]: Raw `(title, link)` pair pulled out of a source page
//! - [`Category`]: The business-event vocabulary an article is classified under
//! - [`AcceptedArticle`]: A candidate that survived dedup, relevance and exclusion
//! - [`ExcludedArticle`]: A relevant candidate suppressed by an exclusion keyword
//! - [`StoredArticle`]: An accepted article as persisted, with its `sent` flag

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of characters a trimmed title needs to be considered.
pub const MIN_TITLE_CHARS: usize = 10;

/// A headline as extracted from a source page, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateArticle {
    /// Name of the configured source the headline came from.
    pub source_name: String,
    /// Title attribute or visible text of the element.
    pub title: String,
    /// Absolute URL of the article.
    pub link: String,
}

impl CandidateArticle {
    /// A candidate needs a title of at least [`MIN_TITLE_CHARS`] characters and a link.
    pub fn is_well_formed(&self) -> bool {
        self.title.trim().chars().count() >= MIN_TITLE_CHARS && !self.link.trim().is_empty()
    }
}

/// Business-event categories, declared in evaluation order.
///
/// `Other` is never matched by a keyword; it marks irrelevant headlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "IPO")]
    Ipo,
    #[serde(rename = "M&A")]
    MergersAcquisitions,
    #[serde(rename = "Demerger")]
    Demerger,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    /// Categories backed by a keyword list, in the order they are evaluated.
    pub const EVALUATION_ORDER: [Category; 3] = [
        Category::Ipo,
        Category::MergersAcquisitions,
        Category::Demerger,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Ipo => "IPO",
            Category::MergersAcquisitions => "M&A",
            Category::Demerger => "Demerger",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A headline accepted by the pipeline, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedArticle {
    /// Date the cycle started (not the fetch time of the article).
    pub scraped_date: NaiveDate,
    pub website: String,
    pub keyword: Category,
    pub heading: String,
    pub link: String,
}

/// A headline that matched a category but was suppressed by an exclusion keyword.
///
/// Kept only so operators can audit the exclusion vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedArticle {
    pub website: String,
    pub heading: String,
    pub link: String,
    /// The exclusion keyword that matched first.
    pub matched_exclusion: String,
    /// The category the headline would have been filed under.
    pub would_be: Category,
}

/// An accepted article as kept by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: u64,
    pub scraped_date: NaiveDate,
    pub website: String,
    pub keyword: Category,
    pub title: String,
    pub link: String,
    /// Flipped to `true` by the digest once the article has been mailed.
    pub sent: bool,
    pub inserted_at: DateTime<Utc>,
}
