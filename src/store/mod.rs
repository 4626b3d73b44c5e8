//! Storage collaborator for accepted articles.
//!
//! The pipeline needs two things from storage: every previously accepted
//! `(title, link)` pair to seed dedup, and a place to put new articles flagged
//! unsent. The digest needs the unsent rows and a way to flip them to sent.
//!
//! - [`ArticleStore`]: The trait both sides program against
//! - [`json::JsonFileStore`]: A single JSON document on disk

use crate::models::{AcceptedArticle, StoredArticle};
use thiserror::Error;

pub mod json;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store contents are not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid record: {0}")]
    Record(String),
}

/// Per-record results of a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: usize,
    /// Already present (same normalized title or link); left untouched.
    pub skipped: usize,
    pub failed: usize,
}

pub trait ArticleStore {
    /// All `(title, link)` pairs accepted so far.
    async fn existing_keys(&self) -> Result<Vec<(String, String)>, StoreError>;

    /// Insert new articles with `sent = false`, in order.
    ///
    /// A record that fails is counted and the remaining records are still
    /// attempted. Re-inserting an existing article is skipped, not an error.
    async fn insert_unsent(&self, articles: &[AcceptedArticle]) -> Result<InsertSummary, StoreError>;

    /// Articles not yet delivered by the digest, in insertion order.
    async fn unsent(&self) -> Result<Vec<StoredArticle>, StoreError>;

    /// Flag exactly `ids` as sent; returns how many rows changed.
    async fn mark_sent(&self, ids: &[u64]) -> Result<usize, StoreError>;
}
