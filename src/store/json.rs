//! JSON file implementation of [`ArticleStore`].
//!
//! # File Layout
//!
//! ```text
//! {
//!   "next_id": 3,
//!   "articles": [
//!     { "id": 1, "scraped_date": "2025-05-06", "website": "Livemint",
//!       "keyword": "IPO", "title": "...", "link": "...",
//!       "sent": false, "inserted_at": "2025-05-06T09:30:00Z" },
//!     ...
//!   ]
//! }
//! ```
//!
//! A missing file is an empty store. Every write replaces the file atomically
//! through a sibling temp file and a rename.

use super::{ArticleStore, InsertSummary, StoreError};
use crate::models::{AcceptedArticle, StoredArticle};
use crate::normalize::{normalize_link, normalize_title};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    articles: Vec<StoredArticle>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<StoreFile, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(StoreFile::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(file)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn validate(article: &AcceptedArticle) -> Result<(), StoreError> {
    if article.heading.trim().is_empty() {
        return Err(StoreError::Record("empty heading".to_string()));
    }
    if article.link.trim().is_empty() {
        return Err(StoreError::Record("empty link".to_string()));
    }
    Ok(())
}

impl ArticleStore for JsonFileStore {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn existing_keys(&self) -> Result<Vec<(String, String)>, StoreError> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        info!(count = file.articles.len(), "Loaded existing articles");
        Ok(file
            .articles
            .into_iter()
            .map(|a| (a.title, a.link))
            .collect())
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = articles.len()))]
    async fn insert_unsent(&self, articles: &[AcceptedArticle]) -> Result<InsertSummary, StoreError> {
        let mut summary = InsertSummary::default();
        if articles.is_empty() {
            return Ok(summary);
        }

        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let mut titles: HashSet<String> = file.articles.iter().map(|a| normalize_title(&a.title)).collect();
        let mut links: HashSet<String> = file.articles.iter().map(|a| normalize_link(&a.link)).collect();

        for article in articles {
            if let Err(e) = validate(article) {
                warn!(heading = %article.heading, error = %e, "Failed to insert article");
                summary.failed += 1;
                continue;
            }
            let title = normalize_title(&article.heading);
            let link = normalize_link(&article.link);
            if titles.contains(&title) || links.contains(&link) {
                summary.skipped += 1;
                continue;
            }

            file.next_id = file.next_id.max(1);
            file.articles.push(StoredArticle {
                id: file.next_id,
                scraped_date: article.scraped_date,
                website: article.website.clone(),
                keyword: article.keyword,
                title: article.heading.clone(),
                link: article.link.clone(),
                sent: false,
                inserted_at: Utc::now(),
            });
            file.next_id += 1;
            titles.insert(title);
            links.insert(link);
            summary.inserted += 1;
        }

        if summary.inserted > 0 {
            self.save(&file).await?;
        }
        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            failed = summary.failed,
            "Insertion complete"
        );
        Ok(summary)
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn unsent(&self) -> Result<Vec<StoredArticle>, StoreError> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;
        Ok(file.articles.into_iter().filter(|a| !a.sent).collect())
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = ids.len()))]
    async fn mark_sent(&self, ids: &[u64]) -> Result<usize, StoreError> {
        let ids: HashSet<u64> = ids.iter().copied().collect();
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let mut changed = 0;
        for article in file.articles.iter_mut() {
            if !article.sent && ids.contains(&article.id) {
                article.sent = true;
                changed += 1;
            }
        }
        if changed > 0 {
            self.save(&file).await?;
        }
        Ok(changed)
    }
}
