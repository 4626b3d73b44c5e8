//! Fetch, extract, dedup and classify across every configured source.
//!
//! A cycle is one sequential pass over the [`SourceRegistry`]:
//!
//! 1. **Seed**: load every previously accepted `(title, link)` into a [`DedupStore`]
//! 2. **Per source**: fetch the listing page; on failure log it and move on
//! 3. **Per candidate**: drop malformed ones, skip duplicates, classify, and
//!    route into accepted / relevant-but-excluded / dropped
//! 4. **Persist**: hand the accepted articles to the store as unsent
//!
//! The only fatal error is failing to seed, since running without dedup state
//! would re-accept old articles.

use crate::fetch::Fetch;
use crate::keywords::Classifier;
use crate::models::{AcceptedArticle, CandidateArticle, ExcludedArticle};
use crate::normalize::NormalizedKey;
use crate::pacer::PaceController;
use crate::scrapers::{Source, SourceRegistry};
use crate::store::{ArticleStore, InsertSummary, StoreError};
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Normalized titles and links already seen, persisted or accepted this cycle.
#[derive(Debug, Clone, Default)]
pub struct DedupStore {
    titles: HashSet<String>,
    links: HashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from raw `(title, link)` pairs, normalizing both.
    pub fn seeded<I, T, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, L)>,
        T: AsRef<str>,
        L: AsRef<str>,
    {
        let mut store = Self::new();
        for (title, link) in pairs {
            store.insert(NormalizedKey::of(title.as_ref(), link.as_ref()));
        }
        store
    }

    /// A key is a duplicate when either its title or its link was seen.
    pub fn contains(&self, key: &NormalizedKey) -> bool {
        self.titles.contains(&key.title) || self.links.contains(&key.link)
    }

    pub fn insert(&mut self, key: NormalizedKey) {
        self.titles.insert(key.title);
        self.links.insert(key.link);
    }

    pub fn title_count(&self) -> usize {
        self.titles.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

/// Counters for one source within a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    /// Raw candidates seen, malformed ones included.
    pub processed: usize,
    pub relevant: usize,
    pub duplicates: usize,
    pub excluded: usize,
    pub malformed: usize,
    /// Set when the page could not be fetched.
    pub fetch_error: Option<String>,
}

impl SourceStats {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }
}

/// Everything a cycle produced.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub scraped_date: NaiveDate,
    pub accepted: Vec<AcceptedArticle>,
    pub excluded: Vec<ExcludedArticle>,
    pub sources: Vec<SourceStats>,
    /// Store result; `None` when there was nothing to insert or the insert failed.
    pub inserted: Option<InsertSummary>,
}

impl CycleOutcome {
    /// Sum of all per-source counters.
    pub fn totals(&self) -> SourceStats {
        self.sources.iter().fold(SourceStats::new("total"), |mut acc, s| {
            acc.processed += s.processed;
            acc.relevant += s.relevant;
            acc.duplicates += s.duplicates;
            acc.excluded += s.excluded;
            acc.malformed += s.malformed;
            acc
        })
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceStats> {
        self.sources.iter().filter(|s| s.fetch_error.is_some())
    }
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("could not seed dedup state from the store: {0}")]
    Seed(#[source] StoreError),
}

/// Orchestrates fetch, extraction and classification over a registry.
pub struct Pipeline<'a, F> {
    registry: &'a SourceRegistry,
    fetcher: &'a F,
    classifier: &'a Classifier,
}

impl<'a, F> Pipeline<'a, F>
where
    F: Fetch,
{
    pub fn new(registry: &'a SourceRegistry, fetcher: &'a F, classifier: &'a Classifier) -> Self {
        Self {
            registry,
            fetcher,
            classifier,
        }
    }

    /// Run one full cycle: seed from `store`, scrape every source, persist.
    ///
    /// # Arguments
    ///
    /// * `store` - Supplies previously accepted articles and receives the new ones as unsent
    /// * `pacer` - Reset here, so batch counting always starts fresh for the cycle
    /// * `scraped_date` - Stamped on every accepted article
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Seed`] when the dedup state cannot be loaded. No
    /// source is fetched in that case. A failed insert is logged and leaves
    /// [`CycleOutcome::inserted`] as `None`.
    #[instrument(level = "info", skip_all, fields(%scraped_date))]
    pub async fn run_cycle<S: ArticleStore>(
        &self,
        store: &S,
        pacer: &mut PaceController,
        scraped_date: NaiveDate,
    ) -> Result<CycleOutcome, CycleError> {
        pacer.reset();
        let existing = store.existing_keys().await.map_err(|e| {
            error!(error = %e, "Dedup seeding failed; aborting cycle before any fetch");
            CycleError::Seed(e)
        })?;
        let dedup = DedupStore::seeded(existing);
        info!(
            titles = dedup.title_count(),
            links = dedup.link_count(),
            "Seeded dedup state"
        );

        let (mut outcome, _dedup) = self.scrape(dedup, pacer, scraped_date).await;

        if !outcome.accepted.is_empty() {
            match store.insert_unsent(&outcome.accepted).await {
                Ok(summary) => outcome.inserted = Some(summary),
                Err(e) => error!(
                    error = %e,
                    count = outcome.accepted.len(),
                    "Failed to persist accepted articles"
                ),
            }
        }
        Ok(outcome)
    }

    /// Traverse all sources against `dedup`, returning the outcome and the
    /// dedup state extended with everything accepted.
    pub async fn scrape(
        &self,
        mut dedup: DedupStore,
        pacer: &mut PaceController,
        scraped_date: NaiveDate,
    ) -> (CycleOutcome, DedupStore) {
        let mut outcome = CycleOutcome {
            scraped_date,
            ..CycleOutcome::default()
        };

        for (i, source) in self.registry.sources().iter().enumerate() {
            if i > 0 {
                pacer.between_sources().await;
            }
            let stats = self
                .scrape_source(source, &mut dedup, pacer, &mut outcome)
                .await;
            info!(
                source = %stats.source,
                processed = stats.processed,
                relevant = stats.relevant,
                duplicates = stats.duplicates,
                relevant_but_excluded = stats.excluded,
                malformed = stats.malformed,
                failed = stats.fetch_error.is_some(),
                "Source summary"
            );
            outcome.sources.push(stats);
        }

        (outcome, dedup)
    }

    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn scrape_source(
        &self,
        source: &Source,
        dedup: &mut DedupStore,
        pacer: &mut PaceController,
        outcome: &mut CycleOutcome,
    ) -> SourceStats {
        let mut stats = SourceStats::new(&source.name);

        let page = match self.fetcher.fetch(&source.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %source.url, error = %e, "Failed to fetch source; skipping");
                stats.fetch_error = Some(e.to_string());
                return stats;
            }
        };

        let candidates = source.extract(&page.html, &page.final_url);
        info!(count = candidates.len(), "Found raw candidates");

        for candidate in candidates {
            stats.processed += 1;
            self.process_candidate(candidate, dedup, pacer, outcome, &mut stats)
                .await;
        }
        stats
    }

    async fn process_candidate(
        &self,
        candidate: CandidateArticle,
        dedup: &mut DedupStore,
        pacer: &mut PaceController,
        outcome: &mut CycleOutcome,
        stats: &mut SourceStats,
    ) {
        if !candidate.is_well_formed() {
            stats.malformed += 1;
            return;
        }

        let key = NormalizedKey::of(&candidate.title, &candidate.link);
        if dedup.contains(&key) {
            stats.duplicates += 1;
            return;
        }

        let heading = candidate.title.trim().to_string();
        let classification = self.classifier.classify(&heading);

        if classification.is_excluded_despite_relevant() {
            let keyword = classification.excluded_by.unwrap_or_default();
            debug!(%heading, %keyword, "Relevant headline excluded");
            stats.excluded += 1;
            outcome.excluded.push(ExcludedArticle {
                website: candidate.source_name,
                heading,
                link: candidate.link,
                matched_exclusion: keyword,
                would_be: classification.category,
            });
            return;
        }

        if classification.is_relevant {
            stats.relevant += 1;
            outcome.accepted.push(AcceptedArticle {
                scraped_date: outcome.scraped_date,
                website: candidate.source_name,
                keyword: classification.category,
                heading,
                link: candidate.link,
            });
            dedup.insert(key);
            pacer.article_accepted().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, FetchedPage};
    use crate::models::Category;
    use crate::scrapers::{ExtractedLink, SourceExtractor};
    use crate::store::json::JsonFileStore;
    use scraper::{Html, Selector};
    use std::collections::HashMap;
    use url::Url;

    /// Serves canned HTML per URL; unknown URLs fail with the given status.
    struct FixtureFetcher {
        pages: HashMap<String, String>,
        failure_status: u16,
    }

    impl FixtureFetcher {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                failure_status: 503,
            }
        }

        fn page(mut self, url: &str, html: String) -> Self {
            self.pages.insert(url.to_string(), html);
            self
        }
    }

    impl Fetch for FixtureFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(FetchedPage {
                    final_url: url.clone(),
                    html: html.clone(),
                }),
                None => Err(FetchError::Status(self.failure_status)),
            }
        }
    }

    /// Every `<a>` on the page is a headline.
    struct AllAnchors;

    impl SourceExtractor for AllAnchors {
        fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
            let selector = Selector::parse("a").unwrap();
            document
                .select(&selector)
                .filter_map(|a| {
                    Some(ExtractedLink {
                        title: a.text().collect::<String>(),
                        link: base.join(a.value().attr("href")?).ok()?.to_string(),
                    })
                })
                .collect()
        }
    }

    fn page(items: &[(&str, &str)]) -> String {
        items
            .iter()
            .map(|(title, href)| format!(r#"<a href="{href}">{title}</a>"#))
            .collect()
    }

    fn registry(urls: &[(&str, &str)]) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for (name, url) in urls {
            registry.register(*name, Url::parse(url).unwrap(), AllAnchors);
        }
        registry
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_single_source() {
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[
                ("IPO launch of FirmX", "/1"),
                ("Cricket match today", "/2"),
                ("FirmY completes Merger with FirmZ", "/3"),
            ]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, _) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;

        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.accepted[0].keyword, Category::Ipo);
        assert_eq!(outcome.accepted[0].link, "https://a.example/1");
        assert_eq!(outcome.accepted[0].scraped_date, date());
        assert_eq!(outcome.accepted[1].keyword, Category::MergersAcquisitions);
        assert!(outcome.excluded.is_empty());

        let totals = outcome.totals();
        assert_eq!(totals.processed, 3);
        assert_eq!(totals.relevant, 2);
        assert_eq!(totals.duplicates, 0);
        assert_eq!(totals.excluded, 0);
    }

    #[tokio::test]
    async fn test_same_candidate_across_sources_accepted_once() {
        let registry = registry(&[("A", "https://a.example/"), ("B", "https://b.example/")]);
        let html = page(&[("FirmX files for IPO", "https://shared.example/ipo")]);
        let fetcher = FixtureFetcher::new()
            .page("https://a.example/", html.clone())
            .page("https://b.example/", html);
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, dedup) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].website, "A");
        assert_eq!(outcome.sources[1].duplicates, 1);
        assert_eq!(dedup.link_count(), 1);
        assert_eq!(pacer.source_pauses(), 1);
    }

    #[tokio::test]
    async fn test_near_duplicates_within_source() {
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[
                ("FirmX files for IPO", "/ipo"),
                ("  FIRMX   files for ipo ", "/other"),
                ("Totally different IPO headline", "/IPO#comments"),
            ]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, _) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.sources[0].duplicates, 2);
    }

    #[tokio::test]
    async fn test_seeded_state_suppresses_previous_articles() {
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[("FirmX files for IPO", "/ipo")]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);
        let dedup = DedupStore::seeded([("Old title", "HTTPS://A.EXAMPLE/ipo#top")]);

        let (outcome, _) = pipeline.scrape(dedup, &mut pacer, date()).await;
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.totals().duplicates, 1);
    }

    #[tokio::test]
    async fn test_relevant_but_excluded_is_reported() {
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[("Broadcaster Acquires Cricket league rights", "/x")]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, dedup) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.excluded.len(), 1);
        assert_eq!(outcome.excluded[0].matched_exclusion, "cricket");
        assert_eq!(outcome.excluded[0].would_be, Category::MergersAcquisitions);
        assert_eq!(outcome.totals().excluded, 1);
        assert_eq!(outcome.totals().relevant, 0);
        assert_eq!(dedup.title_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_candidates_are_counted_and_dropped() {
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[("IPO soon", "/short"), ("FirmX files for IPO", "/ok")]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, _) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;
        let stats = &outcome.sources[0];
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.relevant, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_only_that_source() {
        let registry = registry(&[
            ("Down", "https://down.example/"),
            ("Up", "https://up.example/"),
        ]);
        let fetcher = FixtureFetcher::new().page(
            "https://up.example/",
            page(&[("FirmX files for IPO", "/ipo")]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, _) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;
        assert_eq!(outcome.sources.len(), 2);
        assert_eq!(
            outcome.sources[0].fetch_error.as_deref(),
            Some("HTTP error status 503")
        );
        assert_eq!(outcome.sources[0].processed, 0);
        assert_eq!(outcome.failed_sources().count(), 1);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(pacer.source_pauses(), 1);
    }

    #[tokio::test]
    async fn test_batch_pauses_are_cycle_global() {
        let registry = registry(&[
            ("A", "https://a.example/"),
            ("B", "https://b.example/"),
            ("C", "https://c.example/"),
        ]);
        let items = |prefix: &str, n: usize| -> String {
            (0..n)
                .map(|i| format!(r#"<a href="/{prefix}/{i}">{prefix} Firm{i} files for IPO</a>"#))
                .collect()
        };
        let fetcher = FixtureFetcher::new()
            .page("https://a.example/", items("alpha", 8))
            .page("https://b.example/", items("beta", 8))
            .page("https://c.example/", items("gamma", 7));
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let (outcome, _) = pipeline.scrape(DedupStore::new(), &mut pacer, date()).await;
        assert_eq!(outcome.accepted.len(), 23);
        assert_eq!(pacer.batch_pauses(), 2);
        assert_eq!(pacer.source_pauses(), 2);
    }

    #[tokio::test]
    async fn test_run_cycle_seeds_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("articles.json"));
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[
                ("FirmX files for IPO", "/ipo"),
                ("FirmY Acquires FirmZ outright", "/ma"),
            ]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let first = pipeline.run_cycle(&store, &mut pacer, date()).await.unwrap();
        assert_eq!(first.accepted.len(), 2);
        assert_eq!(first.inserted.map(|s| s.inserted), Some(2));
        assert_eq!(store.unsent().await.unwrap().len(), 2);

        let second = pipeline.run_cycle(&store, &mut pacer, date()).await.unwrap();
        assert!(second.accepted.is_empty());
        assert_eq!(second.totals().duplicates, 2);
        assert!(second.inserted.is_none());
    }

    #[tokio::test]
    async fn test_run_cycle_starts_batch_count_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("articles.json"));
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[
                ("FirmX files for IPO", "/ipo"),
                ("FirmY Acquires FirmZ outright", "/ma"),
            ]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);
        for _ in 0..9 {
            pacer.article_accepted().await;
        }

        let outcome = pipeline.run_cycle(&store, &mut pacer, date()).await.unwrap();
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(pacer.accepted(), 2);
        assert_eq!(pacer.batch_pauses(), 0);
    }

    #[tokio::test]
    async fn test_run_cycle_aborts_when_seeding_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(&path, "corrupt").unwrap();
        let store = JsonFileStore::new(&path);
        let registry = registry(&[("A", "https://a.example/")]);
        let fetcher = FixtureFetcher::new().page(
            "https://a.example/",
            page(&[("FirmX files for IPO", "/ipo")]),
        );
        let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
        let mut pacer = PaceController::instant(10);

        let result = pipeline.run_cycle(&store, &mut pacer, date()).await;
        assert!(matches!(result, Err(CycleError::Seed(_))));
        assert_eq!(pacer.accepted(), 0);
    }
}
