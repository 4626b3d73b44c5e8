//! Per-site headline extractors and the source registry.
//!
//! Every news site gets its own adapter implementing [`SourceExtractor`]. An
//! adapter runs several CSS selectors over the same page and keeps the union of
//! everything they match, since different selectors cover different regions of
//! a page. Duplicates at this stage are expected; the pipeline removes them.
//!
//! # Supported Sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | MoneyControl | [`moneycontrol`] | News listing page |
//! | ZeeBiz Economy | [`zeebiz`] | Economy topic page, own selector set |
//! | ZeeBiz | [`zeebiz`] | Homepage |
//! | Economic Times | [`economic_times`] | Drops `javascript:` links |
//! | MNA Critique | [`mna_critique`] | WordPress entry titles |
//! | Entrackr | [`entrackr`] | Headings nested in links are supported |
//! | Livemint | [`livemint`] | Drops fragment-only links |
//!
//! New sources are added by writing an adapter and registering it in
//! [`SourceRegistry::standard`]; the pipeline never changes.

use crate::models::CandidateArticle;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

pub mod economic_times;
pub mod entrackr;
pub mod livemint;
pub mod mna_critique;
pub mod moneycontrol;
pub mod zeebiz;

/// A `(title, link)` pair found on a page, link already absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub title: String,
    pub link: String,
}

/// Finds headline-like elements on a parsed page and resolves their links.
pub trait SourceExtractor {
    /// Extract every headline candidate from `document`, resolving relative
    /// links against `base`. Selectors that match nothing contribute nothing.
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink>;
}

/// Compile a list of CSS selectors, logging and skipping any that fail to parse.
pub(crate) fn compile_selectors(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(selector = %s, error = %e, "Invalid CSS selector; skipping");
                None
            }
        })
        .collect()
}

/// Visible text of an element with whitespace runs collapsed to one space.
fn visible_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Explicit `title` attribute when present and non-blank, else the visible text.
pub(crate) fn title_of(element: &ElementRef<'_>) -> String {
    element
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| visible_text(element))
}

/// Resolve `href` against `base`. Blank hrefs and unparsable joins yield `None`.
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// Build an [`ExtractedLink`] when both the title and resolved link are non-empty.
pub(crate) fn link_from(title: String, base: &Url, href: &str) -> Option<ExtractedLink> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return None;
    }
    resolve_link(base, href).map(|link| ExtractedLink { title, link })
}

/// Union of anchor matches over `selectors`, in selector order.
///
/// `keep_href` lets an adapter reject hrefs it knows are not articles.
pub(crate) fn collect_anchors(
    document: &Html,
    base: &Url,
    selectors: &[Selector],
    keep_href: impl Fn(&str) -> bool,
) -> Vec<ExtractedLink> {
    let mut links = Vec::new();
    for selector in selectors {
        for element in document.select(selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if !keep_href(href.trim()) {
                continue;
            }
            if let Some(link) = link_from(title_of(&element), base, href) {
                links.push(link);
            }
        }
    }
    links
}

/// A configured news site: its name, listing URL and extractor.
pub struct Source {
    pub name: String,
    pub url: Url,
    extractor: Box<dyn SourceExtractor>,
}

impl Source {
    pub fn new(name: impl Into<String>, url: Url, extractor: Box<dyn SourceExtractor>) -> Self {
        Self {
            name: name.into(),
            url,
            extractor,
        }
    }

    /// Parse `html` and extract candidates tagged with this source's name.
    ///
    /// # Arguments
    ///
    /// * `html` - Raw listing page body
    /// * `base` - URL the page was actually served from (after redirects), used
    ///   to resolve relative links
    ///
    /// # Returns
    ///
    /// Candidates in selector order. Duplicates across selectors are kept;
    /// the pipeline's dedup step removes them.
    #[instrument(level = "debug", skip_all, fields(source = %self.name))]
    pub fn extract(&self, html: &str, base: &Url) -> Vec<CandidateArticle> {
        let document = Html::parse_document(html);
        let candidates: Vec<CandidateArticle> = self
            .extractor
            .extract(&document, base)
            .into_iter()
            .map(|l| CandidateArticle {
                source_name: self.name.clone(),
                title: l.title,
                link: l.link,
            })
            .collect();
        debug!(count = candidates.len(), "Extracted candidates");
        candidates
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .finish()
    }
}

/// Ordered list of sources traversed by a scraping cycle.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; sources are visited in registration order.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        url: Url,
        extractor: impl SourceExtractor + 'static,
    ) -> &mut Self {
        self.sources.push(Source::new(name, url, Box::new(extractor)));
        self
    }

    /// The built-in set of Indian financial news sites.
    ///
    /// # Errors
    ///
    /// Returns a [`url::ParseError`] if one of the built-in source URLs does
    /// not parse.
    pub fn standard() -> Result<Self, url::ParseError> {
        let mut registry = Self::new();
        registry
            .register(
                "MoneyControl",
                Url::parse("https://www.moneycontrol.com/news")?,
                moneycontrol::MoneyControl::new(),
            )
            .register(
                "ZeeBiz Economy",
                Url::parse("https://www.zeebiz.com/topics/economy")?,
                zeebiz::ZeeBiz::economy(),
            )
            .register(
                "ZeeBiz",
                Url::parse("https://www.zeebiz.com/")?,
                zeebiz::ZeeBiz::general(),
            )
            .register(
                "Economic Times",
                Url::parse("https://economictimes.indiatimes.com/")?,
                economic_times::EconomicTimes::new(),
            )
            .register(
                "MNA Critique",
                Url::parse("https://mnacritique.mergersindia.com/news-category/national-news/")?,
                mna_critique::MnaCritique::new(),
            )
            .register(
                "Entrackr",
                Url::parse("https://entrackr.com/")?,
                entrackr::Entrackr::new(),
            )
            .register(
                "Livemint",
                Url::parse("https://www.livemint.com/")?,
                livemint::Livemint::new(),
            );
        Ok(registry)
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
