//! Livemint homepage scraper.

use super::{ExtractedLink, SourceExtractor, collect_anchors, compile_selectors};
use scraper::{Html, Selector};
use url::Url;

const SELECTORS: &[&str] = &["h2.imgStory a", "h3 a", ".story-card a", ".headline a", "h2 a"];

#[derive(Debug)]
pub struct Livemint {
    selectors: Vec<Selector>,
}

impl Livemint {
    pub fn new() -> Self {
        Self {
            selectors: compile_selectors(SELECTORS),
        }
    }
}

impl SourceExtractor for Livemint {
    // In-page anchors (`#comments`, `#`) are widgets, not stories.
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
        collect_anchors(document, base, &self.selectors, |href| !href.starts_with('#'))
    }
}
