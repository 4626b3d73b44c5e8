//! MoneyControl news listing scraper.
//!
//! The listing at <https://www.moneycontrol.com/news> mixes card grids and
//! plain headline lists, so several selectors are unioned.

use super::{ExtractedLink, SourceExtractor, collect_anchors, compile_selectors};
use scraper::{Html, Selector};
use url::Url;

const SELECTORS: &[&str] = &[
    "div.item a",
    "h2 a",
    "h3 a",
    ".news-item a",
    ".story-card a",
];

#[derive(Debug)]
pub struct MoneyControl {
    selectors: Vec<Selector>,
}

impl MoneyControl {
    pub fn new() -> Self {
        Self {
            selectors: compile_selectors(SELECTORS),
        }
    }
}

impl SourceExtractor for MoneyControl {
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
        collect_anchors(document, base, &self.selectors, |_| true)
    }
}
