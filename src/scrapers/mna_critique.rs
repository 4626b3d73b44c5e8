//! MNA Critique national news category scraper.
//!
//! A WordPress site; every post title is an `.entry-title` heading with a link.

use super::{ExtractedLink, SourceExtractor, collect_anchors, compile_selectors};
use scraper::{Html, Selector};
use url::Url;

// A single selector group, so a title matched by both parts is reported once.
const SELECTORS: &[&str] = &["h2.entry-title a, .entry-title a"];

#[derive(Debug)]
pub struct MnaCritique {
    selectors: Vec<Selector>,
}

impl MnaCritique {
    pub fn new() -> Self {
        Self {
            selectors: compile_selectors(SELECTORS),
        }
    }
}

impl SourceExtractor for MnaCritique {
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
        collect_anchors(document, base, &self.selectors, |_| true)
    }
}
