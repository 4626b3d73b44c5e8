//! Entrackr homepage scraper.
//!
//! Entrackr wraps some headings in links (`a > h2`) and some links in headings
//! (`h2 > a`). For the former the heading text is the title and the link comes
//! from the nearest enclosing anchor. Either way an explicit `title`
//! attribute on the matched element wins over its text.

use super::{ExtractedLink, SourceExtractor, compile_selectors, link_from, title_of};
use scraper::{ElementRef, Html, Selector};
use url::Url;

const SELECTORS: &[&str] = &["h2 a", "h3 a", "a h2", "a h3", ".post-title a"];

#[derive(Debug)]
pub struct Entrackr {
    selectors: Vec<Selector>,
}

impl Entrackr {
    pub fn new() -> Self {
        Self {
            selectors: compile_selectors(SELECTORS),
        }
    }
}

fn enclosing_anchor<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a")
}

impl SourceExtractor for Entrackr {
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
        let mut links = Vec::new();
        for selector in &self.selectors {
            for element in document.select(selector) {
                let anchor = if element.value().name() == "a" {
                    Some(element)
                } else {
                    enclosing_anchor(&element)
                };
                let Some(href) = anchor.and_then(|a| a.value().attr("href")) else {
                    continue;
                };
                if let Some(link) = link_from(title_of(&element), base, href) {
                    links.push(link);
                }
            }
        }
        links
    }
}
