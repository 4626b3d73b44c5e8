//! ZeeBiz scrapers for the homepage and the economy topic page.
//!
//! Both pages share a template family but the economy listing renders its
//! headlines as `a.swdetl-mrgn0`, so each variant carries its own selectors.

use super::{ExtractedLink, SourceExtractor, collect_anchors, compile_selectors};
use scraper::{Html, Selector};
use url::Url;

const ECONOMY_SELECTORS: &[&str] = &["a.swdetl-mrgn0", ".story-title a", "h2 a", "h3 a"];
const GENERAL_SELECTORS: &[&str] = &["h3 a", "h2 a", ".story-title a", ".news-title a"];

#[derive(Debug)]
pub struct ZeeBiz {
    selectors: Vec<Selector>,
}

impl ZeeBiz {
    /// Extractor for <https://www.zeebiz.com/topics/economy>.
    pub fn economy() -> Self {
        Self {
            selectors: compile_selectors(ECONOMY_SELECTORS),
        }
    }

    /// Extractor for the <https://www.zeebiz.com/> homepage.
    pub fn general() -> Self {
        Self {
            selectors: compile_selectors(GENERAL_SELECTORS),
        }
    }
}

impl SourceExtractor for ZeeBiz {
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
        collect_anchors(document, base, &self.selectors, |_| true)
    }
}
