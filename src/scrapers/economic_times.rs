//! Economic Times homepage scraper.

use super::{ExtractedLink, SourceExtractor, collect_anchors, compile_selectors};
use scraper::{Html, Selector};
use url::Url;

const SELECTORS: &[&str] = &["article a", ".story-card a", "h2 a", "h3 a", ".eachStory a"];

#[derive(Debug)]
pub struct EconomicTimes {
    selectors: Vec<Selector>,
}

impl EconomicTimes {
    pub fn new() -> Self {
        Self {
            selectors: compile_selectors(SELECTORS),
        }
    }
}

impl SourceExtractor for EconomicTimes {
    // Share and bookmark widgets are `javascript:` anchors inside story cards.
    fn extract(&self, document: &Html, base: &Url) -> Vec<ExtractedLink> {
        collect_anchors(document, base, &self.selectors, |href| {
            !href.to_ascii_lowercase().starts_with("javascript:")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_javascript_links() {
        let html = r#"
            <div class="eachStory">
                <a href="/markets/ipos/fpos/firmx-ipo/articleshow/1.cms">FirmX IPO opens for bidding</a>
                <a href="javascript:void(0)">Share this story now</a>
                <a href="JavaScript:bookmark()">Bookmark this story</a>
            </div>
        "#;
        let base = Url::parse("https://economictimes.indiatimes.com/").unwrap();
        let links = EconomicTimes::new().extract(&Html::parse_document(html), &base);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].link,
            "https://economictimes.indiatimes.com/markets/ipos/fpos/firmx-ipo/articleshow/1.cms"
        );
    }

    #[test]
    fn test_story_in_article_and_heading_is_listed_twice() {
        let html = r#"<article><h3><a href="/a.cms">Merger talks between FirmA and FirmB</a></h3></article>"#;
        let base = Url::parse("https://economictimes.indiatimes.com/").unwrap();
        let links = EconomicTimes::new().extract(&Html::parse_document(html), &base);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], links[1]);
    }
}
