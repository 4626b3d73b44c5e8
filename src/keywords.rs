//! Exact-word keyword matching and headline classification.
//!
//! A keyword matches only as a whole word, case-insensitively: `Merge` matches
//! "A and B Merge next year" but not "Submerged assets". Categories are tried
//! in [`Category::EVALUATION_ORDER`] and the first one with a match wins. The
//! exclusion vocabulary is consulted only once a headline is relevant, so it
//! acts as a list of noise words that override relevance, never as a general
//! irrelevance filter.

use crate::models::Category;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

const IPO_KEYWORDS: &[&str] = &["IPO", "Initial Public Offering"];

const MA_KEYWORDS: &[&str] = &[
    "M&A",
    "Merger & Acquisition",
    "Merged",
    "Acquired",
    "Merger",
    "Acquires",
    "Merge",
    "Acquisition",
    "Merges",
    "Acquiring",
    "Merging",
];

const DEMERGER_KEYWORDS: &[&str] = &[
    "Demerger",
    "Demerged",
    "Demerging",
    "Demerges",
    "Demerge",
    "Demergers",
    "Separate",
    "Separation",
    "Restructure",
    "Restructuring",
    "Restructures",
];

// Short generic tokens such as "Day" and "Open" are kept as-is, with the same
// whole-word semantics as every other entry.
const EXCLUSION_KEYWORDS: &[&str] = &[
    "advertisement",
    "ads",
    "sponsored",
    "promotion",
    "promo",
    "horoscope",
    "astrology",
    "cricket",
    "sports",
    "bollywood",
    "entertainment",
    "celebrity",
    "movie",
    "film",
    "weather",
    "obituary",
    "death",
    "died",
    "birthday",
    "anniversary",
    "fashion",
    "lifestyle",
    "travel",
    "food",
    "recipe",
    "health tips",
    "fitness",
    "yoga",
    "meditation",
    "games",
    "quiz",
    "contest",
    "giveaway",
    "discount",
    "offer",
    "sale",
    "shopping",
    "deals",
    "coupons",
    "Day",
    "Open",
];

fn keywords_for(category: Category) -> &'static [&'static str] {
    match category {
        Category::Ipo => IPO_KEYWORDS,
        Category::MergersAcquisitions => MA_KEYWORDS,
        Category::Demerger => DEMERGER_KEYWORDS,
        Category::Other => &[],
    }
}

fn word_pattern(keyword: &str) -> Option<Regex> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return None;
    }
    match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(%keyword, error = %e, "Skipping keyword that does not compile");
            None
        }
    }
}

/// An ordered keyword list compiled to whole-word matchers.
///
/// Blank entries are dropped when the list is compiled; list order is kept and
/// decides which synonym is reported when several match.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: Vec<(String, Regex)>,
}

impl Vocabulary {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let entries = keywords
            .iter()
            .filter_map(|k| word_pattern(k.as_ref()).map(|re| (k.as_ref().to_string(), re)))
            .collect();
        Self { entries }
    }
}

/// Find the first keyword of `vocabulary` that occurs in `text` as a whole word.
///
/// # Arguments
///
/// * `text` - Heading to search
/// * `vocabulary` - Compiled keyword list, searched in list order
///
/// # Returns
///
/// The matching keyword as configured, or `None` when nothing matches. Empty
/// text or an empty vocabulary never matches.
pub fn matches_any<'v>(text: &str, vocabulary: &'v Vocabulary) -> Option<&'v str> {
    if text.is_empty() {
        return None;
    }
    vocabulary
        .entries
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(keyword, _)| keyword.as_str())
}

/// Outcome of classifying a single heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Relevant and not excluded: the heading should be accepted.
    pub is_relevant: bool,
    /// Matched category, or [`Category::Other`] when nothing matched.
    pub category: Category,
    /// Exclusion keyword that suppressed an otherwise relevant heading.
    pub excluded_by: Option<String>,
}

impl Classification {
    pub fn is_excluded_despite_relevant(&self) -> bool {
        self.excluded_by.is_some()
    }
}

/// Category vocabularies plus the global exclusion vocabulary.
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<(Category, Vocabulary)>,
    exclusions: Vocabulary,
}

static STANDARD: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(
        Category::EVALUATION_ORDER
            .iter()
            .map(|&c| (c, Vocabulary::new(keywords_for(c))))
            .collect(),
        Vocabulary::new(EXCLUSION_KEYWORDS),
    )
});

impl Classifier {
    pub fn new(categories: Vec<(Category, Vocabulary)>, exclusions: Vocabulary) -> Self {
        Self {
            categories,
            exclusions,
        }
    }

    /// The built-in IPO / M&A / Demerger vocabulary with the standard exclusions.
    pub fn standard() -> &'static Classifier {
        &STANDARD
    }

    /// Classify a heading against the category vocabularies, then the exclusions.
    ///
    /// # Returns
    ///
    /// A [`Classification`] that is either accepted (`is_relevant`), relevant
    /// but excluded (`excluded_by` set, `category` kept), or irrelevant
    /// (`category` is [`Category::Other`]).
    pub fn classify(&self, heading: &str) -> Classification {
        let Some(category) = self
            .categories
            .iter()
            .find(|(_, vocab)| matches_any(heading, vocab).is_some())
            .map(|(category, _)| *category)
        else {
            return Classification {
                is_relevant: false,
                category: Category::Other,
                excluded_by: None,
            };
        };

        match matches_any(heading, &self.exclusions) {
            Some(keyword) => Classification {
                is_relevant: false,
                category,
                excluded_by: Some(keyword.to_string()),
            },
            None => Classification {
                is_relevant: true,
                category,
                excluded_by: None,
            },
        }
    }
}
