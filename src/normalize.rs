//! Canonical forms of article titles and links used as dedup keys.
//!
//! The same functions are applied to rows loaded from the store and to fresh
//! candidates, so both sides compare bit-for-bit.

/// Trim, collapse interior whitespace runs to a single space and lowercase.
pub fn normalize_title(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim, cut everything from the first `#` and lowercase.
pub fn normalize_link(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    without_fragment.trim().to_lowercase()
}

/// The pair of normalized forms that identifies an article for dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    pub title: String,
    pub link: String,
}

impl NormalizedKey {
    pub fn of(title: &str, link: &str) -> Self {
        Self {
            title: normalize_title(title),
            link: normalize_link(link),
        }
    }
}
