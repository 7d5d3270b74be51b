//! Keyword filter for feed entries.

/// Decide whether an entry is published.
///
/// Without keywords everything passes. Otherwise the entry passes when any
/// non-blank keyword occurs, case-insensitively, in the title or content.
pub fn include(title: &str, content: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }

    let text = format!("{title} {content}").to_lowercase();
    keywords
        .iter()
        .map(|keyword| keyword.trim())
        .filter(|keyword| !keyword.is_empty())
        .any(|keyword| text.contains(&keyword.to_lowercase()))
}
