//! Numbered item extraction from entry bodies.
//!
//! The feed posts its daily list as `N/ text – <a href="url">source</a>`
//! fragments separated by `<br>`. Dates are stripped before matching because
//! `6/25`-style dates would otherwise read as ordinals.

use regex::Regex;
use std::sync::LazyLock;

use crate::rss::types::ExtractedItem;

static LINE_BREAK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

// `2025.6.25`, `25-6-25`, `2025/ 6/25`
static FULL_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,4}[.\-/]\s*\d{1,2}[.\-/]\d{1,2}").unwrap());

// `6/24/25/` range dates embedded mid-sentence
static RANGE_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}[.\-/]\s*\d{1,2}/\d{1,2}/").unwrap());

static LINKED_ITEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([1-9][0-9]?)/\s*([^–]+)–\s*<a href="([^"]+)"[^>]*>source</a>"#).unwrap()
});

static PLAIN_ITEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([1-9][0-9]?)/\s*([^–\n]+)").unwrap());

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Replace HTML line breaks with newlines.
pub fn normalize_line_breaks(body: &str) -> String {
    LINE_BREAK_PATTERN.replace_all(body, "\n").into_owned()
}

/// Remove date patterns wherever they occur.
///
/// This is a heuristic: anything shaped like a date is dropped, including
/// numbers that only look like one.
pub fn strip_dates(text: &str) -> String {
    let text = FULL_DATE_PATTERN.replace_all(text, "");
    RANGE_DATE_PATTERN.replace_all(&text, "").into_owned()
}

/// Extract the numbered items of an entry body in source order.
///
/// Linked fragments are preferred; when none match, fragments without a
/// source link are accepted. Returns an empty list when neither matches.
pub fn extract(body: &str) -> Vec<ExtractedItem> {
    let text = strip_dates(&normalize_line_breaks(body));

    let linked: Vec<ExtractedItem> = LINKED_ITEM_PATTERN
        .captures_iter(&text)
        .filter_map(|caps| {
            Some(ExtractedItem {
                ordinal: caps[1].parse().ok()?,
                text: caps[2].trim().to_string(),
                link: Some(caps[3].to_string()),
            })
        })
        .collect();
    if !linked.is_empty() {
        return linked;
    }

    PLAIN_ITEM_PATTERN
        .captures_iter(&text)
        .filter_map(|caps| {
            Some(ExtractedItem {
                ordinal: caps[1].parse().ok()?,
                text: caps[2].trim().to_string(),
                link: None,
            })
        })
        .collect()
}

/// Strip all markup tags.
pub fn strip_tags(body: &str) -> String {
    TAG_PATTERN.replace_all(body, "").into_owned()
}

/// Plain-text rendering for bodies without numbered items: tags stripped,
/// clipped to `max_chars` characters with `...` appended when clipped.
pub fn plain_text_fallback(body: &str, max_chars: usize) -> String {
    let text = strip_tags(body);
    if text.chars().count() <= max_chars {
        text
    } else {
        let clipped: String = text.chars().take(max_chars).collect();
        format!("{clipped}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY_BODY: &str = concat!(
        "SoSoValue 2025.6.25<br>",
        "1/ Bitcoin breaks 110k – <a href=\"https://example.com/1\" rel=\"nofollow\">source</a><br>",
        "2/ ETH ETF sees inflows – <a href=\"https://example.com/2\">source</a><br/>",
        "3/ SEC delays decision – <a href=\"https://example.com/3\">source</a>"
    );

    #[test]
    fn test_normalize_line_breaks() {
        assert_eq!(normalize_line_breaks("a<br>b<br/>c<BR />d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_strip_full_dates() {
        assert_eq!(strip_dates("Report 2025.6.25 out"), "Report  out");
        assert_eq!(strip_dates("on 25-06-24 today"), "on  today");
        assert_eq!(strip_dates("2025/ 6/5"), "");
    }

    #[test]
    fn test_strip_range_dates() {
        assert_eq!(strip_dates("from 6/24/25/ onwards"), "from  onwards");
    }

    #[test]
    fn test_strip_dates_leaves_ordinals() {
        assert_eq!(strip_dates("1/ Bitcoin"), "1/ Bitcoin");
        assert_eq!(strip_dates("12/ Ether"), "12/ Ether");
    }

    #[test]
    fn test_extract_linked_items() {
        let items = extract(DAILY_BODY);

        assert_eq!(items.len(), 3);
        assert_eq!(
            items.iter().map(|i| i.ordinal).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(items[0].text, "Bitcoin breaks 110k");
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(items[2].text, "SEC delays decision");
        assert_eq!(items[2].link.as_deref(), Some("https://example.com/3"));
    }

    #[test]
    fn test_extract_two_digit_ordinal() {
        let body = "10/ Tenth item – <a href=\"https://example.com/10\">source</a>";
        let items = extract(body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ordinal, 10);
    }

    #[test]
    fn test_extract_falls_back_to_plain_items() {
        let body = "1/ First headline<br>2/ Second headline<br>3/ Third";
        let items = extract(body);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].text, "First headline");
        assert_eq!(items[1].text, "Second headline");
        assert!(items.iter().all(|i| i.link.is_none()));
    }

    #[test]
    fn test_extract_prefers_linked_items() {
        let body = "1/ Linked – <a href=\"https://example.com/1\">source</a><br>2/ Unlinked";
        let items = extract(body);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Linked");
    }

    #[test]
    fn test_extract_rejects_zero_ordinal() {
        let items = extract("0/ not an item");
        assert!(items.is_empty());
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract("<p>Just a paragraph of text.</p>").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_plain_text_fallback_short() {
        assert_eq!(
            plain_text_fallback("<p>Hello <b>world</b></p>", 500),
            "Hello world"
        );
    }

    #[test]
    fn test_plain_text_fallback_clipped() {
        let body = format!("<p>{}</p>", "比".repeat(20));
        let text = plain_text_fallback(&body, 10);
        assert_eq!(text, format!("{}...", "比".repeat(10)));
    }

    #[test]
    fn test_plain_text_fallback_exact_budget() {
        let body = "a".repeat(10);
        assert_eq!(plain_text_fallback(&body, 10), body);
    }
}
