//! Page title extraction.

use kuchiki::traits::TendrilSink;
use linkpeek_core::UNTITLED_PAGE;

/// Display title for a raw HTML page.
///
/// Trimmed `<title>` text, else the trimmed text of the first `<h1>`, else
/// [`UNTITLED_PAGE`]. Whitespace-only candidates count as empty.
pub fn extract_title(html: &str) -> String {
    let document = kuchiki::parse_html().one(html);

    ["title", "h1"]
        .into_iter()
        .filter_map(|selector| document.select_first(selector).ok())
        .map(|element| collapse_whitespace(&element.text_contents()))
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| UNTITLED_PAGE.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
