//! Allow-list filter run after the sanitizer.
//!
//! The sanitizer works from a deny-list; this pass only keeps what ammonia
//! knows to be inert, so a gap in one is covered by the other. The cleaned
//! body is wrapped in a fresh document whose head carries nothing but the
//! baseline stylesheet, which makes [`DefenseFilter::clean`] idempotent.
//!
//! Presentation survives: sectioning and legacy formatting elements, the
//! page's own `<style>` blocks and `http(s)` stylesheet links are all kept.

use std::borrow::Cow;
use std::collections::HashSet;

use ammonia::Builder;

use crate::sanitize::{BASE_CSS, is_scripted_css};

/// Allowed on top of ammonia's default tag set.
const EXTRA_TAGS: &[&str] = &[
    "main", "section", "address", "font", "big", "picture", "source", "tfoot", "style", "link",
];

/// Elements whose content is dropped along with the tag.
const CLEAN_CONTENT_TAGS: &[&str] = &["script", "title", "noscript", "template"];

/// Second, independent sanitization pass.
pub struct DefenseFilter {
    builder: Builder<'static>,
}

impl Default for DefenseFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DefenseFilter {
    pub fn new() -> Self {
        let mut builder = Builder::default();
        builder
            .add_tags(EXTRA_TAGS)
            .add_generic_attributes(&["class", "id", "style"])
            .add_tag_attributes("font", &["color", "face", "size"])
            .add_tag_attributes("source", &["srcset", "sizes", "type", "media"])
            .add_tag_attributes("link", &["rel", "href", "type", "media"])
            .attribute_filter(filter_attribute)
            .clean_content_tags(CLEAN_CONTENT_TAGS.iter().copied().collect::<HashSet<_>>())
            .link_rel(Some("noopener noreferrer"));

        Self { builder }
    }

    /// Clean `html` and wrap the result in a minimal document.
    pub fn clean(&self, html: &str) -> String {
        let base_style = format!("<style>{BASE_CSS}</style>");
        // The baseline stylesheet appears once, in the head.
        let body = self.builder.clean(html).to_string().replace(&base_style, "");
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\">{base_style}</head><body>{body}</body></html>"
        )
    }
}

fn filter_attribute<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    match (element, attribute) {
        (_, "style") if is_unsafe_style(value) => None,
        ("link", "rel") if !value.trim().eq_ignore_ascii_case("stylesheet") => None,
        ("link", "href") if !is_http_url(value) => None,
        _ => Some(Cow::Borrowed(value)),
    }
}

fn is_unsafe_style(value: &str) -> bool {
    is_scripted_css(value) || value.to_ascii_lowercase().contains("@import")
}

fn is_http_url(value: &str) -> bool {
    let lowered = value.trim_start().to_ascii_lowercase();
    lowered.starts_with("https://") || lowered.starts_with("http://")
}
