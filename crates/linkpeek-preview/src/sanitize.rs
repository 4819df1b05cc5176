//! HTML sanitizer.
//!
//! Parses untrusted markup into a private DOM, strips active content,
//! absolutises resource URLs against the page address and injects the
//! baseline stylesheet. Never fails: html5ever recovers from any input.

use kuchiki::NodeRef;
use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use url::Url;

/// Elements removed together with everything inside them, in any namespace.
const REMOVED_ELEMENTS: &[&str] = &[
    "script", "object", "embed", "applet", "form", "input", "button", "select", "textarea",
];

/// Attributes that carry a navigable or fetchable URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction"];

/// Pseudo-protocols that execute code when followed.
const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:"];

/// CSS constructs that can run script in some engine.
const CSS_SCRIPT_VECTORS: &[&str] = &[
    "expression(",
    "javascript:",
    "vbscript:",
    "-moz-binding",
    "behavior:",
];

/// Elements whose `src`/`href` is rewritten to an absolute URL.
const REWRITTEN_ELEMENTS: &[&str] = &["img", "link", "a"];

/// Baseline stylesheet injected into every preview.
pub const BASE_CSS: &str = "\
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.4; margin: 0; padding: 16px; background: white; color: #333; font-size: 14px; }
img { max-width: 100%; height: auto; }
a { color: #0066cc; text-decoration: none; }
a:hover { text-decoration: underline; }
* { box-sizing: border-box; }
";

/// Turns raw destination HTML into inert, self-contained HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSanitizer;

impl HtmlSanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Sanitize `raw`, resolving relative resource URLs against `page`.
    pub fn sanitize(&self, raw: &str, page: &Url) -> String {
        let document = kuchiki::parse_html().one(raw);

        let removed = remove_active_elements(&document) + remove_scripted_styles(&document);
        let stripped = strip_active_attributes(&document);
        let rewritten = absolutize_urls(&document, page);
        inject_base_style(&document);

        tracing::debug!(
            page = %page,
            removed_elements = removed,
            stripped_attributes = stripped,
            rewritten_urls = rewritten,
            "sanitized page"
        );

        document.to_string()
    }
}

fn remove_active_elements(document: &NodeRef) -> usize {
    // Collect first: detaching while iterating invalidates the iterator.
    let matches: Vec<_> = document
        .descendants()
        .elements()
        .filter(|element| {
            let name = element.name.local.to_ascii_lowercase();
            REMOVED_ELEMENTS.contains(&&*name)
        })
        .collect();

    for element in &matches {
        element.as_node().detach();
    }
    matches.len()
}

/// Drop `<style>` blocks that carry a script vector; the rest are kept.
fn remove_scripted_styles(document: &NodeRef) -> usize {
    let matches: Vec<_> = match document.select("style") {
        Ok(iter) => iter
            .filter(|style| is_scripted_css(&style.text_contents()))
            .collect(),
        Err(()) => return 0,
    };

    for style in &matches {
        style.as_node().detach();
    }
    matches.len()
}

/// Whether CSS text contains a construct that executes script.
pub(crate) fn is_scripted_css(css: &str) -> bool {
    let normalized: String = css
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    CSS_SCRIPT_VECTORS
        .iter()
        .any(|vector| normalized.contains(vector))
}

fn strip_active_attributes(document: &NodeRef) -> usize {
    let mut stripped = 0;

    for element in document.descendants().elements() {
        let mut attrs = element.attributes.borrow_mut();
        let before = attrs.map.len();
        attrs.map.retain(|name, attr| {
            let name = name.local.to_ascii_lowercase();
            if name.starts_with("on") {
                return false;
            }
            !(URL_ATTRIBUTES.contains(&&*name) && is_script_url(&attr.value))
        });
        stripped += before - attrs.map.len();
    }

    stripped
}

/// Whether a URL attribute value would execute script when followed.
///
/// Browsers ignore embedded whitespace and control characters in the
/// scheme, so `java\tscript:` is treated like `javascript:`.
fn is_script_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

fn absolutize_urls(document: &NodeRef, page: &Url) -> usize {
    let mut rewritten = 0;

    for element in document.descendants().elements() {
        if !REWRITTEN_ELEMENTS.contains(&&*element.name.local) {
            continue;
        }

        let mut attrs = element.attributes.borrow_mut();
        for name in ["src", "href"] {
            let Some(value) = attrs.get(name).map(str::to_string) else {
                continue;
            };
            if value.is_empty() || value.starts_with("http") || value.starts_with("//") {
                continue;
            }
            if let Ok(absolute) = page.join(&value) {
                attrs.insert(name, absolute.to_string());
                rewritten += 1;
            }
        }
    }

    rewritten
}

fn inject_base_style(document: &NodeRef) {
    let Ok(head) = document.select_first("head") else {
        return;
    };

    let fragment = kuchiki::parse_html().one(format!("<style>{BASE_CSS}</style>"));
    if let Ok(style) = fragment.select_first("style") {
        let style = style.as_node().clone();
        style.detach();
        head.as_node().prepend(style);
    }
}
