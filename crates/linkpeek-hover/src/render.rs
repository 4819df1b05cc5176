//! Preview panel rendering.
//!
//! Positions the panel next to the pointer and builds its markup with maud.
//! Previewed HTML is only ever placed in an `<iframe srcdoc>` whose sandbox
//! omits `allow-scripts`, so it cannot run code in or read from the host page.

use linkpeek_core::{PreviewPage, PreviewResult};
use maud::{Markup, html};
use url::Url;

/// Gap between the pointer and the panel corner, in CSS pixels.
pub const POINTER_OFFSET: f64 = 10.0;

/// Sandbox flags for the embedded preview.
pub const IFRAME_SANDBOX: &str = "allow-same-origin allow-popups allow-popups-to-escape-sandbox";

/// A point in page coordinates (CSS pixels, scroll included).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

impl PagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSize {
    pub width: f64,
    pub height: f64,
}

/// Visible region of the host page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width,
            height,
        }
    }

    pub fn scrolled(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }
}

/// What the panel shows.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Loading { url: Url },
    Failed { url: Url, message: String },
    Page(PreviewPage),
}

impl PanelContent {
    /// Panel content for a result fetched (or cached) for `url`.
    pub fn from_result(url: &Url, result: PreviewResult) -> Self {
        match result {
            PreviewResult::Page(page) => Self::Page(page),
            PreviewResult::Failed(failure) => Self::Failed {
                url: url.clone(),
                message: failure.error,
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// A positioned, fully rendered panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPanel {
    pub position: PagePoint,
    pub size: PanelSize,
    pub content: PanelContent,
    pub markup: String,
}

/// Builds [`PreviewPanel`]s at a fixed size.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    size: PanelSize,
}

impl PreviewRenderer {
    pub fn new(size: PanelSize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> PanelSize {
        self.size
    }

    pub fn set_size(&mut self, size: PanelSize) {
        self.size = size;
    }

    pub fn render(&self, content: PanelContent, pointer: PagePoint, viewport: Viewport) -> PreviewPanel {
        let position = self.position(pointer, viewport);
        let markup = panel_markup(&content, position, self.size).into_string();
        PreviewPanel {
            position,
            size: self.size,
            content,
            markup,
        }
    }

    /// Below-right of the pointer, flipped per axis when that would overflow.
    pub fn position(&self, pointer: PagePoint, viewport: Viewport) -> PagePoint {
        let mut x = pointer.x + POINTER_OFFSET;
        let mut y = pointer.y + POINTER_OFFSET;

        if x + self.size.width > viewport.scroll_x + viewport.width {
            x = pointer.x - self.size.width - POINTER_OFFSET;
        }
        if y + self.size.height > viewport.scroll_y + viewport.height {
            y = pointer.y - self.size.height - POINTER_OFFSET;
        }

        PagePoint { x, y }
    }
}

fn panel_markup(content: &PanelContent, position: PagePoint, size: PanelSize) -> Markup {
    let style = format!(
        "left: {}px; top: {}px; width: {}px; height: {}px;",
        position.x, position.y, size.width, size.height
    );

    html! {
        div class="linkpeek-preview" style=(style) {
            div class="linkpeek-header" {
                @match content {
                    PanelContent::Loading { .. } => {
                        div class="linkpeek-loading" { "Loading preview..." }
                    }
                    PanelContent::Failed { url, message } => {
                        div class="linkpeek-error" { "\u{26a0}\u{fe0f} " (message) }
                        div class="linkpeek-url" { (url.as_str()) }
                    }
                    PanelContent::Page(page) => {
                        div class="linkpeek-title" {
                            @if page.title.is_empty() { "Untitled" } @else { (page.title) }
                        }
                        div class="linkpeek-url" { (page.url) }
                    }
                }
            }
            @if let PanelContent::Page(page) = content {
                div class="linkpeek-content" {
                    iframe srcdoc=(page.html) sandbox=(IFRAME_SANDBOX) frameborder="0" {}
                }
            }
        }
    }
}
