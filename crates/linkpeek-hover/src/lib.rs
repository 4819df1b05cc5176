//! linkpeek hover client.
//!
//! Decides when a hovered link gets a preview, caches results and manages
//! the lifecycle of the single on-screen preview panel.
//!
//! - [`HoverController`]: sans-IO state machine (debounce, grace period,
//!   supersession, cache)
//! - [`PreviewRenderer`]: panel positioning and maud markup
//! - [`HttpPreviewClient`]: reqwest client for `POST /api/preview`
//! - [`HoverDriver`]: single-task tokio loop wiring the three together

pub mod cache;
pub mod client;
pub mod controller;
pub mod driver;
pub mod render;
pub mod settings;

pub use cache::{CACHE_RETENTION, CacheEntry, PreviewCache};
pub use client::{DEFAULT_ENDPOINT, HttpPreviewClient, PreviewClient};
pub use controller::{FetchRequest, HoverController, HoverSession, HoverState, LinkId};
pub use driver::{HoverDriver, HoverEvent};
pub use render::{PagePoint, PanelContent, PanelSize, PreviewPanel, PreviewRenderer, Viewport};
pub use settings::Settings;
