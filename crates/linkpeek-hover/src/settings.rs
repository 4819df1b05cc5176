//! User settings read from the persistent settings store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::PanelSize;

/// Default delay before a hovered link shows its preview.
pub const DEFAULT_SHOW_DELAY_MS: u64 = 800;

/// Default panel width in CSS pixels.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 400;

/// Default panel height in CSS pixels.
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 300;

/// Hover preview settings.
///
/// Stored as camelCase JSON (`{"enabled":true,"delay":800,...}`); missing
/// fields take their defaults so older stores keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Whether previews are shown at all.
    pub enabled: bool,
    /// Show delay in milliseconds.
    pub delay: u64,
    pub preview_width: u32,
    pub preview_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: DEFAULT_SHOW_DELAY_MS,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
        }
    }
}

impl Settings {
    /// Parse settings from the store's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn panel_size(&self) -> PanelSize {
        PanelSize {
            width: f64::from(self.preview_width),
            height: f64::from(self.preview_height),
        }
    }
}
