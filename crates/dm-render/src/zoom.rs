//! Zoom level and "contain" fitting for image documents.

use dm_core::Size;
use dm_core::config::ZoomConfig;

/// A clamped zoom factor. `1.0` means "fit", not 1:1 pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLevel {
    value: f64,
    config: ZoomConfig,
}

impl ZoomLevel {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            value: 1.0_f64.clamp(config.min, config.max),
            config,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set an explicit level. Returns `true` if the level changed.
    pub fn set(&mut self, value: f64) -> bool {
        let clamped = value.clamp(self.config.min, self.config.max);
        // Keep one decimal step exact so repeated in/out returns to 1.0.
        let clamped = (clamped * 1000.0).round() / 1000.0;
        let changed = clamped != self.value;
        self.value = clamped;
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set(self.value + self.config.step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set(self.value - self.config.step)
    }

    pub fn reset(&mut self) -> bool {
        self.set(1.0)
    }

    /// Ctrl+wheel: scrolling up (negative delta) zooms in.
    pub fn apply_wheel(&mut self, delta_y: f64) -> bool {
        if delta_y < 0.0 {
            self.zoom_in()
        } else if delta_y > 0.0 {
            self.zoom_out()
        } else {
            false
        }
    }
}

/// Where a "contain"-fitted image lands inside its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale `natural` to fit inside `container`, multiply by `zoom`, and
/// center it. Offsets are relative to the container.
pub fn fit_contain(container: Size, natural: Size, zoom: f64) -> Option<Fit> {
    if !(natural.width > 0.0 && natural.height > 0.0) {
        return None;
    }
    let scale = (container.width / natural.width).min(container.height / natural.height) * zoom;
    let width = natural.width * scale;
    let height = natural.height * scale;
    Some(Fit {
        left: (container.width - width) / 2.0,
        top: (container.height - height) / 2.0,
        width,
        height,
    })
}
