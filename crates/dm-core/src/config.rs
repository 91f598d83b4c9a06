//! Editor configuration.
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to override. Files are JSON.

use crate::geometry::NormBox;
use crate::model::Category;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration shared by the store, tracker, and interaction
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Label given to annotations created without one.
    pub placeholder_label: String,
    /// Label given to analysis items that carry neither `label` nor `class`.
    pub unknown_label: String,
    /// Box inserted by the explicit "add" action.
    pub default_box: NormBox,
    /// Category inserted by the explicit "add" action.
    pub default_category: Option<String>,
    /// Pick radius around resize handles, in pixels.
    pub handle_radius: f64,
    pub tracker: TrackerConfig,
    pub zoom: ZoomConfig,
    pub categories: Vec<Category>,
    /// Ordered fields shown by the properties editor.
    pub property_fields: Vec<FieldSpec>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            placeholder_label: "New Annotation".to_string(),
            unknown_label: "Unknown".to_string(),
            // 100x60 at (50, 50) on an 800x1000 page.
            default_box: NormBox::new(0.125, 0.08, 0.125, 0.06),
            default_category: Some("Instrument".to_string()),
            handle_radius: 6.0,
            tracker: TrackerConfig::default(),
            zoom: ZoomConfig::default(),
            categories: vec![
                Category::new("Instrument", "#1976d2"),
                Category::new("Valve", "#e53935"),
                Category::new("Equipment", "#43a047"),
                Category::new("Pipe", "#fbc02d"),
            ],
            property_fields: [
                ("label", "Label"),
                ("type", "Type"),
                ("tagNo", "Tag No"),
                ("designSpecification1", "Design Specification 1"),
                ("designSpecification2", "Design Specification 2"),
                ("designSpecification3", "Design Specification 3"),
                ("additionalSpecification1", "Additional Specification 1"),
                ("additionalSpecification2", "Additional Specification 2"),
                ("additionalSpecification3", "Additional Specification 3"),
            ]
            .into_iter()
            .map(|(key, name)| FieldSpec::new(key, name))
            .collect(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Color for a category, if it is registered.
    pub fn category_color(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.color.as_str())
    }

    /// Toggle a category's visibility. Returns `false` for unknown names.
    pub fn set_category_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.categories.iter_mut().find(|c| c.name == name) {
            Some(cat) => {
                cat.visible = visible;
                true
            }
            None => false,
        }
    }
}

/// Retry budget for the viewport tracker while the render surface settles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub max_retries: u32,
    pub retry_interval_ms: u64,
    pub backoff: Backoff,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_retries: 8,
            retry_interval_ms: 250,
            backoff: Backoff::Fixed,
        }
    }
}

impl TrackerConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        match self.backoff {
            Backoff::Fixed => self.retry_interval_ms,
            Backoff::Exponential => self
                .retry_interval_ms
                .saturating_mul(1u64 << attempt.saturating_sub(1).min(16)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 3.0,
            step: 0.1,
        }
    }
}

/// One row of the properties form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub name: String,
}

impl FieldSpec {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}
