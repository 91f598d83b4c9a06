//! Annotation records and the partial shapes used to create and patch them.
//!
//! A record's position lives only in `bbox` (normalized). Label, category and
//! `fields` are descriptive and never influence geometry.

use crate::geometry::NormBox;
use crate::id::AnnotationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form descriptive attributes. Ordered so exports are stable.
pub type Fields = BTreeMap<String, String>;

/// One committed annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub bbox: NormBox,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Input to `AnnotationStore::add`. Anything left as `None` gets the
/// store's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    /// Requested id. Ignored when already taken.
    #[serde(default)]
    pub id: Option<AnnotationId>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub bbox: Option<NormBox>,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl NewAnnotation {
    pub fn with_bbox(bbox: NormBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A merge patch for `AnnotationStore::update`.
///
/// `fields` is merged shallowly (patched keys overwrite, others survive);
/// `bbox` replaces the whole box; `category: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: Option<Option<String>>,
    #[serde(default)]
    pub bbox: Option<NormBox>,
    #[serde(default)]
    pub fields: Fields,
}

impl AnnotationPatch {
    pub fn bbox(bbox: NormBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.category.is_none() && self.bbox.is_none() && self.fields.is_empty()
    }
}

/// A classification tag with its display color and visibility toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// CSS color string, e.g. `#1976d2`.
    pub color: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Category {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            visible: true,
        }
    }
}

/// Look up a category by name; unknown or absent categories count as visible.
pub fn is_category_visible(categories: &[Category], category: Option<&str>) -> bool {
    match category {
        Some(name) => categories
            .iter()
            .find(|c| c.name == name)
            .is_none_or(|c| c.visible),
        None => true,
    }
}
