//! Analysis-source boundary: initial batches of detected boxes.
//!
//! An external analysis service supplies loosely-typed items. Missing
//! optional fields get documented defaults here, before anything reaches
//! the store.

use crate::config::EditorConfig;
use crate::geometry::NormBox;
use crate::id::AnnotationId;
use crate::model::{Fields, NewAnnotation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("analysis source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed analysis batch: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A box as the analysis service sends it; absent components read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooseBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl From<LooseBox> for NormBox {
    fn from(b: LooseBox) -> Self {
        NormBox::new(b.x_center, b.y_center, b.width, b.height)
    }
}

/// One detection from the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisItem {
    /// String or number.
    pub id: Option<Value>,
    pub label: Option<String>,
    pub class: Option<String>,
    pub category: Option<String>,
    pub confidence: Option<f64>,
    pub bbox: Option<LooseBox>,
    pub metadata: Option<Value>,
}

impl AnalysisItem {
    /// Convert to a store insert, or `None` when the item has no usable box.
    ///
    /// `label` falls back to `class`, then to `unknown_label`; blank strings
    /// count as missing at every step. Object metadata is flattened into
    /// `fields`.
    pub fn into_new_annotation(self, cfg: &EditorConfig) -> Option<NewAnnotation> {
        let bbox: NormBox = self.bbox.unwrap_or_default().into();
        if bbox.is_degenerate() {
            log::warn!("dropping analysis item {:?}: empty box {bbox:?}", self.id);
            return None;
        }
        let id = self.id.as_ref().and_then(id_from_value);
        let class = non_blank(self.class);
        let label = non_blank(self.label)
            .or_else(|| class.clone())
            .unwrap_or_else(|| cfg.unknown_label.clone());
        Some(NewAnnotation {
            id,
            label: Some(label),
            category: non_blank(self.category).or(class),
            bbox: Some(bbox),
            fields: flatten_metadata(self.metadata),
            confidence: self.confidence,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn id_from_value(v: &Value) -> Option<AnnotationId> {
    match v {
        Value::String(s) if !s.is_empty() => Some(AnnotationId::intern(s)),
        Value::Number(n) => Some(AnnotationId::intern(&n.to_string())),
        _ => None,
    }
}

fn flatten_metadata(metadata: Option<Value>) -> Fields {
    match metadata {
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        Some(Value::Null) | None => Fields::new(),
        Some(other) => Fields::from([("metadata".to_string(), other.to_string())]),
    }
}

/// Parse a JSON array of analysis items.
pub fn parse_batch(json: &str) -> Result<Vec<AnalysisItem>, SourceError> {
    Ok(serde_json::from_str(json)?)
}

/// Convert a batch, dropping items without a usable box.
pub fn to_new_annotations(items: Vec<AnalysisItem>, cfg: &EditorConfig) -> Vec<NewAnnotation> {
    items
        .into_iter()
        .filter_map(|item| item.into_new_annotation(cfg))
        .collect()
}

// ─── One-shot loading ────────────────────────────────────────────────────

/// Something that can deliver the initial annotation batch.
#[allow(async_fn_in_trait)]
pub trait AnalysisSource {
    async fn fetch(&self) -> Result<Vec<AnalysisItem>, SourceError>;
}

/// Mounted/unmounted flag shared between a view and its in-flight loads.
#[derive(Debug, Clone)]
pub struct MountGuard(Arc<AtomicBool>);

impl Default for MountGuard {
    fn default() -> Self {
        Self::mounted()
    }
}

impl MountGuard {
    pub fn mounted() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fetch once. A result that arrives after `guard` was unmounted is
/// discarded (`Ok(None)`) instead of being applied.
pub async fn load_once<S: AnalysisSource>(
    source: &S,
    guard: &MountGuard,
    cfg: &EditorConfig,
) -> Result<Option<Vec<NewAnnotation>>, SourceError> {
    let items = source.fetch().await?;
    if !guard.is_mounted() {
        log::debug!("discarding {} analysis items: view unmounted", items.len());
        return Ok(None);
    }
    Ok(Some(to_new_annotations(items, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_for_missing_fields() {
        let items = parse_batch(
            r#"[
                {"id": 7, "class": "valve", "confidence": 0.8,
                 "bbox": {"x_center": 0.5, "y_center": 0.5, "width": 0.1, "height": 0.2},
                 "metadata": {"tag": "V-7", "pressure": 12}},
                {"bbox": {"x_center": 0.2, "y_center": 0.2, "width": 0.1, "height": 0.1}},
                {"id": "flat", "bbox": {"x_center": 0.2, "y_center": 0.2, "width": 0.1}}
            ]"#,
        )
        .unwrap();
        let news = to_new_annotations(items, &EditorConfig::default());
        assert_eq!(news.len(), 2);

        assert_eq!(news[0].id, Some(AnnotationId::intern("7")));
        assert_eq!(news[0].label.as_deref(), Some("valve"));
        assert_eq!(news[0].category.as_deref(), Some("valve"));
        assert_eq!(news[0].confidence, Some(0.8));
        assert_eq!(news[0].fields["tag"], "V-7");
        assert_eq!(news[0].fields["pressure"], "12");

        assert_eq!(news[1].id, None);
        assert_eq!(news[1].label.as_deref(), Some("Unknown"));
        assert_eq!(news[1].confidence, None);
        assert!(news[1].fields.is_empty());
    }

    #[test]
    fn blank_label_and_class_fall_back_to_unknown() {
        let items = parse_batch(
            r#"[
                {"label": "", "class": "",
                 "bbox": {"x_center": 0.5, "y_center": 0.5, "width": 0.1, "height": 0.1}},
                {"label": " ", "class": "pump", "category": "  ",
                 "bbox": {"x_center": 0.5, "y_center": 0.5, "width": 0.1, "height": 0.1}}
            ]"#,
        )
        .unwrap();
        let news = to_new_annotations(items, &EditorConfig::default());
        assert_eq!(news[0].label.as_deref(), Some("Unknown"));
        assert_eq!(news[0].category, None);
        assert_eq!(news[1].label.as_deref(), Some("pump"));
        assert_eq!(news[1].category.as_deref(), Some("pump"));
    }

    struct Fixed(Vec<AnalysisItem>);

    impl AnalysisSource for Fixed {
        async fn fetch(&self) -> Result<Vec<AnalysisItem>, SourceError> {
            Ok(self.0.clone())
        }
    }

    fn one_item() -> Vec<AnalysisItem> {
        vec![AnalysisItem {
            label: Some("Pump".into()),
            bbox: Some(LooseBox {
                x_center: 0.5,
                y_center: 0.5,
                width: 0.2,
                height: 0.2,
            }),
            ..AnalysisItem::default()
        }]
    }

    #[tokio::test]
    async fn load_once_applies_while_mounted() {
        let guard = MountGuard::mounted();
        let loaded = load_once(&Fixed(one_item()), &guard, &EditorConfig::default())
            .await
            .unwrap();
        assert_eq!(loaded.map(|v| v.len()), Some(1));
    }

    #[tokio::test]
    async fn load_once_discards_after_unmount() {
        let guard = MountGuard::mounted();
        guard.clone().unmount();
        let loaded = load_once(&Fixed(one_item()), &guard, &EditorConfig::default())
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }
}
