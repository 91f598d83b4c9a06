//! COCO-style summary export.
//!
//! Projects every record onto a page rectangle and assigns numeric label ids
//! in first-seen order.

use crate::geometry::{PageRect, to_pixels};
use crate::store::AnnotationStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CocoSummary {
    pub annotations: Vec<CocoAnnotation>,
    pub labels: Vec<CocoLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CocoAnnotation {
    /// 1-based position in display order.
    pub id: usize,
    pub label_id: usize,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub bbox: [f64; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CocoLabel {
    pub id: usize,
    pub label: String,
}

pub fn coco_summary(store: &AnnotationStore, page: &PageRect) -> CocoSummary {
    let mut labels: Vec<CocoLabel> = Vec::new();
    let annotations = store
        .iter()
        .enumerate()
        .map(|(idx, rec)| {
            let label_id = match labels.iter().find(|l| l.label == rec.label) {
                Some(l) => l.id,
                None => {
                    let id = labels.len() + 1;
                    labels.push(CocoLabel {
                        id,
                        label: rec.label.clone(),
                    });
                    id
                }
            };
            let px = to_pixels(&rec.bbox, page);
            let (center_x, center_y) = px.center();
            CocoAnnotation {
                id: idx + 1,
                label_id,
                label: rec.label.clone(),
                x: px.x,
                y: px.y,
                width: px.width,
                height: px.height,
                center_x,
                center_y,
                bbox: [px.x, px.y, px.width, px.height],
            }
        })
        .collect();
    CocoSummary {
        annotations,
        labels,
    }
}
