//! Annotations → overlay display list.
//!
//! Walks the store in display order and emits backend-neutral drawing items:
//! box outlines, label tags, the in-progress draft and the selected box's
//! resize handles. Backends (the canvas bridge, a test) paint the list in
//! order; later items are on top.

use crate::hit::Handle;
use dm_core::id::AnnotationId;
use dm_core::model::{Category, is_category_visible};
use dm_core::{AnnotationStore, PageRect, PixelBox, to_pixels};
use kurbo::{Point, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub selected_stroke: String,
    /// Stroke for annotations without a registered category color.
    pub default_stroke: String,
    pub draft_stroke: String,
    pub stroke_width: f64,
    pub draft_dash: [f64; 2],
    /// Distance of the label tag above the box.
    pub label_offset: f64,
    pub label_font: String,
    pub handle_size: f64,
    pub handle_fill: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            selected_stroke: "red".into(),
            default_stroke: "blue".into(),
            draft_stroke: "green".into(),
            stroke_width: 2.0,
            draft_dash: [4.0, 4.0],
            label_offset: 18.0,
            label_font: "14px sans-serif".into(),
            handle_size: 8.0,
            handle_fill: "white".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayItem {
    Box {
        id: AnnotationId,
        rect: Rect,
        stroke: String,
        width: f64,
    },
    Label {
        id: AnnotationId,
        text: String,
        origin: Point,
        color: String,
    },
    Draft {
        rect: Rect,
        stroke: String,
        dash: [f64; 2],
    },
    Handle {
        id: AnnotationId,
        handle: Handle,
        rect: Rect,
        stroke: String,
        fill: String,
    },
}

/// Uncommitted gesture state drawn on top of the stored annotations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transient {
    /// The in-progress draw box.
    pub draft: Option<PixelBox>,
    /// A box being dragged or resized, drawn in place of its stored box.
    pub preview: Option<(AnnotationId, PixelBox)>,
}

fn to_rect(b: &PixelBox) -> Rect {
    Rect::new(b.x, b.y, b.right(), b.bottom())
}

/// Build the display list for one frame.
pub fn build_overlay(
    store: &AnnotationStore,
    page: &PageRect,
    categories: &[Category],
    transient: &Transient,
    style: &OverlayStyle,
) -> Vec<OverlayItem> {
    let mut items = Vec::with_capacity(store.len() * 2 + 9);
    let selected = store.selected();
    let mut selected_box = None;

    for rec in store.iter() {
        if !is_category_visible(categories, rec.category.as_deref()) {
            continue;
        }
        let px = match transient.preview {
            Some((id, preview)) if id == rec.id => preview.normalized(),
            _ => to_pixels(&rec.bbox, page),
        };
        let color = if selected == Some(rec.id) {
            selected_box = Some((rec.id, px));
            style.selected_stroke.clone()
        } else {
            rec.category
                .as_deref()
                .and_then(|name| categories.iter().find(|c| c.name == name))
                .map(|c| c.color.clone())
                .unwrap_or_else(|| style.default_stroke.clone())
        };
        log::trace!("overlay {} at {px:?}", rec.id);
        items.push(OverlayItem::Box {
            id: rec.id,
            rect: to_rect(&px),
            stroke: color.clone(),
            width: style.stroke_width,
        });
        items.push(OverlayItem::Label {
            id: rec.id,
            text: rec.label.clone(),
            origin: Point::new(px.x, px.y - style.label_offset),
            color,
        });
    }

    if let Some(d) = transient.draft {
        items.push(OverlayItem::Draft {
            rect: to_rect(&d.normalized()),
            stroke: style.draft_stroke.clone(),
            dash: style.draft_dash,
        });
    }

    if let Some((id, px)) = selected_box {
        let size = style.handle_size;
        items.extend(Handle::ALL.into_iter().map(|handle| OverlayItem::Handle {
            id,
            handle,
            rect: Rect::from_center_size(handle.position(&px), (size, size)),
            stroke: style.selected_stroke.clone(),
            fill: style.handle_fill.clone(),
        }));
    }

    items
}
