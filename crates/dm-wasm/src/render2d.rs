//! Canvas2D painter for the overlay display list.
//!
//! Items are in page pixels; the canvas covers the whole container, so the
//! painter shifts by the page's offset first.

use dm_core::PageRect;
use dm_render::{OverlayItem, OverlayStyle};
use web_sys::CanvasRenderingContext2d;

pub fn render_overlay(
    ctx: &CanvasRenderingContext2d,
    items: &[OverlayItem],
    page: Option<PageRect>,
    canvas_width: f64,
    canvas_height: f64,
    style: &OverlayStyle,
) {
    ctx.clear_rect(0.0, 0.0, canvas_width, canvas_height);
    let Some(page) = page else {
        return;
    };

    ctx.save();
    let _ = ctx.translate(page.left, page.top);
    ctx.set_font(&style.label_font);
    ctx.set_text_baseline("top");

    for item in items {
        match item {
            OverlayItem::Box {
                rect,
                stroke,
                width,
                ..
            } => {
                ctx.set_stroke_style_str(stroke);
                ctx.set_line_width(*width);
                ctx.stroke_rect(rect.x0, rect.y0, rect.width(), rect.height());
            }
            OverlayItem::Label {
                text,
                origin,
                color,
                ..
            } => {
                ctx.set_fill_style_str(color);
                let _ = ctx.fill_text(text, origin.x, origin.y);
            }
            OverlayItem::Draft { rect, stroke, dash } => {
                ctx.set_stroke_style_str(stroke);
                ctx.set_line_width(style.stroke_width);
                let _ = ctx.set_line_dash(&js_sys::Array::of2(
                    &dash[0].into(),
                    &dash[1].into(),
                ));
                ctx.stroke_rect(rect.x0, rect.y0, rect.width(), rect.height());
                let _ = ctx.set_line_dash(&js_sys::Array::new());
            }
            OverlayItem::Handle {
                rect, stroke, fill, ..
            } => {
                ctx.set_fill_style_str(fill);
                ctx.fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
                ctx.set_stroke_style_str(stroke);
                ctx.set_line_width(1.0);
                ctx.stroke_rect(rect.x0, rect.y0, rect.width(), rect.height());
            }
        }
    }

    ctx.restore();
}
