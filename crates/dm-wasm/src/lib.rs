//! WASM bridge for Docmark: exposes the annotation session to the page
//! hosting the document viewer.
//!
//! Compiled via `wasm-pack build --target web`. The host measures its
//! viewer and reports layout here, with the container and page candidates
//! all in one space (viewport coordinates, as from
//! `getBoundingClientRect`). Every pointer coordinate it passes in is
//! relative to the overlay canvas, which covers the viewer's container.

mod render2d;

use dm_core::id::AnnotationId;
use dm_core::{EditorConfig, PageRect, Size};
use dm_editor::{AnnotationSession, DrawContext, Gesture, InputEvent, Modifiers, Outcome, Signal};
use dm_render::{
    ImageSurface, LayoutTrigger, OverlayStyle, Refresh, RenderSurface, SurfaceRect,
    ViewportTracker,
};
use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// Viewer layout as last measured by the host.
#[derive(Debug, Default)]
struct MeasuredSurface {
    container: Option<SurfaceRect>,
    candidates: Vec<SurfaceRect>,
}

impl MeasuredSurface {
    /// `flat` holds `[left, top, width, height]` per candidate; a trailing
    /// partial group is ignored.
    fn new(container: SurfaceRect, flat: &[f64]) -> Self {
        Self {
            container: Some(container).filter(|c| c.area() > 0.0),
            candidates: flat
                .chunks_exact(4)
                .map(|c| SurfaceRect::new(c[0], c[1], c[2], c[3]))
                .collect(),
        }
    }
}

impl RenderSurface for MeasuredSurface {
    fn container(&self) -> Option<SurfaceRect> {
        self.container
    }

    fn page_candidates(&self) -> Vec<SurfaceRect> {
        self.candidates.clone()
    }
}

/// Result of one host call, serialized for JS.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeJson {
    changed: bool,
    redraw: bool,
    signal: Option<&'static str>,
    zoom_changed: bool,
    zoom: f64,
    /// Milliseconds until the host should call `retry_layout`.
    retry_ms: Option<f64>,
}

fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::CategoryRequired => "category_required",
        Signal::LabelRequested => "label_requested",
        Signal::PageUnavailable => "page_unavailable",
    }
}

fn parse_trigger(trigger: &str) -> LayoutTrigger {
    match trigger {
        "mount" => LayoutTrigger::Mount,
        "resize" => LayoutTrigger::Resize,
        "zoom" => LayoutTrigger::Zoom,
        "retry" => LayoutTrigger::Retry,
        _ => LayoutTrigger::Mutation,
    }
}

fn retry_ms(refresh: Refresh) -> Option<f64> {
    match refresh {
        Refresh::Fallback {
            retry_in: Some(delay),
            ..
        } => Some(delay.as_millis() as f64),
        _ => None,
    }
}

/// The WASM-facing overlay controller.
///
/// Owns the editing session and the viewport tracker. All interaction from
/// the host page goes through this struct.
#[wasm_bindgen]
pub struct DocmarkOverlay {
    session: AnnotationSession,
    tracker: ViewportTracker,
    surface: MeasuredSurface,
    /// Set when the overlay fits an image document itself instead of
    /// measuring a host-rendered page.
    image: Option<ImageSurface>,
    style: OverlayStyle,
}

#[wasm_bindgen]
impl DocmarkOverlay {
    /// Create a controller. `config_json` may be empty for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<DocmarkOverlay, JsValue> {
        console_error_panic_hook_setup();

        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json_str(config_json)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        Ok(Self::with_config(config))
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    /// Report the viewer's container and every element that may be the
    /// rendered page (flattened `[left, top, width, height, ...]`). The
    /// container and the candidates must be measured in the same space,
    /// e.g. both from `getBoundingClientRect`; the page rectangle is then
    /// taken relative to the container's top-left. Returns the outcome
    /// JSON; a `retryMs` value asks the host to call `retry_layout` after
    /// that delay.
    pub fn report_layout(
        &mut self,
        trigger: &str,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        candidates: &[f64],
    ) -> String {
        self.image = None;
        self.surface = MeasuredSurface::new(SurfaceRect::new(left, top, width, height), candidates);
        self.relayout(parse_trigger(trigger))
    }

    /// Report an image document's container and natural size. A zero
    /// natural size means the image has not loaded yet.
    pub fn report_image_layout(
        &mut self,
        trigger: &str,
        container_width: f64,
        container_height: f64,
        natural_width: f64,
        natural_height: f64,
    ) -> String {
        let natural = (natural_width > 0.0 && natural_height > 0.0)
            .then(|| Size::new(natural_width, natural_height));
        let pan = self.image.map(|i| i.pan).unwrap_or_default();
        self.image = Some(ImageSurface {
            container: Some(Size::new(container_width, container_height)),
            natural,
            zoom: self.session.zoom(),
            pan,
        });
        self.relayout(parse_trigger(trigger))
    }

    /// Pan an image document. No-op for host-rendered pages.
    pub fn pan_image(&mut self, dx: f64, dy: f64) -> String {
        match self.image.as_mut() {
            Some(image) => {
                image.pan_by(dx, dy);
                self.relayout(LayoutTrigger::Mutation)
            }
            None => self.outcome_json(Outcome::default(), None),
        }
    }

    /// Scheduled retry after a `retryMs` answer.
    pub fn retry_layout(&mut self) -> String {
        self.relayout(LayoutTrigger::Retry)
    }

    /// The viewer is going away. The page becomes unavailable.
    pub fn unmount(&mut self) {
        self.tracker.unmount();
        self.session.poll_viewport();
    }

    /// The current page rectangle as JSON, or `null` while unavailable.
    pub fn page_rect_json(&self) -> String {
        serde_json::to_string(&self.session.page()).unwrap_or_else(|_| "null".to_string())
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn set_draw_context(&mut self, category: Option<String>, label: Option<String>) {
        self.session.set_context(DrawContext { category, label });
    }

    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        let (px, py) = self.to_page(x, y);
        let event = InputEvent::from_pointer_down(px, py, Modifiers { shift, ctrl, alt, meta });
        self.input(&event)
    }

    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        let (px, py) = self.to_page(x, y);
        let event = InputEvent::from_pointer_move(px, py, Modifiers { shift, ctrl, alt, meta });
        self.input(&event)
    }

    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        let (px, py) = self.to_page(x, y);
        let event = InputEvent::from_pointer_up(px, py, Modifiers { shift, ctrl, alt, meta });
        self.input(&event)
    }

    /// Keyboard shortcut. `key` is `KeyboardEvent.key`.
    pub fn handle_key(&mut self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        self.input(&InputEvent::from_key(key, Modifiers { shift, ctrl, alt, meta }))
    }

    /// Wheel zoom. The host decides which wheel events zoom.
    pub fn handle_wheel(&mut self, delta_y: f64) -> String {
        let zoom_changed = self.session.zoom_mut().apply_wheel(delta_y);
        self.zoom_outcome(zoom_changed)
    }

    pub fn set_zoom(&mut self, value: f64) -> String {
        let zoom_changed = self.session.zoom_mut().set(value);
        self.zoom_outcome(zoom_changed)
    }

    pub fn zoom(&self) -> f64 {
        self.session.zoom()
    }

    /// Answer a `label_requested` signal. Blank stores the placeholder.
    pub fn confirm_label(&mut self, label: &str) -> String {
        let outcome = self.session.confirm_label(label);
        self.finish(outcome)
    }

    pub fn cancel(&mut self) -> String {
        let outcome = self.session.cancel();
        self.finish(outcome)
    }

    pub fn is_label_pending(&self) -> bool {
        matches!(self.session.engine().gesture(), Gesture::PendingLabel { .. })
    }

    /// Suggested text for the label prompt.
    pub fn label_hint(&self) -> Option<String> {
        self.session.engine().label_hint().map(str::to_string)
    }

    // ─── Selection and editing ───────────────────────────────────────────

    /// Insert the configured default box. Returns its id, or `""` on
    /// failure.
    pub fn add_default(&mut self) -> String {
        match self.session.add_default() {
            Ok(id) => id.as_str().to_string(),
            Err(e) => {
                log::warn!("add_default failed: {e}");
                String::new()
            }
        }
    }

    /// Select by id; `""` clears. Returns `false` for an unknown id.
    pub fn select_by_id(&mut self, id: &str) -> bool {
        let target = (!id.is_empty()).then(|| AnnotationId::intern(id));
        self.session.select(target).is_ok()
    }

    pub fn get_selected_id(&self) -> String {
        self.session
            .store()
            .selected()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.session.store().selected() {
            Some(id) => self.session.delete(id).changed,
            None => false,
        }
    }

    pub fn annotation_count(&self) -> usize {
        self.session.store().len()
    }

    pub fn set_category_visible(&mut self, name: &str, visible: bool) -> bool {
        self.session.set_category_visible(name, visible)
    }

    // ─── Properties ──────────────────────────────────────────────────────

    /// The properties form for the selection:
    /// `{"id":"...","rows":[{"key","name","value"}]}`, or `null`.
    pub fn get_properties_json(&self) -> String {
        let Some(form) = self.session.properties() else {
            return "null".to_string();
        };
        let rows: Vec<_> = form
            .rows()
            .map(|(spec, value)| {
                serde_json::json!({ "key": spec.key, "name": spec.name, "value": value })
            })
            .collect();
        serde_json::json!({ "id": form.id().as_str(), "rows": rows }).to_string()
    }

    /// Save `{"key": "value", ...}` into the selection's form and close it.
    /// Returns `false` when nothing is selected or the JSON is malformed.
    pub fn save_properties(&mut self, values_json: &str) -> bool {
        let values: BTreeMap<String, String> = match serde_json::from_str(values_json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("save_properties: {e}");
                return false;
            }
        };
        let Some(mut form) = self.session.properties() else {
            return false;
        };
        for (key, value) in values {
            form.set(key, value);
        }
        self.session.save_properties(form).changed
    }

    /// Delete the annotation the properties form is open for.
    pub fn delete_properties(&mut self) -> bool {
        match self.session.properties() {
            Some(form) => self.session.delete_properties(form).changed,
            None => false,
        }
    }

    // ─── Import / export ─────────────────────────────────────────────────

    /// Replace every annotation from a records JSON array.
    /// Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn import_json(&mut self, json: &str) -> String {
        match self.session.load_json(json) {
            Ok(()) => serde_json::json!({ "ok": true }).to_string(),
            Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    pub fn export_json(&self) -> Result<String, JsValue> {
        self.session
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Append an analysis batch. Returns `{"ok":true,"added":n}`.
    pub fn import_analysis_json(&mut self, json: &str) -> String {
        match dm_core::analysis::parse_batch(json) {
            Ok(items) => {
                let added = self.session.import_analysis(items);
                serde_json::json!({ "ok": true, "added": added }).to_string()
            }
            Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    /// COCO-style summary for the current page, or `null` while the page
    /// is unavailable.
    pub fn export_coco_json(&self) -> String {
        self.session
            .coco()
            .and_then(|summary| serde_json::to_string(&summary).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Paint the overlay onto a canvas covering the viewer's container.
    pub fn render(&self, ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
        let items = self.session.overlay(&self.style);
        render2d::render_overlay(ctx, &items, self.session.page(), width, height, &self.style);
    }
}

impl DocmarkOverlay {
    fn with_config(config: EditorConfig) -> Self {
        let tracker = ViewportTracker::new(config.tracker);
        let mut session = AnnotationSession::new(config);
        session.attach_viewport(tracker.subscribe());
        Self {
            session,
            tracker,
            surface: MeasuredSurface::default(),
            image: None,
            style: OverlayStyle::default(),
        }
    }

    fn to_page(&self, x: f64, y: f64) -> (f64, f64) {
        match self.session.page() {
            Some(PageRect { left, top, .. }) => (x - left, y - top),
            None => (x, y),
        }
    }

    fn relayout(&mut self, trigger: LayoutTrigger) -> String {
        let retry = self.measure(trigger);
        self.outcome_json(
            Outcome {
                redraw: true,
                ..Outcome::default()
            },
            retry,
        )
    }

    fn measure(&mut self, trigger: LayoutTrigger) -> Option<f64> {
        let refresh = match &self.image {
            Some(image) => self.tracker.notify(trigger, image),
            None => self.tracker.notify(trigger, &self.surface),
        };
        self.session.poll_viewport();
        retry_ms(refresh)
    }

    fn input(&mut self, event: &InputEvent) -> String {
        let outcome = self.session.handle_input(event);
        self.finish(outcome)
    }

    fn zoom_outcome(&mut self, zoom_changed: bool) -> String {
        self.finish(Outcome {
            zoom_changed,
            redraw: zoom_changed,
            ..Outcome::default()
        })
    }

    /// An image document is re-fitted here on zoom; a host-rendered page
    /// is re-rendered by the host, which then reports layout.
    fn finish(&mut self, outcome: Outcome) -> String {
        let mut retry = None;
        if outcome.zoom_changed
            && let Some(image) = self.image.as_mut()
        {
            image.zoom = self.session.zoom();
            retry = self.measure(LayoutTrigger::Zoom);
        }
        self.outcome_json(outcome, retry)
    }

    fn outcome_json(&self, outcome: Outcome, retry_ms: Option<f64>) -> String {
        let json = OutcomeJson {
            changed: outcome.changed,
            redraw: outcome.redraw,
            signal: outcome.signal.map(signal_name),
            zoom_changed: outcome.zoom_changed,
            zoom: self.session.zoom(),
            retry_ms,
        };
        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Docmark WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no overlay needed) ────────────────────────────

/// Validate an editor config. Returns `{"ok":true}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_config(config_json: &str) -> String {
    match EditorConfig::from_json_str(config_json) {
        Ok(_) => serde_json::json!({ "ok": true }).to_string(),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}

/// Project a normalized box onto a page of the given size. Returns the
/// pixel box as JSON, or `null` for an unusable page.
#[wasm_bindgen]
pub fn project_box(
    x_center: f64,
    y_center: f64,
    width: f64,
    height: f64,
    page_width: f64,
    page_height: f64,
) -> String {
    let page = PageRect::new(page_width, page_height);
    if !page.is_usable() {
        return "null".to_string();
    }
    let px = dm_core::to_pixels(&dm_core::NormBox::new(x_center, y_center, width, height), &page);
    serde_json::to_string(&px).unwrap_or_else(|_| "null".to_string())
}
