//! Interaction engine: pointer gestures → store commands.
//!
//! The engine never mutates the store. It reads the store for hit testing
//! and returns [`StoreCommand`]s that the session applies, so every gesture
//! commits all at once or not at all.
//!
//! ## Gestures
//!
//! | State | Entered by | Left by |
//! |-------|------------|---------|
//! | `Drawing` | pointer-down on empty page with an active draw context | pointer-up (→ `PendingLabel` or dropped) |
//! | `PendingLabel` | a non-empty draw | [`InteractionEngine::confirm_label`] / cancel |
//! | `Pressed` | pointer-down on a box body | pointer-move (→ `Dragging`) or pointer-up |
//! | `Dragging` | moving a pressed box | pointer-up (commit) |
//! | `Resizing` | pointer-down on a selected box's handle | pointer-up (commit) |
//!
//! Pixel-space gestures remember the page rectangle they started on; any
//! change of page rectangle cancels them. Drags and resizes also keep the
//! stored normalized box, so a commit only changes the components the
//! pointer actually moved.

use crate::input::InputEvent;
use crate::transform::TransientTransform;
use dm_core::id::AnnotationId;
use dm_core::model::{AnnotationPatch, Category, NewAnnotation};
use dm_core::geometry::to_pixels_exact;
use dm_core::{AnnotationStore, NormBox, PageRect, PixelBox, to_normalized};
use dm_render::{Handle, HitTarget, Transient, pick};
use kurbo::Point;
use smallvec::{SmallVec, smallvec};

/// A store mutation requested by the engine or the properties editor.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    Add { new: NewAnnotation, select: bool },
    Update { id: AnnotationId, patch: AnnotationPatch },
    Remove(AnnotationId),
    Select(Option<AnnotationId>),
}

/// Something the host should tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A draw was attempted with no category/label chosen.
    CategoryRequired,
    /// A draw finished; prompt for a label, then call `confirm_label` or
    /// `cancel`.
    LabelRequested,
    /// The page rectangle is not known yet; the pointer-down was ignored.
    PageUnavailable,
}

pub type Commands = SmallVec<[StoreCommand; 2]>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub commands: Commands,
    pub signal: Option<Signal>,
    /// Transient state changed; the overlay needs repainting.
    pub redraw: bool,
}

impl Response {
    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::default()
        }
    }

    fn signal(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            ..Self::default()
        }
    }

    fn commit(command: StoreCommand) -> Self {
        Self {
            commands: smallvec![command],
            redraw: true,
            signal: None,
        }
    }
}

/// The category/label new drawings get. Drawing is refused while neither
/// is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawContext {
    pub category: Option<String>,
    pub label: Option<String>,
}

impl DrawContext {
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            category: Some(name.into()),
            label: None,
        }
    }

    pub fn is_active(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.category) || set(&self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing {
        origin: Point,
        current: Point,
        page: PageRect,
    },
    /// Held in normalized space so it survives page changes while the
    /// label prompt is open.
    PendingLabel { draft: NormBox },
    /// `original` is `bbox` projected without snapping.
    Pressed {
        id: AnnotationId,
        start: Point,
        bbox: NormBox,
        original: PixelBox,
        page: PageRect,
    },
    Dragging {
        id: AnnotationId,
        start: Point,
        bbox: NormBox,
        original: PixelBox,
        page: PageRect,
        transform: TransientTransform,
    },
    Resizing {
        id: AnnotationId,
        handle: Handle,
        start: Point,
        bbox: NormBox,
        original: PixelBox,
        page: PageRect,
        transform: TransientTransform,
    },
}

impl Gesture {
    /// The page rectangle a pixel-space gesture is bound to.
    fn page(&self) -> Option<PageRect> {
        match *self {
            Gesture::Drawing { page, .. }
            | Gesture::Pressed { page, .. }
            | Gesture::Dragging { page, .. }
            | Gesture::Resizing { page, .. } => Some(page),
            Gesture::Idle | Gesture::PendingLabel { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionEngine {
    gesture: Gesture,
    context: DrawContext,
    handle_radius: f64,
}

impl InteractionEngine {
    pub fn new(handle_radius: f64) -> Self {
        Self {
            gesture: Gesture::Idle,
            context: DrawContext::default(),
            handle_radius,
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    pub fn context(&self) -> &DrawContext {
        &self.context
    }

    pub fn set_context(&mut self, context: DrawContext) {
        self.context = context;
    }

    /// Current draw box, positive extents, in the gesture's page pixels.
    pub fn draft_box(&self) -> Option<PixelBox> {
        match self.gesture {
            Gesture::Drawing {
                origin, current, ..
            } => Some(PixelBox::from_corners(origin.x, origin.y, current.x, current.y)),
            _ => None,
        }
    }

    /// The live box of an annotation being dragged or resized.
    pub fn preview(&self) -> Option<(AnnotationId, PixelBox)> {
        match self.gesture {
            Gesture::Dragging {
                id,
                original,
                transform,
                ..
            }
            | Gesture::Resizing {
                id,
                original,
                transform,
                ..
            } => Some((id, transform.apply(&original))),
            _ => None,
        }
    }

    pub fn transient(&self) -> Transient {
        Transient {
            draft: self.draft_box(),
            preview: self.preview(),
        }
    }

    /// Label to pre-fill the prompt with while a label is pending.
    pub fn label_hint(&self) -> Option<&str> {
        match self.gesture {
            Gesture::PendingLabel { .. } => self.context.label.as_deref(),
            _ => None,
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Feed one pointer event. Key events are resolved by the session and
    /// ignored here.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        store: &AnnotationStore,
        categories: &[Category],
        page: Option<&PageRect>,
    ) -> Response {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                self.pointer_down(Point::new(x, y), store, categories, page)
            }
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(Point::new(x, y)),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(Point::new(x, y)),
            InputEvent::Cancel => self.cancel(),
            InputEvent::Key { .. } => Response::default(),
        }
    }

    fn pointer_down(
        &mut self,
        p: Point,
        store: &AnnotationStore,
        categories: &[Category],
        page: Option<&PageRect>,
    ) -> Response {
        if !self.is_idle() {
            log::debug!("pointer-down ignored during {:?}", self.gesture);
            return Response::default();
        }
        let Some(page) = page.copied().filter(PageRect::is_usable) else {
            log::debug!("pointer-down at {p:?} before the page rectangle is known");
            return Response::signal(Signal::PageUnavailable);
        };

        match pick(store, categories, &page, p.x, p.y, self.handle_radius) {
            Some(hit) => {
                let Some(rec) = store.get(hit.id) else {
                    return Response::default();
                };
                let bbox = rec.bbox;
                let original = to_pixels_exact(&bbox, &page);
                self.gesture = match hit.target {
                    HitTarget::Handle(handle) => Gesture::Resizing {
                        id: hit.id,
                        handle,
                        start: p,
                        bbox,
                        original,
                        page,
                        transform: TransientTransform::IDENTITY,
                    },
                    HitTarget::Body => Gesture::Pressed {
                        id: hit.id,
                        start: p,
                        bbox,
                        original,
                        page,
                    },
                };
                log::debug!("gesture -> {:?}", self.gesture);
                if store.selected() == Some(hit.id) {
                    Response::redraw()
                } else {
                    Response::commit(StoreCommand::Select(Some(hit.id)))
                }
            }
            None if !self.context.is_active() => Response::signal(Signal::CategoryRequired),
            None => {
                self.gesture = Gesture::Drawing {
                    origin: p,
                    current: p,
                    page,
                };
                log::debug!("gesture -> {:?}", self.gesture);
                // The selection is left alone until the draw commits, so a
                // cancelled draw leaves the store untouched.
                Response::redraw()
            }
        }
    }

    fn pointer_move(&mut self, p: Point) -> Response {
        if let Gesture::Pressed {
            id,
            start,
            bbox,
            original,
            page,
        } = self.gesture
        {
            if p == start {
                return Response::default();
            }
            self.gesture = Gesture::Dragging {
                id,
                start,
                bbox,
                original,
                page,
                transform: TransientTransform::translate(p.x - start.x, p.y - start.y),
            };
            log::debug!("gesture -> {:?}", self.gesture);
            return Response::redraw();
        }
        match &mut self.gesture {
            Gesture::Drawing { current, .. } => {
                *current = p;
                Response::redraw()
            }
            Gesture::Dragging {
                start, transform, ..
            } => {
                *transform = TransientTransform::translate(p.x - start.x, p.y - start.y);
                Response::redraw()
            }
            Gesture::Resizing {
                handle,
                start,
                original,
                transform,
                ..
            } => {
                *transform =
                    TransientTransform::resize(original, *handle, p.x - start.x, p.y - start.y);
                Response::redraw()
            }
            Gesture::Idle | Gesture::Pressed { .. } | Gesture::PendingLabel { .. } => {
                Response::default()
            }
        }
    }

    fn pointer_up(&mut self, p: Point) -> Response {
        // Land the final pointer position before committing.
        self.pointer_move(p);
        match std::mem::take(&mut self.gesture) {
            Gesture::Drawing {
                origin,
                current,
                page,
            } => {
                let draft =
                    PixelBox::from_corners(origin.x, origin.y, current.x, current.y).clip_to(&page);
                match normalize_commit(&draft, &page) {
                    Some(draft) => {
                        self.gesture = Gesture::PendingLabel { draft };
                        Response {
                            redraw: true,
                            signal: Some(Signal::LabelRequested),
                            ..Response::default()
                        }
                    }
                    None => Response::redraw(),
                }
            }
            Gesture::Pressed { .. } => Response::default(),
            Gesture::Dragging {
                id,
                bbox,
                original,
                page,
                mut transform,
                ..
            } => {
                let moved = transform.commit(&original).shift_inside(&page);
                let (dx, dy) = (moved.x - original.x, moved.y - original.y);
                if dx == 0.0 && dy == 0.0 {
                    return Response::redraw();
                }
                // Size never changes on a drag; only the centre moves.
                let moved = NormBox {
                    x_center: bbox.x_center + dx / page.width,
                    y_center: bbox.y_center + dy / page.height,
                    ..bbox
                };
                Response::commit(StoreCommand::Update {
                    id,
                    patch: AnnotationPatch::bbox(moved),
                })
            }
            Gesture::Resizing {
                id,
                handle,
                bbox,
                original,
                page,
                mut transform,
                ..
            } => {
                let resized = transform.commit(&original).clip_to(&page);
                if resized == original {
                    return Response::redraw();
                }
                match normalize_commit(&resized, &page) {
                    Some(resized) => Response::commit(StoreCommand::Update {
                        id,
                        patch: AnnotationPatch::bbox(keep_untouched_axes(&bbox, handle, resized)),
                    }),
                    None => Response::redraw(),
                }
            }
            pending @ Gesture::PendingLabel { .. } => {
                self.gesture = pending;
                Response::default()
            }
            Gesture::Idle => Response::default(),
        }
    }

    /// Finish a pending draw. A blank label stores the placeholder label.
    /// The new annotation becomes the selection.
    pub fn confirm_label(&mut self, label: &str) -> Response {
        let Gesture::PendingLabel { draft } = self.gesture else {
            return Response::default();
        };
        self.gesture = Gesture::Idle;
        let label = label.trim();
        let new = NewAnnotation {
            label: (!label.is_empty()).then(|| label.to_string()),
            category: self.context.category.clone(),
            bbox: Some(draft),
            ..NewAnnotation::default()
        };
        Response::commit(StoreCommand::Add { new, select: true })
    }

    /// Abandon whatever is in flight. The store is never touched.
    pub fn cancel(&mut self) -> Response {
        if self.is_idle() {
            return Response::default();
        }
        log::debug!("gesture cancelled: {:?}", self.gesture);
        self.gesture = Gesture::Idle;
        Response::redraw()
    }

    /// React to a new page rectangle. Returns `true` if a pixel-space
    /// gesture was cancelled because its frame is gone.
    pub fn page_changed(&mut self, page: Option<&PageRect>) -> bool {
        match self.gesture.page() {
            Some(bound) if page != Some(&bound) => {
                log::debug!("page changed mid-gesture; cancelling {:?}", self.gesture);
                self.gesture = Gesture::Idle;
                true
            }
            _ => false,
        }
    }
}

fn normalize_commit(px: &PixelBox, page: &PageRect) -> Option<NormBox> {
    if px.is_degenerate() {
        log::debug!("dropping zero-area box {px:?}");
        return None;
    }
    match to_normalized(px, page) {
        Ok(b) if !b.is_degenerate() => Some(b),
        Ok(_) => None,
        Err(err) => {
            log::debug!("cannot commit {px:?}: {err}");
            None
        }
    }
}

/// A handle only moves the edges it grips; the other axis keeps the stored
/// centre and extent.
fn keep_untouched_axes(stored: &NormBox, handle: Handle, mut resized: NormBox) -> NormBox {
    let edges = handle.edges();
    if !edges.left && !edges.right {
        resized.x_center = stored.x_center;
        resized.width = stored.width;
    }
    if !edges.top && !edges.bottom {
        resized.y_center = stored.y_center;
        resized.height = stored.height;
    }
    resized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use pretty_assertions::assert_eq;

    const PAGE: PageRect = PageRect::new(800.0, 1000.0);

    fn down(x: f64, y: f64) -> InputEvent {
        InputEvent::from_pointer_down(x, y, Modifiers::NONE)
    }
    fn mv(x: f64, y: f64) -> InputEvent {
        InputEvent::from_pointer_move(x, y, Modifiers::NONE)
    }
    fn up(x: f64, y: f64) -> InputEvent {
        InputEvent::from_pointer_up(x, y, Modifiers::NONE)
    }

    fn engine() -> InteractionEngine {
        let mut e = InteractionEngine::new(6.0);
        e.set_context(DrawContext::category("Valve"));
        e
    }

    fn store_with_box() -> (AnnotationStore, AnnotationId) {
        let mut store = AnnotationStore::default();
        let bbox = to_normalized(&PixelBox::new(100.0, 100.0, 50.0, 40.0), &PAGE).unwrap();
        let id = store.add(NewAnnotation::with_bbox(bbox)).unwrap();
        (store, id)
    }

    /// The box of the single `Update` in `r`.
    fn updated_box(r: &Response, expected_id: AnnotationId) -> NormBox {
        match r.commands.as_slice() {
            [StoreCommand::Update { id, patch }] if *id == expected_id => {
                patch.bbox.expect("update should carry a bbox")
            }
            other => panic!("expected one bbox update, got {other:?}"),
        }
    }

    #[test]
    fn draw_then_label_adds_selected_annotation() {
        let store = AnnotationStore::default();
        let mut e = engine();
        e.handle(&down(150.0, 140.0), &store, &[], Some(&PAGE));
        e.handle(&mv(120.0, 120.0), &store, &[], Some(&PAGE));
        assert_eq!(e.draft_box(), Some(PixelBox::new(120.0, 120.0, 30.0, 20.0)));
        let r = e.handle(&up(100.0, 100.0), &store, &[], Some(&PAGE));
        assert_eq!(r.signal, Some(Signal::LabelRequested));
        assert!(r.commands.is_empty());

        let r = e.confirm_label("Valve");
        assert!(e.is_idle());
        match &r.commands[0] {
            StoreCommand::Add { new, select } => {
                assert!(*select);
                assert_eq!(new.label.as_deref(), Some("Valve"));
                assert_eq!(new.category.as_deref(), Some("Valve"));
                assert!(
                    new.bbox
                        .unwrap()
                        .approx_eq(&NormBox::new(0.15625, 0.12, 0.0625, 0.04), 1e-12)
                );
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn zero_area_draw_is_dropped_silently() {
        let store = AnnotationStore::default();
        let mut e = engine();
        e.handle(&down(100.0, 100.0), &store, &[], Some(&PAGE));
        let r = e.handle(&up(100.0, 180.0), &store, &[], Some(&PAGE));
        assert!(r.commands.is_empty());
        assert_eq!(r.signal, None);
        assert!(e.is_idle());
    }

    #[test]
    fn draw_without_context_is_rejected() {
        let store = AnnotationStore::default();
        let mut e = InteractionEngine::new(6.0);
        let r = e.handle(&down(10.0, 10.0), &store, &[], Some(&PAGE));
        assert_eq!(r.signal, Some(Signal::CategoryRequired));
        assert!(e.is_idle());
    }

    #[test]
    fn pointer_down_without_page_is_deferred() {
        let store = AnnotationStore::default();
        let mut e = engine();
        let r = e.handle(&down(10.0, 10.0), &store, &[], None);
        assert_eq!(r.signal, Some(Signal::PageUnavailable));
        let r = e.handle(&down(10.0, 10.0), &store, &[], Some(&PageRect::new(0.0, 0.0)));
        assert_eq!(r.signal, Some(Signal::PageUnavailable));
        assert!(e.is_idle());
    }

    #[test]
    fn click_selects_and_drag_commits_once() {
        let (store, id) = store_with_box();
        let mut e = engine();
        let r = e.handle(&down(120.0, 120.0), &store, &[], Some(&PAGE));
        assert_eq!(r.commands.to_vec(), vec![StoreCommand::Select(Some(id))]);
        let r = e.handle(&mv(140.0, 130.0), &store, &[], Some(&PAGE));
        assert!(r.commands.is_empty());
        let (preview_id, preview) = e.preview().unwrap();
        assert_eq!(preview_id, id);
        assert!((preview.x - 120.0).abs() < 1e-9 && (preview.y - 110.0).abs() < 1e-9);
        let r = e.handle(&up(160.0, 140.0), &store, &[], Some(&PAGE));
        let expected = to_normalized(&PixelBox::new(140.0, 120.0, 50.0, 40.0), &PAGE).unwrap();
        assert!(updated_box(&r, id).approx_eq(&expected, 1e-12));
    }

    #[test]
    fn click_without_move_only_selects() {
        let (store, _) = store_with_box();
        let mut e = engine();
        e.handle(&down(120.0, 120.0), &store, &[], Some(&PAGE));
        let r = e.handle(&up(120.0, 120.0), &store, &[], Some(&PAGE));
        assert!(r.commands.is_empty());
        assert!(e.is_idle());
    }

    #[test]
    fn drag_is_kept_inside_page() {
        let (store, id) = store_with_box();
        let mut e = engine();
        e.handle(&down(120.0, 120.0), &store, &[], Some(&PAGE));
        let r = e.handle(&up(-500.0, 120.0), &store, &[], Some(&PAGE));
        let expected = to_normalized(&PixelBox::new(0.0, 100.0, 50.0, 40.0), &PAGE).unwrap();
        assert!(updated_box(&r, id).approx_eq(&expected, 1e-12));
    }

    #[test]
    fn resize_via_selected_handle() {
        let (mut store, id) = store_with_box();
        store.select(Some(id)).unwrap();
        let mut e = engine();
        let r = e.handle(&down(150.0, 140.0), &store, &[], Some(&PAGE));
        assert!(matches!(
            e.gesture(),
            Gesture::Resizing {
                handle: Handle::BottomRight,
                ..
            }
        ));
        assert!(r.commands.is_empty());
        let r = e.handle(&up(200.0, 160.0), &store, &[], Some(&PAGE));
        let expected = to_normalized(&PixelBox::new(100.0, 100.0, 100.0, 60.0), &PAGE).unwrap();
        assert!(updated_box(&r, id).approx_eq(&expected, 1e-12));
    }

    #[test]
    fn drag_moves_only_the_centre_on_an_odd_sized_page() {
        let page = PageRect::new(613.0, 867.0);
        let stored = NormBox::new(0.5, 0.5, 0.031, 0.2);
        let mut store = AnnotationStore::default();
        let id = store.add(NewAnnotation::with_bbox(stored)).unwrap();
        let mut e = engine();
        e.handle(&down(306.0, 433.0), &store, &[], Some(&page));
        let r = e.handle(&up(316.0, 433.0), &store, &[], Some(&page));
        let moved = updated_box(&r, id);
        assert_eq!(moved.width, stored.width);
        assert_eq!(moved.height, stored.height);
        assert_eq!(moved.y_center, stored.y_center);
        assert!((moved.x_center - (0.5 + 10.0 / 613.0)).abs() < 1e-12);
    }

    #[test]
    fn sub_pixel_box_can_still_be_dragged() {
        let stored = NormBox::new(0.5, 0.5, 0.0005, 0.2);
        let mut store = AnnotationStore::default();
        let id = store.add(NewAnnotation::with_bbox(stored)).unwrap();
        let mut e = engine();
        let r = e.handle(&down(400.0, 500.0), &store, &[], Some(&PAGE));
        assert_eq!(r.commands.to_vec(), vec![StoreCommand::Select(Some(id))]);
        let r = e.handle(&up(450.0, 500.0), &store, &[], Some(&PAGE));
        let moved = updated_box(&r, id);
        assert_eq!(moved.width, stored.width);
        assert_eq!(moved.height, stored.height);
        assert!((moved.x_center - 0.5625).abs() < 1e-12);
    }

    #[test]
    fn edge_handle_resize_keeps_the_other_axis_exact() {
        let page = PageRect::new(613.0, 867.0);
        let stored = NormBox::new(0.5, 0.5, 0.031, 0.2);
        let mut store = AnnotationStore::default();
        let id = store.add(NewAnnotation::with_bbox(stored)).unwrap();
        store.select(Some(id)).unwrap();
        let grip = Handle::Right.position(&dm_core::to_pixels(&stored, &page));
        let mut e = engine();
        e.handle(&down(grip.x, grip.y), &store, &[], Some(&page));
        assert!(matches!(
            e.gesture(),
            Gesture::Resizing {
                handle: Handle::Right,
                ..
            }
        ));
        let r = e.handle(&up(grip.x + 20.0, grip.y + 7.0), &store, &[], Some(&page));
        let resized = updated_box(&r, id);
        assert_eq!(resized.y_center, stored.y_center);
        assert_eq!(resized.height, stored.height);
        assert!((resized.width - (stored.width + 20.0 / 613.0)).abs() < 1e-12);
        assert!((resized.left() - stored.left()).abs() < 1e-12);
    }

    #[test]
    fn draw_start_leaves_the_selection_alone() {
        let (mut store, id) = store_with_box();
        store.select(Some(id)).unwrap();
        let mut e = engine();
        let r = e.handle(&down(500.0, 500.0), &store, &[], Some(&PAGE));
        assert!(r.commands.is_empty());
        assert!(r.redraw);
        assert!(matches!(e.gesture(), Gesture::Drawing { .. }));
    }

    #[test]
    fn resize_collapsing_to_zero_is_dropped() {
        let (mut store, id) = store_with_box();
        store.select(Some(id)).unwrap();
        let mut e = engine();
        e.handle(&down(150.0, 120.0), &store, &[], Some(&PAGE));
        let r = e.handle(&up(100.0, 120.0), &store, &[], Some(&PAGE));
        assert!(r.commands.is_empty());
        assert!(e.is_idle());
    }

    #[test]
    fn cancel_discards_every_gesture() {
        let (store, _) = store_with_box();
        let mut e = engine();
        e.handle(&down(120.0, 120.0), &store, &[], Some(&PAGE));
        e.handle(&mv(300.0, 300.0), &store, &[], Some(&PAGE));
        let r = e.handle(&InputEvent::Cancel, &store, &[], Some(&PAGE));
        assert!(r.commands.is_empty());
        assert!(e.is_idle());

        e.handle(&down(400.0, 400.0), &store, &[], Some(&PAGE));
        e.handle(&up(450.0, 450.0), &store, &[], Some(&PAGE));
        assert!(matches!(e.gesture(), Gesture::PendingLabel { .. }));
        let r = e.cancel();
        assert!(r.commands.is_empty());
        assert!(e.confirm_label("late").commands.is_empty());
    }

    #[test]
    fn page_change_cancels_pixel_gestures_but_not_pending_label() {
        let store = AnnotationStore::default();
        let mut e = engine();
        e.handle(&down(10.0, 10.0), &store, &[], Some(&PAGE));
        assert!(!e.page_changed(Some(&PAGE)));
        assert!(e.page_changed(Some(&PageRect::new(880.0, 1100.0))));
        assert!(e.is_idle());

        e.handle(&down(10.0, 10.0), &store, &[], Some(&PAGE));
        e.handle(&up(60.0, 60.0), &store, &[], Some(&PAGE));
        assert!(!e.page_changed(None));
        assert_eq!(e.confirm_label("  ").commands.len(), 1);
    }
}
