//! Integration tests: end-to-end editing sessions (dm-editor).
//!
//! Drives `AnnotationSession` with pointer and key events the way a host
//! would and checks what ends up in the store.

use dm_core::analysis::{AnalysisItem, AnalysisSource, LooseBox, MountGuard, SourceError};
use dm_core::id::AnnotationId;
use dm_core::model::NewAnnotation;
use dm_core::{
    AnnotationStore, EditorConfig, NormBox, PageRect, PixelBox, StoreChange, to_normalized,
    to_pixels,
};
use dm_editor::{AnnotationSession, DrawContext, InputEvent, Modifiers, Signal};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

const PAGE: PageRect = PageRect::new(800.0, 1000.0);

fn session() -> AnnotationSession {
    let mut s = AnnotationSession::new(EditorConfig::default());
    s.set_page(Some(PAGE));
    s.set_context(DrawContext::category("Valve"));
    s
}

fn down(x: f64, y: f64) -> InputEvent {
    InputEvent::from_pointer_down(x, y, Modifiers::NONE)
}

fn mv(x: f64, y: f64) -> InputEvent {
    InputEvent::from_pointer_move(x, y, Modifiers::NONE)
}

fn up(x: f64, y: f64) -> InputEvent {
    InputEvent::from_pointer_up(x, y, Modifiers::NONE)
}

fn click(s: &mut AnnotationSession, x: f64, y: f64) {
    s.handle_input(&down(x, y));
    s.handle_input(&up(x, y));
}

fn add_px(s: &mut AnnotationSession, b: PixelBox) -> AnnotationId {
    let bbox = to_normalized(&b, &PAGE).unwrap();
    s.apply(dm_editor::StoreCommand::Add {
        new: NewAnnotation::with_bbox(bbox),
        select: false,
    });
    s.store().records().last().unwrap().id
}

// ─── Drawing ────────────────────────────────────────────────────────────

#[test]
fn draw_and_label_stores_normalized_box() {
    let mut s = session();
    s.handle_input(&down(100.0, 100.0));
    s.handle_input(&mv(130.0, 120.0));
    let outcome = s.handle_input(&up(150.0, 140.0));
    assert_eq!(outcome.signal, Some(Signal::LabelRequested));
    assert!(s.store().is_empty(), "nothing is stored before the label");

    let outcome = s.confirm_label("Valve");
    assert!(outcome.changed);
    assert_eq!(s.store().len(), 1);
    let rec = &s.store().records()[0];
    assert_eq!(rec.label, "Valve");
    assert_eq!(rec.category.as_deref(), Some("Valve"));
    assert!(
        rec.bbox
            .approx_eq(&NormBox::new(0.15625, 0.12, 0.0625, 0.04), 1e-12),
        "got {:?}",
        rec.bbox
    );
    assert_eq!(s.store().selected(), Some(rec.id));
}

#[test]
fn drawing_backwards_normalizes_the_box() {
    let mut s = session();
    s.handle_input(&down(150.0, 140.0));
    s.handle_input(&up(100.0, 100.0));
    s.confirm_label("");
    let rec = &s.store().records()[0];
    assert_eq!(rec.label, "New Annotation");
    assert_eq!(to_pixels(&rec.bbox, &PAGE), PixelBox::new(100.0, 100.0, 50.0, 40.0));
}

#[test]
fn zero_area_draw_stores_nothing() {
    let mut s = session();
    for (x, y) in [(100.0, 200.0), (300.0, 100.0), (100.0, 100.0)] {
        s.handle_input(&down(100.0, 100.0));
        let outcome = s.handle_input(&up(x, y));
        assert_eq!(outcome.signal, None);
        assert!(!outcome.changed);
    }
    assert!(s.store().is_empty());
    assert!(s.engine().is_idle());
}

#[test]
fn draw_without_category_is_rejected() {
    let mut s = session();
    s.set_context(DrawContext::default());
    let outcome = s.handle_input(&down(100.0, 100.0));
    assert_eq!(outcome.signal, Some(Signal::CategoryRequired));
    s.handle_input(&up(200.0, 200.0));
    assert!(s.store().is_empty());
    assert!(s.engine().is_idle());
}

#[test]
fn enter_confirms_with_context_label() {
    let mut s = session();
    s.set_context(DrawContext {
        category: Some("Pipe".into()),
        label: Some("Line 4".into()),
    });
    s.handle_input(&down(10.0, 10.0));
    s.handle_input(&up(60.0, 60.0));
    s.handle_input(&InputEvent::from_key("Enter", Modifiers::NONE));
    assert_eq!(s.store().records()[0].label, "Line 4");
}

#[test]
fn escape_discards_pending_label() {
    let mut s = session();
    s.handle_input(&down(10.0, 10.0));
    s.handle_input(&up(60.0, 60.0));
    s.handle_input(&InputEvent::from_key("Escape", Modifiers::NONE));
    assert!(s.engine().is_idle());
    assert!(!s.confirm_label("late").changed);
    assert!(s.store().is_empty());
}

// ─── Selection ──────────────────────────────────────────────────────────

#[test]
fn click_on_overlap_selects_topmost() {
    let mut s = session();
    let _below = add_px(&mut s, PixelBox::new(100.0, 100.0, 200.0, 200.0));
    let above = add_px(&mut s, PixelBox::new(150.0, 150.0, 200.0, 200.0));
    click(&mut s, 175.0, 175.0);
    assert_eq!(s.store().selected(), Some(above));
}

#[test]
fn selecting_another_replaces_selection() {
    let mut s = session();
    let a = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 50.0));
    let b = add_px(&mut s, PixelBox::new(400.0, 400.0, 50.0, 50.0));
    click(&mut s, 120.0, 120.0);
    assert_eq!(s.store().selected(), Some(a));
    click(&mut s, 420.0, 420.0);
    assert_eq!(s.store().selected(), Some(b));
}

#[test]
fn delete_selected_clears_selection_and_removes_one() {
    let mut s = session();
    let a = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 50.0));
    let b = add_px(&mut s, PixelBox::new(400.0, 400.0, 50.0, 50.0));
    let c = add_px(&mut s, PixelBox::new(600.0, 600.0, 50.0, 50.0));
    s.select(Some(b)).unwrap();
    let before_a = s.store().get(a).cloned();
    s.handle_input(&InputEvent::from_key("Delete", Modifiers::NONE));
    assert_eq!(s.store().selected(), None);
    assert_eq!(s.store().len(), 2);
    assert_eq!(s.store().get(a).cloned(), before_a);
    assert!(s.store().contains(c));
    assert!(!s.store().contains(b));
}

// ─── Drag and resize ────────────────────────────────────────────────────

#[test]
fn drag_moves_box_by_pointer_delta() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    s.handle_input(&down(110.0, 110.0));
    s.handle_input(&mv(150.0, 150.0));
    let stored = to_pixels(&s.store().get(id).unwrap().bbox, &PAGE);
    assert_eq!(stored, PixelBox::new(100.0, 100.0, 50.0, 40.0), "drag is not committed early");
    s.handle_input(&up(210.0, 160.0));
    let moved = to_pixels(&s.store().get(id).unwrap().bbox, &PAGE);
    assert_eq!(moved, PixelBox::new(200.0, 150.0, 50.0, 40.0));
}

#[test]
fn repeated_resizes_do_not_compound() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    s.select(Some(id)).unwrap();
    for _ in 0..5 {
        let b = to_pixels(&s.store().get(id).unwrap().bbox, &PAGE);
        s.handle_input(&down(b.right(), b.bottom()));
        s.handle_input(&mv(b.right() + 5.0, b.bottom() + 5.0));
        s.handle_input(&up(b.right() + 10.0, b.bottom() + 10.0));
    }
    let expected = to_normalized(&PixelBox::new(100.0, 100.0, 100.0, 90.0), &PAGE).unwrap();
    let got = s.store().get(id).unwrap().bbox;
    assert!(got.approx_eq(&expected, 1e-9), "got {got:?}, want {expected:?}");
}

#[test]
fn escape_mid_drag_leaves_store_untouched() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    let original = s.store().get(id).unwrap().bbox;
    s.handle_input(&down(110.0, 110.0));
    s.handle_input(&mv(300.0, 300.0));
    let revision = s.store().revision();
    s.handle_input(&InputEvent::from_key("Escape", Modifiers::NONE));
    s.handle_input(&up(300.0, 300.0));
    assert_eq!(s.store().revision(), revision);
    assert_eq!(s.store().get(id).unwrap().bbox, original);
}

#[test]
fn escape_mid_draw_keeps_selection_and_revision() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    s.select(Some(id)).unwrap();
    let revision = s.store().revision();
    let down_outcome = s.handle_input(&down(500.0, 500.0));
    assert!(!down_outcome.changed);
    s.handle_input(&mv(560.0, 540.0));
    s.handle_input(&InputEvent::from_key("Escape", Modifiers::NONE));
    s.handle_input(&up(560.0, 540.0));
    assert_eq!(s.store().revision(), revision);
    assert_eq!(s.store().selected(), Some(id));
    assert_eq!(s.store().len(), 1);
}

#[test]
fn zero_area_click_on_empty_page_keeps_selection() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    s.select(Some(id)).unwrap();
    let revision = s.store().revision();
    click(&mut s, 500.0, 500.0);
    assert_eq!(s.store().revision(), revision);
    assert_eq!(s.store().selected(), Some(id));
}

#[test]
fn page_change_mid_drag_cancels_gesture() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    let original = s.store().get(id).unwrap().bbox;
    s.handle_input(&down(110.0, 110.0));
    s.handle_input(&mv(300.0, 300.0));
    assert!(s.set_page(Some(PageRect::new(1200.0, 1500.0))));
    s.handle_input(&up(300.0, 300.0));
    assert_eq!(s.store().get(id).unwrap().bbox, original);
}

#[test]
fn boxes_survive_zoom_as_fractions() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    s.set_page(Some(PageRect::new(1600.0, 2000.0)));
    let b = to_pixels(&s.store().get(id).unwrap().bbox, &s.page().unwrap());
    assert_eq!(b, PixelBox::new(200.0, 200.0, 100.0, 80.0));
}

// ─── Subscribers, properties, persistence ───────────────────────────────

#[test]
fn subscribers_observe_complete_mutations() {
    let mut s = session();
    let seen: Rc<RefCell<Vec<(StoreChange, usize, Option<AnnotationId>)>>> = Rc::default();
    let sink = seen.clone();
    s.subscribe(Box::new(move |change: &StoreChange, store: &AnnotationStore| {
        if let StoreChange::Added(id) = change {
            assert!(store.contains(*id));
        }
        sink.borrow_mut().push((*change, store.len(), store.selected()));
    }));
    s.handle_input(&down(100.0, 100.0));
    s.handle_input(&up(150.0, 140.0));
    s.confirm_label("Valve");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    let id = s.store().records()[0].id;
    assert_eq!(seen[0], (StoreChange::Added(id), 1, None));
    assert_eq!(
        seen[1],
        (
            StoreChange::Selected {
                previous: None,
                current: Some(id)
            },
            1,
            Some(id)
        )
    );
}

#[test]
fn properties_save_updates_fields_and_closes() {
    let mut s = session();
    let id = add_px(&mut s, PixelBox::new(100.0, 100.0, 50.0, 40.0));
    click(&mut s, 120.0, 120.0);
    let mut form = s.properties().unwrap();
    assert_eq!(form.get("label"), Some("New Annotation"));
    form.set("label", "PT-101");
    form.set("designSpecification1", "150#");
    let outcome = s.save_properties(form);
    assert!(outcome.changed);
    let rec = s.store().get(id).unwrap();
    assert_eq!(rec.label, "PT-101");
    assert_eq!(rec.fields["designSpecification1"], "150#");
    assert_eq!(s.store().selected(), None);
    assert!(s.properties().is_none());
}

#[test]
fn properties_delete_removes_and_closes() {
    let mut s = session();
    let id = s.add_default().unwrap();
    let form = s.properties().unwrap();
    s.delete_properties(form);
    assert!(!s.store().contains(id));
    assert_eq!(s.store().selected(), None);
}

#[test]
fn json_round_trip_rebuilds_store() {
    let mut s = session();
    s.handle_input(&down(100.0, 100.0));
    s.handle_input(&up(150.0, 140.0));
    s.confirm_label("Valve");
    s.add_default().unwrap();
    let json = s.to_json().unwrap();

    let mut restored = AnnotationSession::new(EditorConfig::default());
    restored.load_json(&json).unwrap();
    assert_eq!(restored.store().records(), s.store().records());
    assert_eq!(restored.store().selected(), None);
}

#[test]
fn overlay_is_empty_until_page_known() {
    let mut s = AnnotationSession::new(EditorConfig::default());
    s.add_default().unwrap();
    assert!(s.overlay(&Default::default()).is_empty());
    let outcome = s.handle_input(&down(10.0, 10.0));
    assert_eq!(outcome.signal, Some(Signal::PageUnavailable));
    s.set_page(Some(PAGE));
    assert!(!s.overlay(&Default::default()).is_empty());
}

// ─── Analysis source ────────────────────────────────────────────────────

struct Detections;

impl AnalysisSource for Detections {
    async fn fetch(&self) -> Result<Vec<AnalysisItem>, SourceError> {
        Ok(vec![
            AnalysisItem {
                class: Some("valve".into()),
                confidence: Some(0.91),
                bbox: Some(LooseBox {
                    x_center: 0.5,
                    y_center: 0.5,
                    width: 0.1,
                    height: 0.1,
                }),
                ..AnalysisItem::default()
            },
            AnalysisItem {
                bbox: Some(LooseBox::default()),
                ..AnalysisItem::default()
            },
        ])
    }
}

#[tokio::test]
async fn initial_load_applies_while_mounted() {
    let mut s = session();
    let guard = MountGuard::mounted();
    let added = s.load_analysis(&Detections, &guard).await.unwrap();
    assert_eq!(added, 1);
    let rec = &s.store().records()[0];
    assert_eq!(rec.label, "valve");
    assert_eq!(rec.confidence, Some(0.91));
}

#[tokio::test]
async fn initial_load_after_unmount_is_discarded() {
    let mut s = session();
    let guard = MountGuard::mounted();
    guard.unmount();
    let added = s.load_analysis(&Detections, &guard).await.unwrap();
    assert_eq!(added, 0);
    assert!(s.store().is_empty());
}
