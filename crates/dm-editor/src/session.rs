//! Editing session: the hub that owns the store and applies commands.
//!
//! Input flows host → [`AnnotationSession::handle_input`] → interaction
//! engine → [`StoreCommand`]s → store → subscribers. All of it runs on the
//! caller's thread, one event at a time, so a subscriber never observes a
//! half-applied gesture.

use crate::input::InputEvent;
use crate::interaction::{DrawContext, InteractionEngine, Response, Signal, StoreCommand};
use crate::properties::PropertiesForm;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use dm_core::analysis::{AnalysisItem, AnalysisSource, MountGuard, SourceError, load_once};
use dm_core::export::{CocoSummary, coco_summary};
use dm_core::id::AnnotationId;
use dm_core::model::NewAnnotation;
use dm_core::store::{Listener, RecordDefaults, SubscriptionId};
use dm_core::{AnnotationStore, EditorConfig, PageRect, StoreError};
use dm_render::{OverlayItem, OverlayStyle, ZoomLevel, build_overlay};
use tokio::sync::watch;

/// What handling one event did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Outcome {
    /// The store was mutated.
    pub changed: bool,
    pub redraw: bool,
    pub signal: Option<Signal>,
    /// The zoom level changed; the host should re-layout the page and
    /// report it to the viewport tracker.
    pub zoom_changed: bool,
}

pub struct AnnotationSession {
    store: AnnotationStore,
    engine: InteractionEngine,
    config: EditorConfig,
    page: Option<PageRect>,
    viewport: Option<watch::Receiver<Option<PageRect>>>,
    zoom: ZoomLevel,
}

impl AnnotationSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            store: AnnotationStore::new(RecordDefaults::from(&config)),
            engine: InteractionEngine::new(config.handle_radius),
            zoom: ZoomLevel::new(config.zoom),
            page: None,
            viewport: None,
            config,
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn engine(&self) -> &InteractionEngine {
        &self.engine
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    // ─── Page rectangle ──────────────────────────────────────────────────

    pub fn page(&self) -> Option<PageRect> {
        self.page
    }

    /// Take a new page rectangle. Unusable rectangles count as unavailable.
    /// Returns `true` if the page changed.
    pub fn set_page(&mut self, page: Option<PageRect>) -> bool {
        let page = page.filter(PageRect::is_usable);
        if page == self.page {
            return false;
        }
        self.page = page;
        self.engine.page_changed(page.as_ref());
        true
    }

    /// Follow a viewport tracker's published page rectangle.
    pub fn attach_viewport(&mut self, mut rx: watch::Receiver<Option<PageRect>>) {
        let page = *rx.borrow_and_update();
        self.viewport = Some(rx);
        self.set_page(page);
    }

    /// Pull the latest rectangle from an attached tracker. Returns `true` if
    /// the page changed.
    pub fn poll_viewport(&mut self) -> bool {
        let Some(rx) = self.viewport.as_mut() else {
            return false;
        };
        match rx.has_changed() {
            Ok(true) => {
                let page = *rx.borrow_and_update();
                self.set_page(page)
            }
            Ok(false) => false,
            Err(_) => {
                log::debug!("viewport tracker dropped; page unavailable");
                self.viewport = None;
                self.set_page(None)
            }
        }
    }

    // ─── Zoom and categories ─────────────────────────────────────────────

    pub fn zoom(&self) -> f64 {
        self.zoom.value()
    }

    pub fn zoom_mut(&mut self) -> &mut ZoomLevel {
        &mut self.zoom
    }

    /// Show or hide a category. Hiding the selected annotation's category
    /// clears the selection.
    pub fn set_category_visible(&mut self, name: &str, visible: bool) -> bool {
        if !self.config.set_category_visible(name, visible) {
            return false;
        }
        if !visible
            && self
                .store
                .selected_record()
                .is_some_and(|r| r.category.as_deref() == Some(name))
        {
            self.engine.cancel();
            self.apply(StoreCommand::Select(None));
        }
        true
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn context(&self) -> &DrawContext {
        self.engine.context()
    }

    pub fn set_context(&mut self, context: DrawContext) {
        self.engine.set_context(context);
    }

    pub fn handle_input(&mut self, event: &InputEvent) -> Outcome {
        if let InputEvent::Key { key, modifiers } = event {
            return match ShortcutMap::resolve(key, *modifiers) {
                Some(action) => self.shortcut(action),
                None => Outcome::default(),
            };
        }
        self.poll_viewport();
        let response = self.engine.handle(
            event,
            &self.store,
            &self.config.categories,
            self.page.as_ref(),
        );
        self.finish(response)
    }

    pub fn shortcut(&mut self, action: ShortcutAction) -> Outcome {
        match action {
            ShortcutAction::Cancel => self.cancel(),
            ShortcutAction::DeleteSelected => match self.store.selected() {
                Some(id) if self.engine.is_idle() => self.delete(id),
                _ => Outcome::default(),
            },
            ShortcutAction::ConfirmLabel => {
                let hint = self.engine.label_hint().unwrap_or_default().to_string();
                self.confirm_label(&hint)
            }
            ShortcutAction::ZoomIn => self.zoom_outcome(ZoomLevel::zoom_in),
            ShortcutAction::ZoomOut => self.zoom_outcome(ZoomLevel::zoom_out),
            ShortcutAction::ZoomReset => self.zoom_outcome(ZoomLevel::reset),
            ShortcutAction::AddAnnotation => {
                let before = self.store.revision();
                if let Err(err) = self.add_default() {
                    log::warn!("add failed: {err}");
                }
                self.outcome_since(before)
            }
        }
    }

    fn zoom_outcome(&mut self, step: fn(&mut ZoomLevel) -> bool) -> Outcome {
        let zoom_changed = step(&mut self.zoom);
        Outcome {
            zoom_changed,
            redraw: zoom_changed,
            ..Outcome::default()
        }
    }

    /// Answer the label prompt. Blank stores the placeholder label.
    pub fn confirm_label(&mut self, label: &str) -> Outcome {
        let response = self.engine.confirm_label(label);
        self.finish(response)
    }

    /// Abandon the gesture or pending label. The store is not touched.
    pub fn cancel(&mut self) -> Outcome {
        let response = self.engine.cancel();
        self.finish(response)
    }

    fn finish(&mut self, response: Response) -> Outcome {
        let before = self.store.revision();
        for command in response.commands {
            self.apply(command);
        }
        let outcome = self.outcome_since(before);
        Outcome {
            signal: response.signal,
            redraw: response.redraw || outcome.changed,
            ..outcome
        }
    }

    fn outcome_since(&self, revision: u64) -> Outcome {
        let changed = self.store.revision() != revision;
        Outcome {
            changed,
            redraw: changed,
            ..Outcome::default()
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Apply one command. Unknown ids are reported and skipped; ids can race
    /// with a delete from another affordance.
    pub fn apply(&mut self, command: StoreCommand) -> bool {
        let result = match command {
            StoreCommand::Add { new, select } => self.store.add(new).and_then(|id| {
                if select {
                    self.store.select(Some(id))
                } else {
                    Ok(())
                }
            }),
            StoreCommand::Update { id, patch } => self.store.update(id, patch),
            StoreCommand::Remove(id) => self.store.remove(id).map(drop),
            StoreCommand::Select(id) => self.store.select(id),
        };
        match result {
            Ok(()) => true,
            Err(StoreError::NotFound(id)) => {
                log::debug!("skipping command for missing annotation {id}");
                false
            }
            Err(err) => {
                log::warn!("command rejected: {err}");
                false
            }
        }
    }

    /// Insert the configured default box and select it.
    pub fn add_default(&mut self) -> Result<AnnotationId, StoreError> {
        let new = NewAnnotation {
            bbox: Some(self.config.default_box),
            category: self.config.default_category.clone(),
            ..NewAnnotation::default()
        };
        let id = self.store.add(new)?;
        self.store.select(Some(id))?;
        Ok(id)
    }

    pub fn select(&mut self, id: Option<AnnotationId>) -> Result<(), StoreError> {
        self.store.select(id)
    }

    /// Remove an annotation and clear the selection.
    pub fn delete(&mut self, id: AnnotationId) -> Outcome {
        let before = self.store.revision();
        self.apply(StoreCommand::Remove(id));
        self.apply(StoreCommand::Select(None));
        self.outcome_since(before)
    }

    // ─── Properties ──────────────────────────────────────────────────────

    pub fn properties(&self) -> Option<PropertiesForm> {
        PropertiesForm::open(&self.store, &self.config.property_fields)
    }

    pub fn save_properties(&mut self, form: PropertiesForm) -> Outcome {
        let before = self.store.revision();
        for command in form.save() {
            self.apply(command);
        }
        self.outcome_since(before)
    }

    pub fn delete_properties(&mut self, form: PropertiesForm) -> Outcome {
        let before = self.store.revision();
        for command in form.delete() {
            self.apply(command);
        }
        self.outcome_since(before)
    }

    // ─── Import / export ─────────────────────────────────────────────────

    /// Append analysis detections. Returns how many were added.
    pub fn import_analysis(&mut self, items: Vec<AnalysisItem>) -> usize {
        let news = dm_core::analysis::to_new_annotations(items, &self.config);
        self.add_all(news)
    }

    /// One-shot initial load. Nothing is applied if `guard` is unmounted by
    /// the time the source answers.
    pub async fn load_analysis<S: AnalysisSource>(
        &mut self,
        source: &S,
        guard: &MountGuard,
    ) -> Result<usize, SourceError> {
        match load_once(source, guard, &self.config).await? {
            Some(news) => Ok(self.add_all(news)),
            None => Ok(0),
        }
    }

    fn add_all(&mut self, news: Vec<NewAnnotation>) -> usize {
        let mut added = 0;
        for new in news {
            match self.store.add(new) {
                Ok(_) => added += 1,
                Err(err) => log::warn!("skipping analysis item: {err}"),
            }
        }
        added
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), StoreError> {
        self.engine.cancel();
        self.store.load_json(json)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        self.store.to_json()
    }

    /// COCO-style summary for the current page, if one is known.
    pub fn coco(&self) -> Option<CocoSummary> {
        self.page.map(|page| coco_summary(&self.store, &page))
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// The display list for the current frame; empty while the page is
    /// unavailable.
    pub fn overlay(&self, style: &OverlayStyle) -> Vec<OverlayItem> {
        match self.page {
            Some(page) => build_overlay(
                &self.store,
                &page,
                &self.config.categories,
                &self.engine.transient(),
                style,
            ),
            None => Vec::new(),
        }
    }
}
