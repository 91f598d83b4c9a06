//! The annotation store: ordered records plus the single selection pointer.
//!
//! The store is the only source of truth for annotations. Every mutation is
//! applied in full before any listener runs, so a listener always observes a
//! consistent store. Insertion order is display order (last = topmost).

use crate::config::EditorConfig;
use crate::geometry::NormBox;
use crate::id::AnnotationId;
use crate::model::{AnnotationPatch, AnnotationRecord, NewAnnotation};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no annotation with id {0}")]
    NotFound(AnnotationId),
    #[error("duplicate annotation id {0}")]
    DuplicateId(AnnotationId),
    #[error("annotation box has no area: {0:?}")]
    DegenerateBox(NormBox),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// What changed. Delivered to listeners after the change is fully applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Added(AnnotationId),
    Updated(AnnotationId),
    Removed(AnnotationId),
    Selected {
        previous: Option<AnnotationId>,
        current: Option<AnnotationId>,
    },
    /// The whole collection was replaced (import).
    Reloaded,
}

/// Handle returned by [`AnnotationStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&StoreChange, &AnnotationStore)>;

/// Values the store substitutes for unspecified fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDefaults {
    pub placeholder_label: String,
    pub default_box: NormBox,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for RecordDefaults {
    fn from(cfg: &EditorConfig) -> Self {
        Self {
            placeholder_label: cfg.placeholder_label.clone(),
            default_box: cfg.default_box,
        }
    }
}

pub struct AnnotationStore {
    records: Vec<AnnotationRecord>,
    selected: Option<AnnotationId>,
    defaults: RecordDefaults,
    /// Bumped once per applied mutation.
    revision: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(RecordDefaults::default())
    }
}

impl fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("records", &self.records)
            .field("selected", &self.selected)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AnnotationStore {
    pub fn new(defaults: RecordDefaults) -> Self {
        Self {
            records: Vec::new(),
            selected: None,
            defaults,
            revision: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // ─── Subscriptions ───────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, changes: &[StoreChange]) {
        self.revision += 1;
        // Listeners borrow the store immutably; detach them for the call.
        let mut listeners = std::mem::take(&mut self.listeners);
        for change in changes {
            log::debug!("store change {change:?} (rev {})", self.revision);
            for (_, listener) in listeners.iter_mut() {
                listener(change, self);
            }
        }
        self.listeners = listeners;
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Append a new record, filling defaults, and return its id.
    ///
    /// # Errors
    /// `DegenerateBox` if the supplied box has no area; nothing is stored.
    pub fn add(&mut self, new: NewAnnotation) -> Result<AnnotationId, StoreError> {
        let bbox = new.bbox.unwrap_or(self.defaults.default_box);
        if bbox.is_degenerate() {
            return Err(StoreError::DegenerateBox(bbox));
        }
        let id = self.next_free_id(new.id);
        id.reserve();
        let label = self.label_or_placeholder(new.label);
        self.records.push(AnnotationRecord {
            id,
            label,
            category: new.category,
            bbox,
            fields: new.fields,
            confidence: new.confidence,
        });
        self.emit(&[StoreChange::Added(id)]);
        Ok(id)
    }

    /// Merge `patch` into the record with `id`.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `DegenerateBox` for a zero-area box.
    /// The record is untouched on error.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> Result<(), StoreError> {
        if let Some(bbox) = patch.bbox
            && bbox.is_degenerate()
        {
            return Err(StoreError::DegenerateBox(bbox));
        }
        let label = patch.label.map(|l| self.label_or_placeholder(Some(l)));
        let rec = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(label) = label {
            rec.label = label;
        }
        if let Some(category) = patch.category {
            rec.category = category;
        }
        if let Some(bbox) = patch.bbox {
            rec.bbox = bbox;
        }
        rec.fields.extend(patch.fields);
        self.emit(&[StoreChange::Updated(id)]);
        Ok(())
    }

    /// Delete a record. Clears the selection if it pointed at it.
    pub fn remove(&mut self, id: AnnotationId) -> Result<AnnotationRecord, StoreError> {
        let pos = self.position(id).ok_or(StoreError::NotFound(id))?;
        let removed = self.records.remove(pos);
        if self.selected == Some(id) {
            self.selected = None;
            self.emit(&[
                StoreChange::Removed(id),
                StoreChange::Selected {
                    previous: Some(id),
                    current: None,
                },
            ]);
        } else {
            self.emit(&[StoreChange::Removed(id)]);
        }
        Ok(removed)
    }

    /// Point the selection at `id`, or clear it with `None`.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; the selection is left as it was.
    pub fn select(&mut self, id: Option<AnnotationId>) -> Result<(), StoreError> {
        if let Some(id) = id
            && !self.contains(id)
        {
            return Err(StoreError::NotFound(id));
        }
        if self.selected != id {
            let previous = std::mem::replace(&mut self.selected, id);
            self.emit(&[StoreChange::Selected {
                previous,
                current: id,
            }]);
        }
        Ok(())
    }

    /// Replace the whole collection. Zero-area records are dropped; the
    /// selection is cleared.
    ///
    /// # Errors
    /// `DuplicateId` if two records share an id. The store is untouched.
    pub fn replace_all(&mut self, records: Vec<AnnotationRecord>) -> Result<(), StoreError> {
        let mut kept: Vec<AnnotationRecord> = Vec::with_capacity(records.len());
        for mut rec in records {
            if kept.iter().any(|k| k.id == rec.id) {
                return Err(StoreError::DuplicateId(rec.id));
            }
            if rec.bbox.is_degenerate() {
                log::warn!("dropping annotation {} with empty box {:?}", rec.id, rec.bbox);
                continue;
            }
            if rec.label.trim().is_empty() {
                rec.label = self.defaults.placeholder_label.clone();
            }
            rec.id.reserve();
            kept.push(rec);
        }
        self.records = kept;
        self.selected = None;
        self.emit(&[StoreChange::Reloaded]);
        Ok(())
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Serialize to a flat JSON array of records.
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Replace the collection from a flat JSON array of records.
    pub fn load_json(&mut self, json: &str) -> Result<(), StoreError> {
        let records: Vec<AnnotationRecord> = serde_json::from_str(json)?;
        self.replace_all(records)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: AnnotationId) -> Option<&AnnotationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// Display position (0 = bottom-most).
    pub fn position(&self, id: AnnotationId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AnnotationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&AnnotationRecord> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn defaults(&self) -> &RecordDefaults {
        &self.defaults
    }

    /// `requested` if it is free, otherwise a freshly generated id that is
    /// not in use.
    pub fn next_free_id(&self, requested: Option<AnnotationId>) -> AnnotationId {
        if let Some(id) = requested
            && !self.contains(id)
        {
            return id;
        }
        loop {
            let id = AnnotationId::generate();
            if !self.contains(id) {
                return id;
            }
        }
    }

    fn label_or_placeholder(&self, label: Option<String>) -> String {
        match label {
            Some(l) if !l.trim().is_empty() => l,
            _ => self.defaults.placeholder_label.clone(),
        }
    }
}
