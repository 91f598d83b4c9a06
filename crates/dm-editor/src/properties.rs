//! Properties editor: a form bound to the selected annotation's descriptive
//! fields. It knows nothing about geometry.

use crate::interaction::{Commands, StoreCommand};
use dm_core::AnnotationStore;
use dm_core::config::FieldSpec;
use dm_core::id::AnnotationId;
use dm_core::model::{AnnotationPatch, AnnotationRecord, Fields};
use smallvec::smallvec;

#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesForm {
    id: AnnotationId,
    specs: Vec<FieldSpec>,
    values: Fields,
}

impl PropertiesForm {
    /// Open the form for the current selection, or `None` when nothing is
    /// selected.
    pub fn open(store: &AnnotationStore, specs: &[FieldSpec]) -> Option<Self> {
        store.selected_record().map(|rec| Self::for_record(rec, specs))
    }

    /// Each row is seeded from `fields[key]`, then from the record's own
    /// attribute of that name, else empty.
    pub fn for_record(rec: &AnnotationRecord, specs: &[FieldSpec]) -> Self {
        let values = specs
            .iter()
            .map(|spec| {
                let value = rec
                    .fields
                    .get(&spec.key)
                    .cloned()
                    .or_else(|| record_attribute(rec, &spec.key))
                    .unwrap_or_default();
                (spec.key.clone(), value)
            })
            .collect();
        Self {
            id: rec.id,
            specs: specs.to_vec(),
            values,
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// `(field, value)` in form order.
    pub fn rows(&self) -> impl Iterator<Item = (&FieldSpec, &str)> {
        self.specs
            .iter()
            .map(|spec| (spec, self.get(&spec.key).unwrap_or("")))
    }

    pub fn values(&self) -> &Fields {
        &self.values
    }

    /// The merge patch this form would apply: every value goes into
    /// `fields`, and the `label` row also becomes the record's label.
    pub fn patch(&self) -> AnnotationPatch {
        AnnotationPatch {
            label: self.values.get("label").cloned(),
            fields: self.values.clone(),
            ..AnnotationPatch::default()
        }
    }

    /// Save and close.
    pub fn save(self) -> Commands {
        smallvec![
            StoreCommand::Update {
                id: self.id,
                patch: self.patch(),
            },
            StoreCommand::Select(None),
        ]
    }

    /// Delete the annotation and close.
    pub fn delete(self) -> Commands {
        smallvec![StoreCommand::Remove(self.id), StoreCommand::Select(None)]
    }
}

fn record_attribute(rec: &AnnotationRecord, key: &str) -> Option<String> {
    match key {
        "label" => Some(rec.label.clone()),
        "category" => rec.category.clone(),
        "confidence" => rec.confidence.map(|c| c.to_string()),
        _ => None,
    }
}
