use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for annotation IDs. Ids are compared on every
/// pointer event, so they must be cheap to copy and compare.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic counter backing generated ids. Never rewinds, so a generated
/// id is never handed out twice within a process. Loaded ids push it past
/// their numeric suffix via [`AnnotationId::reserve`].
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// A stable, interned annotation identifier.
/// Internally a `Spur` index: 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationId(Spur);

impl AnnotationId {
    /// Intern an external id (persisted record, analysis item).
    pub fn intern(s: &str) -> Self {
        AnnotationId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a fresh id of the form `ann_<n>`.
    ///
    /// Callers that also accept external ids must check the result against
    /// their own id set; see `AnnotationStore::next_free_id`.
    pub fn generate() -> Self {
        Self::with_prefix("ann")
    }

    /// Generate a fresh id with a custom prefix (e.g. `draft_3`).
    pub fn with_prefix(prefix: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }

    /// Keep the generator from ever producing this id. Ids ending in
    /// `_<n>` move the counter past `n`; anything else is left alone.
    pub fn reserve(&self) {
        let suffix = self
            .as_str()
            .rsplit_once('_')
            .and_then(|(_, n)| n.parse::<u64>().ok());
        if let Some(n) = suffix {
            COUNTER.fetch_max(n.saturating_add(1), Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AnnotationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnnotationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AnnotationId::intern(&s))
    }
}
