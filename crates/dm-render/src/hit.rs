//! Hit testing: pointer position → annotation (or resize handle).
//!
//! Positions are page pixels (origin at the page's top-left). Annotations are
//! walked back-to-front so that when boxes overlap the last-drawn one wins.
//! Annotations in hidden categories are skipped.

use dm_core::id::AnnotationId;
use dm_core::model::{AnnotationRecord, Category, is_category_visible};
use dm_core::{AnnotationStore, PageRect, PixelBox, to_pixels};
use kurbo::Point;
use smallvec::SmallVec;

/// One of the eight resize grips around a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// Which box edges a handle moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    pub fn edges(self) -> Edges {
        use Handle::*;
        Edges {
            left: matches!(self, TopLeft | Left | BottomLeft),
            top: matches!(self, TopLeft | Top | TopRight),
            right: matches!(self, TopRight | Right | BottomRight),
            bottom: matches!(self, BottomLeft | Bottom | BottomRight),
        }
    }

    /// Where the grip sits on `b`.
    pub fn position(self, b: &PixelBox) -> Point {
        let e = self.edges();
        let x = if e.left {
            b.x
        } else if e.right {
            b.right()
        } else {
            b.x + b.width / 2.0
        };
        let y = if e.top {
            b.y
        } else if e.bottom {
            b.bottom()
        } else {
            b.y + b.height / 2.0
        };
        Point::new(x, y)
    }

    /// The grip diagonally (or directly) opposite; it stays fixed while this
    /// one is dragged.
    pub fn opposite(self) -> Handle {
        use Handle::*;
        match self {
            TopLeft => BottomRight,
            Top => Bottom,
            TopRight => BottomLeft,
            Right => Left,
            BottomRight => TopLeft,
            Bottom => Top,
            BottomLeft => TopRight,
            Left => Right,
        }
    }

    /// CSS cursor name for this grip.
    pub fn cursor(self) -> &'static str {
        use Handle::*;
        match self {
            TopLeft | BottomRight => "nwse-resize",
            TopRight | BottomLeft => "nesw-resize",
            Top | Bottom => "ns-resize",
            Left | Right => "ew-resize",
        }
    }
}

/// What part of an annotation the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Body,
    Handle(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub id: AnnotationId,
    pub target: HitTarget,
}

fn visible<'a>(
    store: &'a AnnotationStore,
    categories: &'a [Category],
) -> impl DoubleEndedIterator<Item = &'a AnnotationRecord> {
    store
        .iter()
        .filter(move |r| is_category_visible(categories, r.category.as_deref()))
}

/// Find the topmost annotation whose box contains `(px, py)`.
/// Returns `None` for empty canvas.
pub fn hit_test(
    store: &AnnotationStore,
    categories: &[Category],
    page: &PageRect,
    px: f64,
    py: f64,
) -> Option<AnnotationId> {
    visible(store, categories)
        .rev()
        .find(|r| to_pixels(&r.bbox, page).contains(px, py))
        .map(|r| r.id)
}

/// Every annotation under `(px, py)`, topmost first.
pub fn hit_test_all(
    store: &AnnotationStore,
    categories: &[Category],
    page: &PageRect,
    px: f64,
    py: f64,
) -> SmallVec<[AnnotationId; 4]> {
    visible(store, categories)
        .rev()
        .filter(|r| to_pixels(&r.bbox, page).contains(px, py))
        .map(|r| r.id)
        .collect()
}

/// The handle of `b` within `radius` of `(px, py)`, nearest first.
pub fn hit_handle(b: &PixelBox, px: f64, py: f64, radius: f64) -> Option<Handle> {
    let pointer = Point::new(px, py);
    Handle::ALL
        .into_iter()
        .map(|h| (h, h.position(b).distance(pointer)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h)
}

/// Resolve a pointer-down: the selected annotation's handles win over any
/// body, then bodies are tested topmost first.
pub fn pick(
    store: &AnnotationStore,
    categories: &[Category],
    page: &PageRect,
    px: f64,
    py: f64,
    handle_radius: f64,
) -> Option<Hit> {
    if let Some(selected) = store.selected_record()
        && is_category_visible(categories, selected.category.as_deref())
        && let Some(handle) = hit_handle(&to_pixels(&selected.bbox, page), px, py, handle_radius)
    {
        return Some(Hit {
            id: selected.id,
            target: HitTarget::Handle(handle),
        });
    }
    hit_test(store, categories, page, px, py).map(|id| Hit {
        id,
        target: HitTarget::Body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::model::NewAnnotation;
    use dm_core::to_normalized;
    use pretty_assertions::assert_eq;

    const PAGE: PageRect = PageRect::new(800.0, 1000.0);

    fn add(store: &mut AnnotationStore, x: f64, y: f64, w: f64, h: f64, cat: &str) -> AnnotationId {
        let bbox = to_normalized(&PixelBox::new(x, y, w, h), &PAGE).unwrap();
        store
            .add(NewAnnotation::with_bbox(bbox).category(cat))
            .unwrap()
    }

    #[test]
    fn topmost_box_wins_on_overlap() {
        let mut store = AnnotationStore::default();
        let below = add(&mut store, 100.0, 100.0, 200.0, 200.0, "Valve");
        let above = add(&mut store, 150.0, 150.0, 200.0, 200.0, "Pipe");
        assert_eq!(hit_test(&store, &[], &PAGE, 175.0, 175.0), Some(above));
        assert_eq!(hit_test(&store, &[], &PAGE, 120.0, 120.0), Some(below));
        assert_eq!(hit_test(&store, &[], &PAGE, 10.0, 10.0), None);
        assert_eq!(
            hit_test_all(&store, &[], &PAGE, 175.0, 175.0).to_vec(),
            vec![above, below]
        );
    }

    #[test]
    fn hidden_categories_are_not_hittable() {
        let mut store = AnnotationStore::default();
        let below = add(&mut store, 100.0, 100.0, 200.0, 200.0, "Valve");
        add(&mut store, 150.0, 150.0, 200.0, 200.0, "Pipe");
        let mut pipe = Category::new("Pipe", "#fbc02d");
        pipe.visible = false;
        assert_eq!(hit_test(&store, &[pipe], &PAGE, 175.0, 175.0), Some(below));
    }

    #[test]
    fn handles_of_selected_box_take_priority() {
        let mut store = AnnotationStore::default();
        let a = add(&mut store, 100.0, 100.0, 100.0, 100.0, "Valve");
        // A second box covering a's bottom-right corner.
        add(&mut store, 190.0, 190.0, 100.0, 100.0, "Valve");
        store.select(Some(a)).unwrap();
        assert_eq!(
            pick(&store, &[], &PAGE, 201.0, 199.0, 6.0),
            Some(Hit {
                id: a,
                target: HitTarget::Handle(Handle::BottomRight)
            })
        );
        assert_eq!(
            pick(&store, &[], &PAGE, 150.0, 150.0, 6.0),
            Some(Hit {
                id: a,
                target: HitTarget::Body
            })
        );
    }

    #[test]
    fn handle_geometry() {
        let b = PixelBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(Handle::Top.position(&b), Point::new(60.0, 20.0));
        assert_eq!(Handle::BottomLeft.position(&b), Point::new(10.0, 70.0));
        assert_eq!(hit_handle(&b, 112.0, 45.0, 6.0), Some(Handle::Right));
        assert_eq!(hit_handle(&b, 60.0, 45.0, 6.0), None);
        for h in Handle::ALL {
            assert_eq!(h.opposite().opposite(), h);
        }
    }
}
