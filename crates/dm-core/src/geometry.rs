//! Geometry transform: normalized boxes ↔ pixel boxes.
//!
//! Annotations are stored as fractions of the full page (`NormBox`). Every
//! pixel value is a projection for one particular `PageRect` and is derived
//! on demand; nothing in pixel space is ever persisted.
//!
//! Pixel projections are snapped to whole pixels with `f64::round`, the same
//! way on every call, so re-projecting an unchanged box is bit-stable.

use serde::{Deserialize, Serialize};

/// A resolution-independent box, center-anchored. All fields are fractions of
/// the page (`0.0..=1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// A top-left anchored box in pixels of the current page rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The rendered page, in pixels, after zoom.
///
/// `left`/`top` place the page inside its container (where the overlay is
/// mounted); conversions only ever read `width` and `height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A plain width × height pair (image natural size, render target size).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("page rectangle {width}x{height} has no area")]
    EmptyPage { width: f64, height: f64 },
    #[error("reference size {width}x{height} has no area")]
    EmptySource { width: f64, height: f64 },
}

impl NormBox {
    pub const fn new(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// A box without positive area can never be committed.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Left edge as a page fraction.
    pub fn left(&self) -> f64 {
        self.x_center - self.width / 2.0
    }

    /// Top edge as a page fraction.
    pub fn top(&self) -> f64 {
        self.y_center - self.height / 2.0
    }

    /// Whether every edge lies inside the unit page.
    pub fn is_within_page(&self) -> bool {
        let (l, t) = (self.left(), self.top());
        l >= 0.0 && t >= 0.0 && l + self.width <= 1.0 && t + self.height <= 1.0
    }

    /// Component-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &NormBox, eps: f64) -> bool {
        (self.x_center - other.x_center).abs() <= eps
            && (self.y_center - other.y_center).abs() <= eps
            && (self.width - other.width).abs() <= eps
            && (self.height - other.height).abs() <= eps
    }
}

impl PixelBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The box spanning two arbitrary corners (a drag in any direction).
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// Flip negative extents so width/height are non-negative, moving the
    /// origin to the true top-left.
    pub fn normalized(&self) -> Self {
        Self::from_corners(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.abs() > 0.0 && self.height.abs() > 0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Intersect with the page. The result may be degenerate.
    pub fn clip_to(&self, page: &PageRect) -> Self {
        let b = self.normalized();
        let x0 = b.x.clamp(0.0, page.width);
        let y0 = b.y.clamp(0.0, page.height);
        let x1 = b.right().clamp(0.0, page.width);
        let y1 = b.bottom().clamp(0.0, page.height);
        Self::from_corners(x0, y0, x1, y1)
    }

    /// Shift the box (size unchanged) so it lies inside the page. A box
    /// larger than the page is pinned to the top-left edge on that axis.
    pub fn shift_inside(&self, page: &PageRect) -> Self {
        let b = self.normalized();
        let x = b.x.min(page.width - b.width).max(0.0);
        let y = b.y.min(page.height - b.height).max(0.0);
        Self { x, y, ..b }
    }

    fn snapped(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            width: self.width.round(),
            height: self.height.round(),
        }
    }
}

impl PageRect {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    pub const fn with_origin(mut self, left: f64, top: f64) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    /// A page rectangle is usable for conversion only with finite, positive
    /// extents.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    fn check(&self) -> Result<(), GeometryError> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(GeometryError::EmptyPage {
                width: self.width,
                height: self.height,
            })
        }
    }
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn check(&self) -> Result<(), GeometryError> {
        if self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
        {
            Ok(())
        } else {
            Err(GeometryError::EmptySource {
                width: self.width,
                height: self.height,
            })
        }
    }
}

// ─── Conversions ─────────────────────────────────────────────────────────

fn project(bbox: &NormBox, width: f64, height: f64) -> PixelBox {
    PixelBox {
        x: bbox.left() * width,
        y: bbox.top() * height,
        width: bbox.width * width,
        height: bbox.height * height,
    }
}

/// Project a normalized box onto the page, snapped to whole pixels.
pub fn to_pixels(bbox: &NormBox, page: &PageRect) -> PixelBox {
    let px = project(bbox, page.width, page.height).snapped();
    log::trace!("to_pixels {bbox:?} on {}x{} -> {px:?}", page.width, page.height);
    px
}

/// [`to_pixels`] without the whole-pixel snap. Gestures measure from this
/// box so that an edit only moves what the pointer moved.
pub fn to_pixels_exact(bbox: &NormBox, page: &PageRect) -> PixelBox {
    project(bbox, page.width, page.height)
}

/// Inverse of [`to_pixels`]. Negative extents are normalized first.
///
/// # Errors
/// `GeometryError::EmptyPage` when the page rectangle has no area; callers
/// must wait for a usable page rectangle instead of converting.
pub fn to_normalized(px: &PixelBox, page: &PageRect) -> Result<NormBox, GeometryError> {
    page.check()?;
    let b = px.normalized();
    Ok(NormBox {
        x_center: (b.x + b.width / 2.0) / page.width,
        y_center: (b.y + b.height / 2.0) / page.height,
        width: b.width / page.width,
        height: b.height / page.height,
    })
}

/// Two-stage projection for boxes whose normalized frame refers to a
/// different reference resolution than the render target: normalized →
/// `source` pixels → scaled by `target / source` per axis → `target` pixels.
///
/// Snapping happens once, at the end, so `source == target` yields exactly
/// the same pixels as [`to_pixels`].
pub fn source_to_target(
    bbox: &NormBox,
    source: Size,
    target: Size,
) -> Result<PixelBox, GeometryError> {
    source.check()?;
    let in_source = project(bbox, source.width, source.height);
    let sx = target.width / source.width;
    let sy = target.height / source.height;
    Ok(PixelBox {
        x: in_source.x * sx,
        y: in_source.y * sy,
        width: in_source.width * sx,
        height: in_source.height * sy,
    }
    .snapped())
}
