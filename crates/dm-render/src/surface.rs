//! Render-surface contract.
//!
//! A render surface is whatever draws the document page (a PDF viewer, an
//! image element, a test fake). The overlay is mounted on the surface's
//! container; the tracker reports the page relative to the container's
//! top-left, so both measurements must share one coordinate space.

use crate::zoom::fit_contain;
use dm_core::Size;

/// A measured rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Area, with negative or non-finite extents counting as zero.
    pub fn area(&self) -> f64 {
        let w = if self.width.is_finite() { self.width.max(0.0) } else { 0.0 };
        let h = if self.height.is_finite() { self.height.max(0.0) } else { 0.0 };
        w * h
    }
}

/// What the viewport tracker needs from a render surface.
pub trait RenderSurface {
    /// The container the overlay is mounted on, or `None` when the surface
    /// is not mounted yet.
    fn container(&self) -> Option<SurfaceRect>;

    /// Every element that might be the rendered page, in the same space as
    /// [`RenderSurface::container`]. Empty while the page has not rendered.
    fn page_candidates(&self) -> Vec<SurfaceRect>;
}

/// An image document shown "contain"-fitted inside its container, scaled by
/// a zoom level and offset by a pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSurface {
    pub container: Option<Size>,
    /// Natural pixel size of the image, known once it has loaded.
    pub natural: Option<Size>,
    pub zoom: f64,
    pub pan: (f64, f64),
}

impl Default for ImageSurface {
    fn default() -> Self {
        Self {
            container: None,
            natural: None,
            zoom: 1.0,
            pan: (0.0, 0.0),
        }
    }
}

impl ImageSurface {
    pub fn new(container: Size, natural: Size) -> Self {
        Self {
            container: Some(container),
            natural: Some(natural),
            ..Self::default()
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }
}

impl RenderSurface for ImageSurface {
    fn container(&self) -> Option<SurfaceRect> {
        self.container
            .map(|c| SurfaceRect::new(0.0, 0.0, c.width, c.height))
    }

    fn page_candidates(&self) -> Vec<SurfaceRect> {
        let (Some(container), Some(natural)) = (self.container, self.natural) else {
            return Vec::new();
        };
        match fit_contain(container, natural, self.zoom) {
            Some(fit) => vec![SurfaceRect::new(
                fit.left + self.pan.0,
                fit.top + self.pan.1,
                fit.width,
                fit.height,
            )],
            None => Vec::new(),
        }
    }
}
