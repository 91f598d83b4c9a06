//! Transient move/resize transforms.
//!
//! While a drag or resize is in flight the stored box is untouched; the
//! gesture carries a translate + scale relative to the box captured at
//! pointer-down. Committing bakes the transform into an absolute pixel box
//! and resets it to identity, so the next gesture starts from the committed
//! geometry rather than from an accumulated scale.

use dm_core::PixelBox;
use dm_render::Handle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransientTransform {
    pub dx: f64,
    pub dy: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for TransientTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransientTransform {
    pub const IDENTITY: TransientTransform = TransientTransform {
        dx: 0.0,
        dy: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn translate(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            ..Self::IDENTITY
        }
    }

    /// Drag `handle` of `original` by `(dx, dy)`. The opposite edges stay
    /// put; dragging past them flips the box.
    pub fn resize(original: &PixelBox, handle: Handle, dx: f64, dy: f64) -> Self {
        let edges = handle.edges();
        let mut x0 = original.x;
        let mut y0 = original.y;
        let mut x1 = original.right();
        let mut y1 = original.bottom();
        if edges.left {
            x0 += dx;
        }
        if edges.right {
            x1 += dx;
        }
        if edges.top {
            y0 += dy;
        }
        if edges.bottom {
            y1 += dy;
        }
        Self {
            dx: x0 - original.x,
            dy: y0 - original.y,
            scale_x: ratio(x1 - x0, original.width),
            scale_y: ratio(y1 - y0, original.height),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The box this transform currently shows, with positive extents.
    pub fn apply(&self, original: &PixelBox) -> PixelBox {
        PixelBox::new(
            original.x + self.dx,
            original.y + self.dy,
            original.width * self.scale_x,
            original.height * self.scale_y,
        )
        .normalized()
    }

    /// Bake into an absolute box and reset to identity.
    pub fn commit(&mut self, original: &PixelBox) -> PixelBox {
        let baked = self.apply(original);
        *self = Self::IDENTITY;
        baked
    }
}

fn ratio(new: f64, old: f64) -> f64 {
    if old == 0.0 { 1.0 } else { new / old }
}
