pub mod hit;
pub mod overlay;
pub mod surface;
pub mod viewport;
pub mod zoom;

pub use hit::{Handle, Hit, HitTarget, hit_test, pick};
pub use overlay::{OverlayItem, OverlayStyle, Transient, build_overlay};
pub use surface::{ImageSurface, RenderSurface, SurfaceRect};
pub use viewport::{LayoutTrigger, Refresh, ViewportTracker};
pub use zoom::{ZoomLevel, fit_contain};
