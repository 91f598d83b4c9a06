pub mod analysis;
pub mod config;
pub mod export;
pub mod geometry;
pub mod id;
pub mod model;
pub mod store;

pub use config::EditorConfig;
pub use geometry::{GeometryError, NormBox, PageRect, PixelBox, Size, to_normalized, to_pixels};
pub use id::AnnotationId;
pub use model::*;
pub use store::{AnnotationStore, StoreChange, StoreError};
