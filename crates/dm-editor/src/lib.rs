pub mod input;
pub mod interaction;
pub mod properties;
pub mod session;
pub mod shortcuts;
pub mod transform;

pub use input::{InputEvent, Modifiers};
pub use interaction::{DrawContext, Gesture, InteractionEngine, Response, Signal, StoreCommand};
pub use properties::PropertiesForm;
pub use session::{AnnotationSession, Outcome};
pub use shortcuts::{ShortcutAction, ShortcutMap};
