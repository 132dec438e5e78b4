//! boxmark_canvas - headless bounding-box annotation canvas.
//!
//! Owns everything that happens between a pointer/keyboard event and a
//! frame of draw commands: coordinate-space math, the interaction state
//! machine and the render pass. Persistence and networking live in the
//! `boxmark` application crate.

pub mod callback;
pub mod event;
pub mod geometry;
pub mod interaction;
pub mod keybindings;
pub mod model;
pub mod render;
pub mod zoom;

pub use callback::{CanvasCallbacks, Callback};
pub use event::{Event, Key, Modifiers, MouseButton};
pub use geometry::{Handle, HandleDirection, PixelBox, Point};
pub use interaction::{
    AnnotationCanvas, CanvasContext, CanvasEvent, CanvasSettings, CursorIcon, DragState, InputMode,
};
pub use keybindings::{KeyAction, KeyBindings, Shortcut, ShortcutConflict};
pub use model::{
    Annotation, AnnotationId, AnnotationPatch, Category, CategoryId, NewAnnotation,
};
pub use render::{Color, DrawCommand, Frame, ImageLayer, Rectangle};
pub use zoom::{ViewTransform, ZoomOptions};
