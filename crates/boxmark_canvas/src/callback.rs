//! Listener wrappers for canvas events.
//!
//! The canvas returns every [`CanvasEvent`] to its caller; hosts that prefer
//! callbacks register them here instead of matching on the returned events.
//!
//! ```ignore
//! let mut callbacks = CanvasCallbacks::default();
//! callbacks.on_zoom_change = Callback::new(|scale| println!("zoom {scale:.2}"));
//! for event in canvas.handle_event(&event, ctx) {
//!     callbacks.dispatch(&event);
//! }
//! ```

use std::fmt;

use crate::interaction::CanvasEvent;
use crate::model::{AnnotationId, AnnotationPatch, NewAnnotation};

/// An optional event handler.
pub struct Callback<T> {
    f: Option<Box<dyn Fn(T)>>,
}

impl<T> Callback<T> {
    /// Create a new callback from a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T) + 'static,
    {
        Self {
            f: Some(Box::new(f)),
        }
    }

    /// Create an empty callback (no handler).
    pub fn none() -> Self {
        Self { f: None }
    }

    /// Call the handler with a value, if one is registered.
    pub fn call(&self, value: T) {
        if let Some(f) = &self.f {
            f(value);
        }
    }

    /// Whether a handler is registered.
    pub fn is_some(&self) -> bool {
        self.f.is_some()
    }
}

impl<T> Default for Callback<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("has_handler", &self.f.is_some())
            .finish()
    }
}

/// The host-facing event surface: annotation mutations and zoom changes.
#[derive(Debug, Default)]
pub struct CanvasCallbacks {
    pub on_add: Callback<NewAnnotation>,
    pub on_update: Callback<(AnnotationId, AnnotationPatch)>,
    pub on_delete: Callback<AnnotationId>,
    pub on_zoom_change: Callback<f64>,
}

impl CanvasCallbacks {
    /// Route one event to its handler. Events without a matching handler
    /// slot are ignored.
    pub fn dispatch(&self, event: &CanvasEvent) {
        match event {
            CanvasEvent::Add(annotation) => self.on_add.call(annotation.clone()),
            CanvasEvent::Update { id, patch } => self.on_update.call((*id, *patch)),
            CanvasEvent::Delete(id) => self.on_delete.call(*id),
            CanvasEvent::ZoomChanged(scale) => self.on_zoom_change.call(*scale),
            _ => {}
        }
    }
}
