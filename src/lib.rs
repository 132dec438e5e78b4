//! boxmark - bounding-box annotation client
//!
//! Wires the headless [`boxmark_canvas`] to an annotation server: a per-image
//! annotation store with undo/redo, a prefetching image queue with
//! back-navigation, and the [`Workspace`] session that ties them together.
//! Runs natively on a tokio `LocalSet` and in the browser via wasm-bindgen.

pub mod api;
pub mod config;
pub mod constants;
pub mod image_cache;
pub mod navigation;
pub mod notification;
pub mod store;
pub mod task;
pub mod undo;
pub mod workspace;

pub use api::{ApiError, HttpApi, ImageApi};
pub use config::AppConfig;
pub use navigation::{NavigationConfig, Navigator};
pub use notification::{Notification, NotificationLevel, Notifications};
pub use store::AnnotationStore;
pub use workspace::{Workspace, WorkspaceAction, WorkspaceStatus};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
