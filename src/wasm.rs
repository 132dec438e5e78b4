//! Browser bindings.
//!
//! The page forwards DOM input to a [`WebSession`] and paints the draw
//! commands returned by [`WebSession::frame_json`]. Server work runs on the
//! microtask queue. While a job is in flight the workspace is checked out;
//! input arriving meanwhile is queued and applied in order once the job
//! returns the workspace.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use boxmark_canvas::{
    AnnotationId, AnnotationPatch, Callback, Event, Key, Modifiers, MouseButton, NewAnnotation, Point,
};
use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::api::HttpApi;
use crate::config::AppConfig;
use crate::task;
use crate::workspace::{Workspace, WorkspaceAction};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let level = AppConfig::load_or_default()
        .preferences
        .log_level
        .to_level_filter()
        .to_level()
        .unwrap_or(log::Level::Info);
    if let Err(e) = console_log::init_with_level(level) {
        web_sys::console::log_1(&format!("Logger already set: {}", e).into());
    }
    log::info!("boxmark WASM starting...");
}

enum Job {
    Open(u64),
    Perform(WorkspaceAction),
}

type Apply = Box<dyn FnOnce(&mut Workspace<HttpApi>) -> Option<Job>>;

enum Deferred {
    Apply(Apply),
    Run(Job),
}

struct Session {
    /// `None` while a job or an applied operation holds the workspace
    workspace: Option<Workspace<HttpApi>>,
    deferred: VecDeque<Deferred>,
}

type SharedSession = Rc<RefCell<Session>>;

fn submit(shared: &SharedSession, op: Deferred) {
    shared.borrow_mut().deferred.push_back(op);
    pump(shared);
}

/// Run queued operations in order until the queue is empty or a job has
/// checked the workspace out. The job pumps again when it finishes.
fn pump(shared: &SharedSession) {
    loop {
        let (mut workspace, next) = {
            let mut session = shared.borrow_mut();
            let Some(workspace) = session.workspace.take() else {
                return;
            };
            let Some(next) = session.deferred.pop_front() else {
                session.workspace = Some(workspace);
                return;
            };
            (workspace, next)
        };

        match next {
            Deferred::Apply(op) => {
                // JS callbacks fired from here may call back into the session;
                // those calls see no workspace and only enqueue.
                let job = op(&mut workspace);
                let mut session = shared.borrow_mut();
                session.workspace = Some(workspace);
                if let Some(job) = job {
                    session.deferred.push_front(Deferred::Run(job));
                }
            }
            Deferred::Run(job) => {
                let shared = Rc::clone(shared);
                task::spawn_local(async move {
                    match job {
                        Job::Open(dataset_id) => workspace.open(dataset_id).await,
                        Job::Perform(action) => workspace.perform(action).await,
                    }
                    shared.borrow_mut().workspace = Some(workspace);
                    pump(&shared);
                });
                return;
            }
        }
    }
}

/// Wrap a JS function as a callback receiving one JSON-encoded argument.
fn js_callback<T: 'static>(
    name: &'static str,
    f: js_sys::Function,
    encode: impl Fn(T) -> serde_json::Value + 'static,
) -> Callback<T> {
    Callback::new(move |value| {
        let payload = JsValue::from_str(&encode(value).to_string());
        if let Err(e) = f.call1(&JsValue::NULL, &payload) {
            log::warn!("{} callback threw: {:?}", name, e);
        }
    })
}

fn patch_json(patch: AnnotationPatch) -> serde_json::Value {
    serde_json::to_value(patch).unwrap_or_default()
}

fn new_annotation_json(annotation: NewAnnotation) -> serde_json::Value {
    serde_json::to_value(annotation).unwrap_or_default()
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

/// DOM `MouseEvent.button` numbering.
fn mouse_button(button: i16) -> MouseButton {
    match button {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        other => MouseButton::Other(other.unsigned_abs()),
    }
}

/// One annotation session bound to a canvas element on the page.
#[wasm_bindgen]
pub struct WebSession {
    session: SharedSession,
}

#[wasm_bindgen]
impl WebSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebSession, JsValue> {
        let config = AppConfig::load_or_default();
        let api = HttpApi::new(
            &config.preferences.server_url,
            config.preferences.api_token.clone(),
        )
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self {
            session: Rc::new(RefCell::new(Session {
                workspace: Some(Workspace::new(api, &config)),
                deferred: VecDeque::new(),
            })),
        })
    }

    /// Start loading a dataset in the background.
    pub fn open(&self, dataset_id: u32) {
        submit(&self.session, Deferred::Run(Job::Open(u64::from(dataset_id))));
    }

    pub fn set_container_size(&self, width: f64, height: f64) {
        self.apply(move |workspace| {
            workspace.set_container_size(width, height);
            workspace.fit_to_container();
            None
        });
    }

    /// Fit the image to the container and center it.
    pub fn fit(&self) {
        self.apply(|workspace| {
            workspace.fit_to_container();
            None
        });
    }

    pub fn pointer_down(&self, x: f64, y: f64, button: i16) {
        self.handle(Event::PointerPressed {
            button: mouse_button(button),
            position: Point::new(x, y),
        });
    }

    pub fn pointer_up(&self, x: f64, y: f64, button: i16) {
        self.handle(Event::PointerReleased {
            button: mouse_button(button),
            position: Point::new(x, y),
        });
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        self.handle(Event::PointerMoved {
            position: Point::new(x, y),
        });
    }

    pub fn pointer_leave(&self) {
        self.handle(Event::PointerLeft);
    }

    pub fn wheel(&self, x: f64, y: f64, delta_y: f64) {
        self.handle(Event::Wheel {
            delta_y,
            position: Point::new(x, y),
        });
    }

    /// Returns whether the key was recognized.
    pub fn key_down(&self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let Some(key) = Key::from_name(key) else {
            return false;
        };
        self.handle(Event::KeyPressed {
            key,
            modifiers: modifiers(shift, ctrl, alt, meta),
        });
        true
    }

    pub fn key_up(&self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) {
        if let Some(key) = Key::from_name(key) {
            self.handle(Event::KeyReleased {
                key,
                modifiers: modifiers(shift, ctrl, alt, meta),
            });
        }
    }

    /// Called with `{"category_id", "x_center", ...}` for each drawn box.
    pub fn set_on_add(&self, f: js_sys::Function) {
        let callback = js_callback("on_add", f, new_annotation_json);
        self.apply(move |workspace| {
            workspace.callbacks_mut().on_add = callback;
            None
        });
    }

    /// Called with `{"id", "patch"}`; unchanged patch fields are omitted.
    pub fn set_on_update(&self, f: js_sys::Function) {
        let callback = js_callback("on_update", f, |(id, patch): (AnnotationId, AnnotationPatch)| {
            json!({ "id": id.to_string(), "patch": patch_json(patch) })
        });
        self.apply(move |workspace| {
            workspace.callbacks_mut().on_update = callback;
            None
        });
    }

    /// Called with `{"id"}` of each deleted annotation.
    pub fn set_on_delete(&self, f: js_sys::Function) {
        let callback = js_callback("on_delete", f, |id: AnnotationId| json!({ "id": id.to_string() }));
        self.apply(move |workspace| {
            workspace.callbacks_mut().on_delete = callback;
            None
        });
    }

    /// Called with the new scale whenever the zoom changes.
    pub fn set_on_zoom_change(&self, f: js_sys::Function) {
        let callback = js_callback("on_zoom_change", f, |scale: f64| json!(scale));
        self.apply(move |workspace| {
            workspace.callbacks_mut().on_zoom_change = callback;
            None
        });
    }

    /// Called with the initial-load percentage while a dataset opens.
    pub fn set_on_progress(&self, f: js_sys::Function) {
        let callback = js_callback("on_progress", f, |progress: u8| json!(progress));
        self.apply(move |workspace| {
            workspace.set_progress_callback(callback);
            None
        });
    }

    /// The current frame as a JSON array of draw commands, or `None` while
    /// the session is busy; keep showing the previous frame then.
    pub fn frame_json(&self) -> Option<String> {
        let session = self.session.borrow();
        let frame = session.workspace.as_ref()?.render();
        match serde_json::to_string(&frame) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("Failed to encode frame: {}", e);
                None
            }
        }
    }

    /// Encoded bytes of the image on screen, for the page to decode into the
    /// texture named by the frame's `draw_image` command.
    pub fn current_image_bytes(&self) -> Option<Vec<u8>> {
        let session = self.session.borrow();
        let image = session.workspace.as_ref()?.current_image()?;
        image.blob.map(|blob| blob.bytes().to_vec())
    }

    pub fn scale(&self) -> f64 {
        self.session
            .borrow()
            .workspace
            .as_ref()
            .map_or(1.0, |workspace| workspace.scale())
    }

    pub fn status(&self) -> String {
        match self.session.borrow().workspace.as_ref() {
            Some(workspace) => format!("{:?}", workspace.status()),
            None => "Busy".to_string(),
        }
    }

    /// Whether the canvas needs repainting; resets the flag.
    pub fn take_redraw(&self) -> bool {
        self.session
            .borrow_mut()
            .workspace
            .as_mut()
            .is_some_and(|workspace| workspace.take_redraw())
    }

    /// Pending notification messages, oldest first.
    pub fn take_notifications(&self) -> Vec<String> {
        self.session
            .borrow_mut()
            .workspace
            .as_mut()
            .map(|workspace| {
                workspace
                    .notifications_mut()
                    .drain()
                    .into_iter()
                    .map(|n| n.message)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl WebSession {
    fn apply(&self, op: impl FnOnce(&mut Workspace<HttpApi>) -> Option<Job> + 'static) {
        submit(&self.session, Deferred::Apply(Box::new(op)));
    }

    fn handle(&self, event: Event) {
        self.apply(move |workspace| workspace.handle_event(&event).map(Job::Perform));
    }
}
