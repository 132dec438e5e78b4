//! The annotation session for one dataset.
//!
//! [`Workspace`] owns the canvas, the annotation store and the navigator and
//! routes events between them. Input goes through
//! [`handle_event`](Workspace::handle_event); anything that needs the server
//! comes back as a [`WorkspaceAction`] for the host to run with
//! [`perform`](Workspace::perform). Network failures are turned into
//! notifications here and never reach the host as errors.

use std::collections::HashMap;
use std::rc::Rc;

use boxmark_canvas::{
    AnnotationCanvas, AnnotationId, Callback, CanvasCallbacks, CanvasContext, CanvasEvent, Category,
    CategoryId, CursorIcon, Event, Frame, ImageLayer, InputMode, KeyAction,
};

use crate::api::{ImageApi, ImageStatus, SaveRequest, SaveResponse};
use crate::config::AppConfig;
use crate::navigation::{Navigator, ShownImage};
use crate::notification::Notifications;
use crate::store::AnnotationStore;

/// Coarse session state shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkspaceStatus {
    /// No dataset opened yet
    #[default]
    Idle,
    /// Initial batch is being fetched
    Loading { progress: u8 },
    /// An image is on screen
    Ready,
    /// The server has nothing left to annotate
    Completed,
}

/// Key-triggered work that needs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceAction {
    Save,
    Skip,
    Previous,
    Next,
}

pub struct Workspace<A> {
    api: Rc<A>,
    navigator: Navigator<A>,
    canvas: AnnotationCanvas,
    store: AnnotationStore,
    categories: Vec<Category>,
    callbacks: CanvasCallbacks,
    on_progress: Callback<u8>,
    notifications: Notifications,
    status: WorkspaceStatus,
    dataset_id: Option<u64>,
    image_layer: Option<ImageLayer>,
}

impl<A: ImageApi + 'static> Workspace<A> {
    pub fn new(api: A, config: &AppConfig) -> Self {
        let api = Rc::new(api);
        Self {
            navigator: Navigator::new(Rc::clone(&api), config.navigation),
            api,
            canvas: AnnotationCanvas::new(config.canvas.clone(), config.keybindings.clone()),
            store: AnnotationStore::new(config.history),
            categories: Vec::new(),
            callbacks: CanvasCallbacks::default(),
            on_progress: Callback::none(),
            notifications: Notifications::default(),
            status: WorkspaceStatus::Idle,
            dataset_id: None,
            image_layer: None,
        }
    }

    pub fn set_callbacks(&mut self, callbacks: CanvasCallbacks) {
        self.callbacks = callbacks;
    }

    pub fn callbacks_mut(&mut self) -> &mut CanvasCallbacks {
        &mut self.callbacks
    }

    /// Called with the initial-load percentage while a dataset opens.
    pub fn set_progress_callback(&mut self, on_progress: Callback<u8>) {
        self.on_progress = on_progress;
    }

    pub fn status(&self) -> WorkspaceStatus {
        self.status
    }

    pub fn dataset_id(&self) -> Option<u64> {
        self.dataset_id
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn canvas(&self) -> &AnnotationCanvas {
        &self.canvas
    }

    pub fn navigator(&self) -> &Navigator<A> {
        &self.navigator
    }

    pub fn current_image(&self) -> Option<ShownImage> {
        self.navigator.current()
    }

    pub fn scale(&self) -> f64 {
        self.canvas.scale()
    }

    pub fn cursor(&self) -> CursorIcon {
        self.canvas.cursor()
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.notifications
    }

    /// Read and reset the canvas redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        self.canvas.take_redraw()
    }

    fn context(&self) -> CanvasContext<'_> {
        CanvasContext {
            annotations: self.store.annotations(),
            categories: &self.categories,
            selected_category: self.store.selected_category(),
        }
    }

    // ------------------------------------------------------------------
    // Dataset lifecycle
    // ------------------------------------------------------------------

    /// Load categories and the first batch of a dataset and show its first
    /// image.
    pub async fn open(&mut self, dataset_id: u64) {
        log::info!("Opening dataset {}", dataset_id);
        self.dataset_id = Some(dataset_id);
        self.status = WorkspaceStatus::Loading { progress: 0 };
        self.store.load(Vec::new());
        self.image_layer = None;
        let cleared = self.canvas.set_image(None);
        self.dispatch_all(cleared);

        match self.api.categories(dataset_id).await {
            Ok(categories) => self.set_categories(categories),
            Err(e) => self
                .notifications
                .error(format!("Failed to load categories: {}", e)),
        }

        let navigator = self.navigator.clone();
        let status = &mut self.status;
        let on_progress = &self.on_progress;
        let result = navigator
            .initialize_with_progress(dataset_id, |progress| {
                *status = WorkspaceStatus::Loading { progress };
                on_progress.call(progress);
            })
            .await;
        match result {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("Opening dataset {} was superseded", dataset_id);
                return;
            }
            Err(e) => self
                .notifications
                .error(format!("Failed to load images: {}", e)),
        }
        self.show_current();
    }

    /// Replace the category list. Categories are kept in sort order and
    /// shortcut problems are reported as warnings.
    pub fn set_categories(&mut self, mut categories: Vec<Category>) {
        categories.sort_by_key(|category| category.sort_order);
        for conflict in self.canvas.keybindings().conflicts(&categories) {
            self.notifications.warn(conflict.to_string());
        }

        let selected = self.store.selected_category();
        if !selected.is_some_and(|id| categories.iter().any(|c| c.id == id)) {
            self.store
                .set_selected_category(categories.first().map(|c| c.id));
        }
        log::info!("Loaded {} categories", categories.len());
        self.categories = categories;
        self.canvas.request_redraw();
    }

    pub fn select_category(&mut self, category_id: Option<CategoryId>) {
        self.store.set_selected_category(category_id);
        self.canvas.request_redraw();
    }

    /// Load whatever the navigator has on screen into the canvas and store.
    fn show_current(&mut self) {
        let event = match self.navigator.current() {
            None => {
                self.store.load(Vec::new());
                self.image_layer = None;
                if self.navigator.is_exhausted() {
                    self.status = WorkspaceStatus::Completed;
                    self.notifications
                        .info("All images in this dataset are done");
                } else {
                    self.status = WorkspaceStatus::Idle;
                }
                self.canvas.set_image(None)
            }
            Some(image) => {
                self.store.load(image.record.to_annotations());
                self.status = WorkspaceStatus::Ready;
                let dimensions = image.dimensions();
                self.image_layer = dimensions.map(|(width, height)| ImageLayer {
                    image_id: image.id(),
                    width,
                    height,
                });
                if dimensions.is_none() {
                    self.notifications.warn(format!(
                        "Image {} has unknown dimensions and cannot be annotated",
                        image.record.filename
                    ));
                }
                self.canvas.set_image(dimensions)
            }
        };
        self.dispatch_all(event);
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Route one input event through the canvas and apply what it reports.
    pub fn handle_event(&mut self, event: &Event) -> Option<WorkspaceAction> {
        let events = {
            let ctx = CanvasContext {
                annotations: self.store.annotations(),
                categories: &self.categories,
                selected_category: self.store.selected_category(),
            };
            self.canvas.handle_event(event, &ctx)
        };

        let mut action = None;
        for event in events {
            self.callbacks.dispatch(&event);
            match event {
                CanvasEvent::Add(annotation) => {
                    self.store.add(annotation);
                    self.canvas.request_redraw();
                }
                CanvasEvent::Update { id, patch } => {
                    if !self.store.update(id, patch) {
                        log::warn!("Update for unknown annotation {}", id);
                    }
                    self.canvas.request_redraw();
                }
                CanvasEvent::Delete(id) => {
                    self.store.remove(id);
                    self.canvas.request_redraw();
                }
                CanvasEvent::CategorySelected(id) => self.select_category(Some(id)),
                CanvasEvent::HostAction(host) => match host {
                    KeyAction::Undo => {
                        self.undo();
                    }
                    KeyAction::Redo => {
                        self.redo();
                    }
                    KeyAction::SaveAndNext => action = Some(WorkspaceAction::Save),
                    KeyAction::Skip => action = Some(WorkspaceAction::Skip),
                    KeyAction::PreviousImage => action = Some(WorkspaceAction::Previous),
                    KeyAction::NextImage => action = Some(WorkspaceAction::Next),
                    other => log::debug!("Ignoring action {}", other.name()),
                },
                CanvasEvent::ZoomChanged(_)
                | CanvasEvent::SelectionChanged(_)
                | CanvasEvent::ModeChanged(_) => {}
            }
        }
        action
    }

    /// Run an action returned by [`handle_event`](Self::handle_event).
    pub async fn perform(&mut self, action: WorkspaceAction) {
        match action {
            WorkspaceAction::Save => {
                self.save(false).await;
            }
            WorkspaceAction::Skip => {
                self.save(true).await;
            }
            WorkspaceAction::Previous => {
                self.go_previous().await;
            }
            WorkspaceAction::Next => {
                self.go_next().await;
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.store.undo();
        if changed {
            self.canvas.sync_selection(self.store.annotations());
            self.canvas.request_redraw();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.store.redo();
        if changed {
            self.canvas.sync_selection(self.store.annotations());
            self.canvas.request_redraw();
        }
        changed
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        let event = self.canvas.set_mode(mode);
        self.dispatch_all(event);
    }

    pub fn set_container_size(&mut self, width: f64, height: f64) {
        self.canvas.set_container_size(width, height);
    }

    pub fn fit_to_container(&mut self) {
        let event = self.canvas.fit_to_container();
        self.dispatch_all(event);
    }

    fn dispatch_all(&self, events: impl IntoIterator<Item = CanvasEvent>) {
        for event in events {
            self.callbacks.dispatch(&event);
        }
    }

    // ------------------------------------------------------------------
    // Server actions
    // ------------------------------------------------------------------

    /// Save (or skip) the current image and move on. Returns whether the
    /// server accepted the request; on failure the annotations stay as they
    /// are.
    pub async fn save(&mut self, skip: bool) -> bool {
        let Some(image) = self.navigator.current() else {
            log::debug!("Nothing to save");
            return false;
        };
        let request = SaveRequest {
            annotations: if skip {
                Vec::new()
            } else {
                self.store.to_save_request()
            },
            skip,
        };

        let response = match self.api.save(image.id(), &request).await {
            Ok(response) => response,
            Err(e) => {
                self.notifications.error(format!(
                    "Failed to save {}: {}",
                    image.record.filename, e
                ));
                return false;
            }
        };
        log::info!(
            "{} image {} ({} annotations)",
            if skip { "Skipped" } else { "Saved" },
            image.id(),
            request.annotations.len()
        );

        if !skip {
            self.reconcile(&response);
        }
        let mut record = image.record;
        record.status = response.status.unwrap_or(if skip {
            ImageStatus::Skipped
        } else {
            ImageStatus::Labeled
        });
        let annotations = if skip {
            Vec::new()
        } else {
            self.store.annotations().to_vec()
        };

        if self.navigator.is_browsing() {
            self.navigator.refresh_current_entry(record, annotations);
            self.go_next().await;
        } else {
            self.navigator.record_processed(record, annotations);
            self.advance().await;
        }
        true
    }

    /// Swap provisional ids for the ones the server assigned. The server
    /// returns persisted records in request order.
    fn reconcile(&mut self, response: &SaveResponse) {
        let Some(persisted) = &response.annotations else {
            return;
        };
        let ids: Vec<AnnotationId> = self.store.annotations().iter().map(|a| a.id).collect();
        if persisted.len() != ids.len() {
            log::warn!(
                "Server returned {} annotations for {} saved, keeping local ids",
                persisted.len(),
                ids.len()
            );
            return;
        }

        let mapping: HashMap<AnnotationId, AnnotationId> = ids
            .into_iter()
            .zip(persisted.iter().map(|r| AnnotationId::Persisted(r.id)))
            .filter(|(old, new)| old != new)
            .collect();
        let remapped = self.store.reconcile_ids(&mapping);
        log::debug!("Reconciled {} annotation ids", remapped);

        if let Some(new_id) = self.canvas.selection().and_then(|id| mapping.get(&id)) {
            let new_id = *new_id;
            self.canvas.select(Some(new_id));
        }
    }

    async fn advance(&mut self) {
        let Some(dataset_id) = self.dataset_id else {
            return;
        };
        match self.navigator.advance(dataset_id).await {
            Ok(_) => self.show_current(),
            Err(e) => self
                .notifications
                .error(format!("Failed to fetch the next image: {}", e)),
        }
    }

    /// Step back through processed images.
    pub async fn go_previous(&mut self) -> bool {
        let snapshot = self.store.annotations().to_vec();
        match self.navigator.go_to_previous(snapshot).await {
            Ok(true) => {
                self.show_current();
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.notifications
                    .error(format!("Failed to load the previous image: {}", e));
                false
            }
        }
    }

    /// Step forward through processed images, back to the live queue at
    /// the end.
    pub async fn go_next(&mut self) -> bool {
        match self.navigator.go_to_next().await {
            Ok(true) => {
                self.show_current();
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.notifications
                    .error(format!("Failed to load the next image: {}", e));
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    pub fn render(&self) -> Frame {
        self.canvas.render(&self.context(), self.image_layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{record, FakeApi};
    use crate::notification::NotificationLevel;
    use boxmark_canvas::{DrawCommand, Key, Modifiers, MouseButton, Point};
    use std::cell::RefCell;
    use tokio::task::LocalSet;

    fn fake_api(count: u64) -> FakeApi {
        let api = FakeApi::with_images(count);
        {
            let mut state = api.state.borrow_mut();
            state.categories = vec![
                Category::new(2, "bike", [0, 255, 0])
                    .with_shortcut('b')
                    .with_sort_order(1),
                Category::new(1, "car", [255, 0, 0])
                    .with_shortcut('c')
                    .with_sort_order(0),
            ];
            for record in state.pending.iter_mut() {
                record.width = Some(1920);
                record.height = Some(1080);
            }
            for record in state.images.values_mut() {
                record.width = Some(1920);
                record.height = Some(1080);
            }
        }
        api
    }

    fn key(key: Key) -> Event {
        Event::KeyPressed {
            key,
            modifiers: Modifiers::default(),
        }
    }

    fn ctrl(c: char) -> Event {
        Event::KeyPressed {
            key: Key::Char(c),
            modifiers: Modifiers {
                ctrl: true,
                ..Default::default()
            },
        }
    }

    fn draw(ws: &mut Workspace<FakeApi>, from: (f64, f64), to: (f64, f64)) {
        ws.handle_event(&Event::PointerPressed {
            button: MouseButton::Left,
            position: Point::new(from.0, from.1),
        });
        ws.handle_event(&Event::PointerMoved {
            position: Point::new(to.0, to.1),
        });
        ws.handle_event(&Event::PointerReleased {
            button: MouseButton::Left,
            position: Point::new(to.0, to.1),
        });
    }

    async fn settle(ws: &Workspace<FakeApi>) {
        for _ in 0..100 {
            if !ws.navigator().is_prefetching() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("replenish did not finish");
    }

    async fn opened(api: FakeApi) -> Workspace<FakeApi> {
        let mut ws = Workspace::new(api, &AppConfig::default());
        ws.open(1).await;
        settle(&ws).await;
        ws
    }

    #[tokio::test]
    async fn test_open_shows_first_image() {
        LocalSet::new()
            .run_until(async {
                let mut ws = Workspace::new(fake_api(3), &AppConfig::default());
                let reported = Rc::new(RefCell::new(Vec::new()));
                let sink = Rc::clone(&reported);
                ws.set_progress_callback(Callback::new(move |p| sink.borrow_mut().push(p)));

                ws.open(1).await;
                settle(&ws).await;

                assert_eq!(ws.status(), WorkspaceStatus::Ready);
                assert_eq!(ws.current_image().map(|i| i.id()), Some(1));
                let names: Vec<_> = ws.categories().iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["car", "bike"]);
                assert_eq!(ws.store().selected_category(), Some(1));
                assert_eq!(reported.borrow().last(), Some(&100));
                assert!(ws.notifications().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_draw_then_save_advances() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(3)).await;
                let added = Rc::new(RefCell::new(0));
                let counter = Rc::clone(&added);
                let mut callbacks = CanvasCallbacks::default();
                callbacks.on_add = Callback::new(move |_| *counter.borrow_mut() += 1);
                ws.set_callbacks(callbacks);

                assert_eq!(ws.handle_event(&key(Key::Char('b'))), None);
                assert_eq!(ws.store().selected_category(), Some(2));
                draw(&mut ws, (100.0, 100.0), (300.0, 400.0));

                assert_eq!(*added.borrow(), 1);
                let annotation = &ws.store().annotations()[0];
                assert_eq!(annotation.category_id, 2);
                assert!((annotation.x_center - 200.0 / 1920.0).abs() < 1e-9);
                assert!((annotation.y_center - 250.0 / 1080.0).abs() < 1e-9);
                assert!((annotation.width - 200.0 / 1920.0).abs() < 1e-9);
                assert!((annotation.height - 300.0 / 1080.0).abs() < 1e-9);

                let action = ws.handle_event(&key(Key::Enter));
                assert_eq!(action, Some(WorkspaceAction::Save));
                ws.perform(WorkspaceAction::Save).await;
                settle(&ws).await;

                let api = Rc::clone(&ws.api);
                let state = api.state.borrow();
                assert_eq!(state.saved.len(), 1);
                assert_eq!(state.saved[0].0, 1);
                assert_eq!(state.saved[0].1.annotations.len(), 1);
                assert!(!state.saved[0].1.skip);
                drop(state);

                assert_eq!(ws.current_image().map(|i| i.id()), Some(2));
                assert!(ws.store().is_empty());
                assert!(!ws.store().can_undo());
                assert_eq!(ws.navigator().processed_ids(), vec![1]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_save_keeps_annotations() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(3)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                ws.api.state.borrow_mut().fail_save = true;

                assert!(!ws.save(false).await);
                assert!(ws.notifications().has_level(NotificationLevel::Error));
                assert_eq!(ws.store().len(), 1);
                assert!(ws.store().can_undo());
                assert_eq!(ws.current_image().map(|i| i.id()), Some(1));
                assert_eq!(ws.navigator().processed_len(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_skip_sends_empty_request() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(3)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));

                let action = ws.handle_event(&Event::KeyPressed {
                    key: Key::Enter,
                    modifiers: Modifiers {
                        ctrl: true,
                        ..Default::default()
                    },
                });
                assert_eq!(action, Some(WorkspaceAction::Skip));
                ws.perform(WorkspaceAction::Skip).await;
                settle(&ws).await;

                let state = ws.api.state.borrow();
                assert!(state.saved[0].1.skip);
                assert!(state.saved[0].1.annotations.is_empty());
                assert_eq!(state.images[&1].status, ImageStatus::Skipped);
            })
            .await;
    }

    #[tokio::test]
    async fn test_undo_redo_keys() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(1)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                assert_eq!(ws.store().len(), 1);

                ws.handle_event(&ctrl('z'));
                assert!(ws.store().is_empty());
                ws.handle_event(&ctrl('y'));
                assert_eq!(ws.store().len(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_undo_drops_stale_selection() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(1)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                let id = ws.store().annotations()[0].id;
                ws.handle_event(&Event::PointerPressed {
                    button: MouseButton::Left,
                    position: Point::new(50.0, 30.0),
                });
                ws.handle_event(&Event::PointerReleased {
                    button: MouseButton::Left,
                    position: Point::new(50.0, 30.0),
                });
                assert_eq!(ws.canvas().selection(), Some(id));

                assert!(ws.undo());
                assert_eq!(ws.canvas().selection(), None);
            })
            .await;
    }

    #[tokio::test]
    async fn test_completed_after_last_image() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(1)).await;
                assert!(ws.save(false).await);
                settle(&ws).await;

                assert_eq!(ws.status(), WorkspaceStatus::Completed);
                assert!(ws.current_image().is_none());
                assert!(ws.notifications().has_level(NotificationLevel::Info));
                let frame = ws.render();
                assert!(!frame
                    .commands()
                    .iter()
                    .any(|c| matches!(c, DrawCommand::DrawImage { .. })));

                // Back-navigation still works from the completed state.
                assert!(ws.go_previous().await);
                assert_eq!(ws.current_image().map(|i| i.id()), Some(1));
            })
            .await;
    }

    #[tokio::test]
    async fn test_save_while_browsing_returns_forward() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(3)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                ws.save(false).await;
                settle(&ws).await;
                assert_eq!(ws.current_image().map(|i| i.id()), Some(2));

                assert_eq!(
                    ws.handle_event(&key(Key::Left)),
                    Some(WorkspaceAction::Previous)
                );
                ws.perform(WorkspaceAction::Previous).await;
                assert_eq!(ws.current_image().map(|i| i.id()), Some(1));
                assert!(ws.navigator().is_browsing());
                assert_eq!(ws.store().len(), 1);
                assert!(!ws.store().annotations()[0].id.is_provisional());

                assert!(ws.save(false).await);
                assert_eq!(ws.current_image().map(|i| i.id()), Some(2));
                assert!(!ws.navigator().is_browsing());
                let saved: Vec<u64> = ws.api.state.borrow().saved.iter().map(|(id, _)| *id).collect();
                assert_eq!(saved, vec![1, 1]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_save_reconciles_ids_in_place() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(3)).await;
                ws.save(false).await;
                settle(&ws).await;
                ws.go_previous().await;
                assert_eq!(ws.current_image().map(|i| i.id()), Some(1));

                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                assert!(ws.store().annotations()[0].id.is_provisional());
                {
                    let mut state = ws.api.state.borrow_mut();
                    state.echo_saved = true;
                    state.fail_image = true;
                }

                assert!(ws.save(false).await);
                // Moving forward failed, so the saved image stays on screen.
                assert_eq!(ws.current_image().map(|i| i.id()), Some(1));
                assert!(ws.notifications().has_level(NotificationLevel::Error));
                assert_eq!(
                    ws.store().annotations()[0].id,
                    AnnotationId::Persisted(1001)
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_shortcut_conflicts_warn() {
        LocalSet::new()
            .run_until(async {
                let api = fake_api(1);
                api.state.borrow_mut().categories = vec![
                    Category::new(1, "car", [255, 0, 0]).with_shortcut('c'),
                    Category::new(2, "cat", [0, 0, 255])
                        .with_shortcut('c')
                        .with_sort_order(1),
                    Category::new(3, "wheel", [0, 255, 0])
                        .with_shortcut('w')
                        .with_sort_order(2),
                ];
                let ws = opened(api).await;

                let warnings = ws
                    .notifications()
                    .iter()
                    .filter(|n| n.level == NotificationLevel::Warning)
                    .count();
                assert_eq!(warnings, 2);
                assert_eq!(ws.status(), WorkspaceStatus::Ready);
            })
            .await;
    }

    #[tokio::test]
    async fn test_render_draws_image_and_boxes() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(1)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                let frame = ws.render();
                assert!(frame.commands().iter().any(|c| matches!(
                    c,
                    DrawCommand::DrawImage { image, .. } if image.image_id == 1 && image.width == 1920
                )));
                assert!(frame
                    .commands()
                    .iter()
                    .any(|c| matches!(c, DrawCommand::StrokeRect { .. })));
            })
            .await;
    }

    #[tokio::test]
    async fn test_open_other_dataset_during_replenish() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(3)).await;
                assert!(ws.save(true).await);
                assert_eq!(ws.current_image().map(|i| i.id()), Some(2));
                assert!(ws.navigator().is_prefetching());
                let batches = ws.api.state.borrow().batch_calls;

                {
                    let mut state = ws.api.state.borrow_mut();
                    let mut other = record(10);
                    other.dataset_id = 2;
                    state.pending.push_back(other);
                }
                ws.open(2).await;
                assert_eq!(ws.dataset_id(), Some(2));
                assert_eq!(ws.status(), WorkspaceStatus::Ready);
                assert_eq!(ws.current_image().map(|i| i.id()), Some(10));
                assert!(ws.api.state.borrow().batch_calls > batches);

                // the replenish started for dataset 1 must not leak into dataset 2
                ws.api.state.borrow_mut().pending.push_back(record(4));
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert!(!ws.navigator().queued_ids().contains(&4));
                assert!(!ws.navigator().is_prefetching());
                assert_eq!(ws.current_image().map(|i| i.id()), Some(10));
            })
            .await;
    }

    #[tokio::test]
    async fn test_image_size_read_from_blob_when_record_has_none() {
        LocalSet::new()
            .run_until(async {
                let api = fake_api(1);
                {
                    let mut state = api.state.borrow_mut();
                    for record in state.pending.iter_mut() {
                        record.width = None;
                        record.height = None;
                    }
                }
                let ws = opened(api).await;
                assert_eq!(ws.status(), WorkspaceStatus::Ready);
                assert!(ws.notifications().is_empty());
                let frame = ws.render();
                assert!(frame.commands().iter().any(|c| matches!(
                    c,
                    DrawCommand::DrawImage { image, .. } if image.width == 4 && image.height == 3
                )));
            })
            .await;
    }

    #[tokio::test]
    async fn test_frame_serializes_as_tagged_commands() {
        LocalSet::new()
            .run_until(async {
                let mut ws = opened(fake_api(1)).await;
                draw(&mut ws, (10.0, 10.0), (110.0, 60.0));
                let value = serde_json::to_value(ws.render()).unwrap();
                let commands = value.as_array().unwrap();
                assert_eq!(commands[0]["op"], "clear");
                let image = commands
                    .iter()
                    .find(|c| c["op"] == "draw_image")
                    .unwrap();
                assert_eq!(image["image"]["image_id"], 1);
                assert_eq!(image["image"]["width"], 1920);
                assert!(image["rect"]["width"].is_number());
                assert!(commands.iter().any(|c| c["op"] == "stroke_rect"));
            })
            .await;
    }
}
