//! Pointer/keyboard interaction state machine.
//!
//! [`AnnotationCanvas`] owns the view transform, the input mode, the current
//! drag and the selection. It never mutates annotations itself: every
//! add/update/delete is returned as a [`CanvasEvent`] for the owner of the
//! annotation set to apply.

use serde::{Deserialize, Serialize};

use crate::event::{Event, Key, Modifiers, MouseButton};
use crate::geometry::{
    self, HandleDirection, PixelBox, Point, clamp_to_image, hit_test_box, hit_test_handles,
    normalize, resize_box, to_annotation, to_pixel_box,
};
use crate::keybindings::{KeyAction, KeyBindings};
use crate::model::{Annotation, AnnotationId, AnnotationPatch, Category, CategoryId, NewAnnotation};
use crate::render::{self, Frame, ImageLayer, RenderInput};
use crate::zoom::{ViewTransform, ZoomOptions};

/// Tolerance used to decide whether a resize actually changed the box.
const RESIZE_EPSILON: f64 = 1e-9;

/// Tunables for the interaction machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    /// Handle grab radius in screen pixels
    #[serde(default = "default_handle_tolerance")]
    pub handle_tolerance: f64,
    /// Drawn boxes must exceed this size (image pixels) on both axes
    #[serde(default = "default_min_draw_size")]
    pub min_draw_size: f64,
    /// Smallest extent a resize can produce (image pixels)
    #[serde(default = "default_min_resize_extent")]
    pub min_resize_extent: f64,
    /// Drawn handle size in screen pixels
    #[serde(default = "default_handle_size")]
    pub handle_size: f64,
    /// Margin kept around the image by fit-to-container
    #[serde(default)]
    pub fit_padding: f64,
    #[serde(default)]
    pub zoom: ZoomOptions,
}

fn default_handle_tolerance() -> f64 {
    8.0
}

fn default_min_draw_size() -> f64 {
    5.0
}

fn default_min_resize_extent() -> f64 {
    10.0
}

fn default_handle_size() -> f64 {
    8.0
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            handle_tolerance: default_handle_tolerance(),
            min_draw_size: default_min_draw_size(),
            min_resize_extent: default_min_resize_extent(),
            handle_size: default_handle_size(),
            fit_padding: 0.0,
            zoom: ZoomOptions::default(),
        }
    }
}

/// What a primary-button press does by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Annotate,
    Pan,
}

/// The drag in progress, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    /// Drawing a new box. `working` keeps the raw (possibly negative) extent.
    Drawing {
        start: Point,
        working: PixelBox,
        category_id: CategoryId,
    },
    /// Panning the view; `last` is the previous screen position.
    Panning { last: Point },
    /// Dragging a handle of the selected annotation.
    ResizingSelected {
        id: AnnotationId,
        direction: HandleDirection,
        original: PixelBox,
        working: PixelBox,
    },
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }
}

/// Pointer cursor the host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorIcon {
    Default,
    Crosshair,
    Grab,
    Grabbing,
    Pointer,
    Resize(HandleDirection),
}

/// Mutation intents and notifications produced by the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// A new box was drawn.
    Add(NewAnnotation),
    /// An existing annotation changed.
    Update {
        id: AnnotationId,
        patch: AnnotationPatch,
    },
    /// The selected annotation was deleted.
    Delete(AnnotationId),
    /// The view scale changed.
    ZoomChanged(f64),
    SelectionChanged(Option<AnnotationId>),
    /// A category shortcut was pressed.
    CategorySelected(CategoryId),
    ModeChanged(InputMode),
    /// A bound key whose action belongs to the host (undo, save, ...).
    HostAction(KeyAction),
}

/// Read-only view of the state the canvas needs from its owner.
#[derive(Debug, Clone, Copy)]
pub struct CanvasContext<'a> {
    pub annotations: &'a [Annotation],
    pub categories: &'a [Category],
    pub selected_category: Option<CategoryId>,
}

/// The interactive annotation canvas.
#[derive(Debug, Clone)]
pub struct AnnotationCanvas {
    settings: CanvasSettings,
    keybindings: KeyBindings,
    view: ViewTransform,
    mode: InputMode,
    drag: DragState,
    selection: Option<AnnotationId>,
    temporary_pan: bool,
    cursor: CursorIcon,
    image_size: Option<(f64, f64)>,
    container_size: Option<(f64, f64)>,
    needs_redraw: bool,
}

impl Default for AnnotationCanvas {
    fn default() -> Self {
        Self::new(CanvasSettings::default(), KeyBindings::default())
    }
}

impl AnnotationCanvas {
    pub fn new(settings: CanvasSettings, keybindings: KeyBindings) -> Self {
        Self {
            settings,
            keybindings,
            view: ViewTransform::identity(),
            mode: InputMode::Annotate,
            drag: DragState::Idle,
            selection: None,
            temporary_pan: false,
            cursor: CursorIcon::Default,
            image_size: None,
            container_size: None,
            needs_redraw: true,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current view scale.
    pub fn scale(&self) -> f64 {
        self.view.scale
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.selection
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    pub fn set_keybindings(&mut self, keybindings: KeyBindings) {
        self.keybindings = keybindings;
    }

    pub fn image_size(&self) -> Option<(f64, f64)> {
        self.image_size
    }

    /// Whether state changed since the last [`take_redraw`](Self::take_redraw).
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Read and reset the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.needs_redraw, false)
    }

    /// Force a redraw, e.g. after the owner changed the annotation set.
    pub fn request_redraw(&mut self) {
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    // ------------------------------------------------------------------
    // Host-driven state
    // ------------------------------------------------------------------

    /// Switch to a new image (or none). Drops any drag and the selection and
    /// refits the view.
    pub fn set_image(&mut self, size: Option<(u32, u32)>) -> Option<CanvasEvent> {
        self.image_size = size.map(|(w, h)| (w as f64, h as f64));
        self.drag = DragState::Idle;
        self.selection = None;
        self.mark_dirty();
        self.fit_to_container()
    }

    /// Tell the canvas its on-screen size.
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        self.container_size = Some((width, height));
        self.mark_dirty();
    }

    /// Scale and center the image to fit the container.
    pub fn fit_to_container(&mut self) -> Option<CanvasEvent> {
        let (image_w, image_h) = self.image_size?;
        let (container_w, container_h) = self.container_size?;
        self.view = ViewTransform::fit(
            image_w,
            image_h,
            container_w,
            container_h,
            self.settings.fit_padding,
            &self.settings.zoom,
        );
        log::debug!("Fit to container: scale={:.3}", self.view.scale);
        self.mark_dirty();
        Some(CanvasEvent::ZoomChanged(self.view.scale))
    }

    pub fn set_mode(&mut self, mode: InputMode) -> Option<CanvasEvent> {
        if self.mode == mode {
            return None;
        }
        log::debug!("Input mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.cursor = self.idle_cursor_for_mode();
        Some(CanvasEvent::ModeChanged(mode))
    }

    /// Select an annotation (or clear the selection).
    pub fn select(&mut self, id: Option<AnnotationId>) -> Option<CanvasEvent> {
        if self.selection == id {
            return None;
        }
        self.selection = id;
        self.mark_dirty();
        Some(CanvasEvent::SelectionChanged(id))
    }

    /// Drop selection or a resize that refers to an annotation that no
    /// longer exists (after undo/redo or a reload).
    pub fn sync_selection(&mut self, annotations: &[Annotation]) {
        let exists = |id: AnnotationId| annotations.iter().any(|a| a.id == id);

        if let Some(id) = self.selection {
            if !exists(id) {
                log::debug!("Selected annotation {} is gone, clearing selection", id);
                self.selection = None;
                self.mark_dirty();
            }
        }
        if let DragState::ResizingSelected { id, .. } = self.drag {
            if !exists(id) {
                self.drag = DragState::Idle;
                self.mark_dirty();
            }
        }
    }

    // ------------------------------------------------------------------
    // Event handling
    // ------------------------------------------------------------------

    /// Dispatch one input event.
    pub fn handle_event(&mut self, event: &Event, ctx: &CanvasContext<'_>) -> Vec<CanvasEvent> {
        match event {
            Event::PointerPressed { button, position } => {
                self.pointer_down(*button, *position, ctx)
            }
            Event::PointerReleased { .. } | Event::PointerLeft => self.pointer_up(ctx),
            Event::PointerMoved { position } => {
                self.pointer_move(*position, ctx);
                Vec::new()
            }
            Event::Wheel { delta_y, position } => self.wheel(*position, *delta_y).into_iter().collect(),
            Event::KeyPressed { key, modifiers } => self.key_down(*key, modifiers, ctx),
            Event::KeyReleased { key, .. } => {
                self.key_up(*key);
                Vec::new()
            }
        }
    }

    /// Pointer pressed at a screen position.
    pub fn pointer_down(
        &mut self,
        button: MouseButton,
        position: Point,
        ctx: &CanvasContext<'_>,
    ) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        if !self.drag.is_idle() {
            return events;
        }

        match button {
            MouseButton::Left => {}
            MouseButton::Middle => {
                self.start_pan(position);
                return events;
            }
            _ => return events,
        }

        // 1. pan mode or temporary pan key
        if self.mode == InputMode::Pan || self.temporary_pan {
            self.start_pan(position);
            return events;
        }

        let Some((image_w, image_h)) = self.image_size else {
            return events;
        };
        let image_point = self.view.to_image(position);

        // 2. handle of the selected annotation
        if let Some((id, direction, original)) = self.selected_handle_at(position, ctx) {
            log::debug!(
                "Resize start on {} via handle {}",
                id,
                direction.code()
            );
            self.drag = DragState::ResizingSelected {
                id,
                direction,
                original,
                working: original,
            };
            self.cursor = CursorIcon::Resize(direction);
            self.mark_dirty();
            return events;
        }

        // 3. click on an existing box selects it
        if let Some(hit) = hit_test_box(image_point, ctx.annotations, image_w, image_h) {
            log::debug!("Selected annotation {}", hit.id);
            events.extend(self.select(Some(hit.id)));
            self.cursor = CursorIcon::Pointer;
            self.mark_dirty();
            return events;
        }

        // 4. start drawing with the active category
        if let Some(category_id) = ctx.selected_category {
            let start = clamp_to_image(image_point, image_w, image_h);
            log::debug!("Draw start at ({:.1}, {:.1})", start.x, start.y);
            events.extend(self.select(None));
            self.drag = DragState::Drawing {
                start,
                working: PixelBox::new(start.x, start.y, 0.0, 0.0),
                category_id,
            };
            self.cursor = CursorIcon::Crosshair;
            self.mark_dirty();
        }

        // 5. nothing to do
        events
    }

    /// Pointer moved to a screen position.
    pub fn pointer_move(&mut self, position: Point, ctx: &CanvasContext<'_>) {
        if self.drag.is_idle() {
            self.cursor = self.hover_cursor(position, ctx);
            return;
        }
        let image_point = self.view.to_image(position);

        match &mut self.drag {
            DragState::Idle => {}
            DragState::Panning { last } => {
                let (dx, dy) = (position.x - last.x, position.y - last.y);
                *last = position;
                self.view = self.view.pan_by(dx, dy);
                self.needs_redraw = true;
            }
            DragState::Drawing { start, working, .. } => {
                let Some((image_w, image_h)) = self.image_size else {
                    return;
                };
                let p = clamp_to_image(image_point, image_w, image_h);
                working.w = p.x - start.x;
                working.h = p.y - start.y;
                log::trace!("Draw move: {:?}", working);
                self.needs_redraw = true;
            }
            DragState::ResizingSelected {
                direction,
                original,
                working,
                ..
            } => {
                let Some((image_w, image_h)) = self.image_size else {
                    return;
                };
                let p = clamp_to_image(image_point, image_w, image_h);
                *working = resize_box(original, *direction, p, self.settings.min_resize_extent);
                log::trace!("Resize move: {:?}", working);
                self.needs_redraw = true;
            }
        }
    }

    /// Pointer released (or left the canvas). Commits the current drag.
    pub fn pointer_up(&mut self, ctx: &CanvasContext<'_>) -> Vec<CanvasEvent> {
        let drag = std::mem::replace(&mut self.drag, DragState::Idle);
        let mut events = Vec::new();

        match drag {
            DragState::Idle => return events,
            DragState::Panning { .. } => {
                log::trace!("Pan end");
            }
            DragState::Drawing {
                working,
                category_id,
                ..
            } => {
                let final_box = normalize(working);
                let min = self.settings.min_draw_size;
                match self.image_size {
                    Some((image_w, image_h)) if final_box.w > min && final_box.h > min => {
                        let category_id = ctx.selected_category.unwrap_or(category_id);
                        let annotation = to_annotation(&final_box, image_w, image_h, category_id);
                        log::debug!("Draw end: {:?} -> {:?}", final_box, annotation);
                        events.push(CanvasEvent::Add(annotation));
                    }
                    _ => {
                        log::debug!("Draw end: box {:?} too small, discarded", final_box);
                    }
                }
            }
            DragState::ResizingSelected {
                id,
                original,
                working,
                ..
            } => {
                let final_box = normalize(working);
                match self.image_size {
                    Some((image_w, image_h)) if !final_box.approx_eq(&original, RESIZE_EPSILON) => {
                        let category_id = ctx
                            .annotations
                            .iter()
                            .find(|a| a.id == id)
                            .map(|a| a.category_id)
                            .unwrap_or_default();
                        let patch = to_annotation(&final_box, image_w, image_h, category_id)
                            .geometry_patch();
                        log::debug!("Resize end on {}: {:?}", id, final_box);
                        events.push(CanvasEvent::Update { id, patch });
                    }
                    _ => {
                        log::debug!("Resize end on {}: unchanged", id);
                    }
                }
            }
        }

        self.cursor = self.idle_cursor_for_mode();
        self.mark_dirty();
        events
    }

    /// Wheel zoom anchored at the pointer.
    pub fn wheel(&mut self, position: Point, delta_y: f64) -> Option<CanvasEvent> {
        let zoomed = self.view.zoom_wheel(position, delta_y, &self.settings.zoom);
        self.apply_view(zoomed)
    }

    /// Zoom by one step anchored at the container center.
    pub fn zoom_step(&mut self, zoom_in: bool) -> Option<CanvasEvent> {
        let (w, h) = self.container_size.unwrap_or((0.0, 0.0));
        let factor = if zoom_in {
            self.settings.zoom.zoom_in_factor
        } else {
            self.settings.zoom.zoom_out_factor
        };
        let zoomed = self
            .view
            .zoom_at(Point::new(w / 2.0, h / 2.0), factor, &self.settings.zoom);
        self.apply_view(zoomed)
    }

    fn apply_view(&mut self, view: ViewTransform) -> Option<CanvasEvent> {
        if view == self.view {
            return None;
        }
        let scale_changed = view.scale != self.view.scale;
        self.view = view;
        self.mark_dirty();
        if scale_changed {
            log::trace!("Zoom: scale={:.3}", view.scale);
            Some(CanvasEvent::ZoomChanged(view.scale))
        } else {
            None
        }
    }

    /// Key pressed. Bound actions win over category shortcuts.
    pub fn key_down(
        &mut self,
        key: Key,
        modifiers: &Modifiers,
        ctx: &CanvasContext<'_>,
    ) -> Vec<CanvasEvent> {
        let mut events = Vec::new();

        if self.keybindings.is_temporary_pan(key) && !modifiers.command() {
            if !self.temporary_pan {
                self.temporary_pan = true;
                if self.drag.is_idle() {
                    self.cursor = CursorIcon::Grab;
                }
            }
            return events;
        }

        if let Some(action) = self.keybindings.action_for(key, modifiers) {
            match action {
                KeyAction::DeleteSelected => {
                    if let Some(id) = self.selection.take() {
                        log::debug!("Delete annotation {}", id);
                        if matches!(self.drag, DragState::ResizingSelected { id: drag_id, .. } if drag_id == id)
                        {
                            self.drag = DragState::Idle;
                        }
                        self.mark_dirty();
                        events.push(CanvasEvent::Delete(id));
                    }
                }
                KeyAction::AnnotateMode => events.extend(self.set_mode(InputMode::Annotate)),
                KeyAction::PanMode => events.extend(self.set_mode(InputMode::Pan)),
                KeyAction::Cancel => events.extend(self.cancel()),
                KeyAction::FitView => events.extend(self.fit_to_container()),
                KeyAction::ZoomIn => events.extend(self.zoom_step(true)),
                KeyAction::ZoomOut => events.extend(self.zoom_step(false)),
                host => events.push(CanvasEvent::HostAction(host)),
            }
            return events;
        }

        if let Some(category) = self
            .keybindings
            .category_for_key(key, modifiers, ctx.categories)
        {
            log::debug!("Category shortcut '{}' -> {}", category.name, category.id);
            events.push(CanvasEvent::CategorySelected(category.id));
            events.extend(self.set_mode(InputMode::Annotate));
        }
        events
    }

    /// Key released.
    pub fn key_up(&mut self, key: Key) {
        if self.keybindings.is_temporary_pan(key) && self.temporary_pan {
            self.temporary_pan = false;
            if self.drag.is_idle() {
                self.cursor = self.idle_cursor_for_mode();
            }
        }
    }

    /// Abort the current drag without committing, or clear the selection
    /// when idle.
    pub fn cancel(&mut self) -> Option<CanvasEvent> {
        if self.drag.is_idle() {
            return self.select(None);
        }
        log::debug!("Cancelled {:?}", self.drag);
        self.drag = DragState::Idle;
        self.cursor = self.idle_cursor_for_mode();
        self.mark_dirty();
        None
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Draw the current state. `image` must describe the same image the
    /// canvas was given via [`set_image`](Self::set_image).
    pub fn render(&self, ctx: &CanvasContext<'_>, image: Option<ImageLayer>) -> Frame {
        let resize_override = match self.drag {
            DragState::ResizingSelected { id, working, .. } => Some((id, working)),
            _ => None,
        };
        let draft = match self.drag {
            DragState::Drawing {
                working,
                category_id,
                ..
            } => Some((working, Some(ctx.selected_category.unwrap_or(category_id)))),
            _ => None,
        };
        render::render_frame(&RenderInput {
            image,
            view: self.view,
            annotations: ctx.annotations,
            categories: ctx.categories,
            selection: self.selection,
            resize_override,
            draft,
            handle_size: self.settings.handle_size,
        })
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn start_pan(&mut self, position: Point) {
        log::trace!("Pan start at ({:.1}, {:.1})", position.x, position.y);
        self.drag = DragState::Panning { last: position };
        self.cursor = CursorIcon::Grabbing;
    }

    /// Handle of the selected annotation under a screen position, with the
    /// annotation's current pixel box.
    fn selected_handle_at(
        &self,
        position: Point,
        ctx: &CanvasContext<'_>,
    ) -> Option<(AnnotationId, HandleDirection, PixelBox)> {
        let (image_w, image_h) = self.image_size?;
        let selected = self.selection?;
        let annotation = ctx.annotations.iter().find(|a| a.id == selected)?;
        let pixel_box = normalize(to_pixel_box(annotation, image_w, image_h));
        let screen_box = geometry::box_to_screen(&pixel_box, &self.view);
        let handle = hit_test_handles(
            position,
            &geometry::handles(&screen_box),
            self.settings.handle_tolerance,
        )?;
        Some((annotation.id, handle.direction, pixel_box))
    }

    fn idle_cursor_for_mode(&self) -> CursorIcon {
        if self.mode == InputMode::Pan || self.temporary_pan {
            CursorIcon::Grab
        } else {
            CursorIcon::Default
        }
    }

    fn hover_cursor(&self, position: Point, ctx: &CanvasContext<'_>) -> CursorIcon {
        if self.mode == InputMode::Pan || self.temporary_pan {
            return CursorIcon::Grab;
        }
        let Some((image_w, image_h)) = self.image_size else {
            return CursorIcon::Default;
        };
        if let Some((_, direction, _)) = self.selected_handle_at(position, ctx) {
            return CursorIcon::Resize(direction);
        }
        let image_point = self.view.to_image(position);
        if hit_test_box(image_point, ctx.annotations, image_w, image_h).is_some() {
            return CursorIcon::Pointer;
        }
        if ctx.selected_category.is_some() {
            CursorIcon::Crosshair
        } else {
            CursorIcon::Default
        }
    }
}
