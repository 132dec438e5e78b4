//! Render pass: turns canvas state into a display list.
//!
//! The host owns the actual drawing surface (2D canvas, GPU renderer, ...).
//! Each call to [`render_frame`] produces a complete [`Frame`] from scratch;
//! nothing is diffed or cached between frames.

use crate::geometry::{self, PixelBox, normalize, to_pixel_box};
use crate::model::{Annotation, AnnotationId, Category, CategoryId};
use crate::zoom::ViewTransform;
use serde::Serialize;

/// Label font size in screen pixels.
const LABEL_SIZE: f64 = 12.0;
/// Vertical space reserved above a box for its label.
const LABEL_OFFSET: f64 = 16.0;
/// Stroke width for unselected boxes.
const STROKE_WIDTH: f64 = 2.0;
/// Stroke width for the selected box.
const SELECTED_STROKE_WIDTH: f64 = 3.0;
/// Fill alpha for annotation boxes.
const FILL_ALPHA: f32 = 0.15;
/// Color used when an annotation's category is unknown.
const FALLBACK_COLOR: [u8; 3] = [160, 160, 160];

/// Canvas background.
pub const BACKGROUND: Color = Color {
    r: 0.12,
    g: 0.12,
    b: 0.12,
    a: 1.0,
};

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0] as f32 / 255.0,
            g: rgb[1] as f32 / 255.0,
            b: rgb[2] as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }
}

/// Screen-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<PixelBox> for Rectangle {
    fn from(b: PixelBox) -> Self {
        Rectangle::new(b.x, b.y, b.w, b.h)
    }
}

/// The image shown on the canvas. `image_id` keys the host's texture cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageLayer {
    pub image_id: u64,
    pub width: u32,
    pub height: u32,
}

/// A draw command to be executed by the host surface. Serializes as an
/// object tagged with `"op"`, e.g. `{"op":"clear","color":{..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        color: Color,
    },
    DrawImage {
        image: ImageLayer,
        /// Destination rectangle after applying the view transform
        rect: Rectangle,
    },
    FillRect {
        rect: Rectangle,
        color: Color,
    },
    StrokeRect {
        rect: Rectangle,
        color: Color,
        width: f64,
    },
    DrawText {
        text: String,
        x: f64,
        y: f64,
        color: Color,
        size: f64,
    },
}

/// One complete frame of draw commands. Serializes as the bare command list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Frame {
    commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear { color });
    }

    pub fn draw_image(&mut self, image: ImageLayer, rect: Rectangle) {
        self.commands.push(DrawCommand::DrawImage { image, rect });
    }

    pub fn fill_rect(&mut self, rect: Rectangle, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    pub fn stroke_rect(&mut self, rect: Rectangle, color: Color, width: f64) {
        self.commands
            .push(DrawCommand::StrokeRect { rect, color, width });
    }

    pub fn draw_text(&mut self, text: impl Into<String>, x: f64, y: f64, color: Color, size: f64) {
        self.commands.push(DrawCommand::DrawText {
            text: text.into(),
            x,
            y,
            color,
            size,
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }
}

/// Everything a frame depends on.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub image: Option<ImageLayer>,
    pub view: ViewTransform,
    pub annotations: &'a [Annotation],
    pub categories: &'a [Category],
    pub selection: Option<AnnotationId>,
    /// Live box for the selected annotation while a resize is in progress
    pub resize_override: Option<(AnnotationId, PixelBox)>,
    /// In-progress draw box and the category it will get
    pub draft: Option<(PixelBox, Option<CategoryId>)>,
    pub handle_size: f64,
}

fn category_color(categories: &[Category], category_id: Option<CategoryId>) -> Color {
    let rgb = category_id
        .and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.color)
        .unwrap_or(FALLBACK_COLOR);
    Color::from_rgb8(rgb)
}

/// Draw a whole frame.
pub fn render_frame(input: &RenderInput<'_>) -> Frame {
    let mut frame = Frame::new();
    frame.clear(BACKGROUND);

    let Some(image) = input.image else {
        return frame;
    };
    let (image_w, image_h) = (image.width as f64, image.height as f64);

    let image_rect = geometry::box_to_screen(&PixelBox::new(0.0, 0.0, image_w, image_h), &input.view);
    frame.draw_image(image, image_rect.into());

    let mut selected_box = None;
    for (index, annotation) in input.annotations.iter().enumerate() {
        let is_selected = input.selection == Some(annotation.id);
        let pixel_box = match input.resize_override {
            Some((id, working)) if is_selected && id == annotation.id => normalize(working),
            _ => to_pixel_box(annotation, image_w, image_h),
        };
        let screen = geometry::box_to_screen(&pixel_box, &input.view);
        let color = category_color(input.categories, Some(annotation.category_id));

        frame.fill_rect(screen.into(), color.with_alpha(FILL_ALPHA));
        let stroke = if is_selected {
            SELECTED_STROKE_WIDTH
        } else {
            STROKE_WIDTH
        };
        frame.stroke_rect(screen.into(), color, stroke);

        let name = input
            .categories
            .iter()
            .find(|c| c.id == annotation.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        let label_y = if screen.y >= LABEL_OFFSET {
            screen.y - LABEL_OFFSET
        } else {
            screen.y + 2.0
        };
        frame.draw_text(
            format!("{} {}", index + 1, name),
            screen.x,
            label_y,
            color,
            LABEL_SIZE,
        );

        if is_selected {
            selected_box = Some((screen, color));
        }
    }

    // Handles go on top of every box so overlapping boxes cannot hide them
    if let Some((screen, color)) = selected_box {
        let half = input.handle_size / 2.0;
        for handle in geometry::handles(&screen) {
            let rect = Rectangle::new(
                handle.position.x - half,
                handle.position.y - half,
                input.handle_size,
                input.handle_size,
            );
            frame.fill_rect(rect, Color::WHITE);
            frame.stroke_rect(rect, color, 1.0);
        }
    }

    if let Some((working, category_id)) = input.draft {
        let screen = geometry::box_to_screen(&normalize(working), &input.view);
        let color = category_color(input.categories, category_id);
        frame.fill_rect(screen.into(), color.with_alpha(FILL_ALPHA));
        frame.stroke_rect(screen.into(), color, STROKE_WIDTH);
    }

    frame
}
