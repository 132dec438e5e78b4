//! Pan/zoom view transform.
//!
//! Maps image space to screen space as `screen = image * scale + offset`.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, image_to_screen, screen_to_image};

/// Zoom behaviour for wheel and keyboard zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomOptions {
    /// Multiplier applied per zoom-in step
    #[serde(default = "default_zoom_in_factor")]
    pub zoom_in_factor: f64,
    /// Multiplier applied per zoom-out step
    #[serde(default = "default_zoom_out_factor")]
    pub zoom_out_factor: f64,
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
}

fn default_zoom_in_factor() -> f64 {
    1.1
}

fn default_zoom_out_factor() -> f64 {
    0.9
}

fn default_min_scale() -> f64 {
    0.1
}

fn default_max_scale() -> f64 {
    10.0
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            zoom_in_factor: default_zoom_in_factor(),
            zoom_out_factor: default_zoom_out_factor(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

impl ZoomOptions {
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

/// Represents pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ViewTransform {
    /// Create a new transform with the given scale and offset.
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Create an identity transform (scale=1, no offset).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Zoom by `factor` keeping the image point under `anchor` fixed.
    ///
    /// The anchor is converted to image space before the scale changes, then
    /// the offset is recomputed so the same image point maps back to the
    /// anchor. The resulting scale is clamped to the configured range.
    pub fn zoom_at(&self, anchor: Point, factor: f64, options: &ZoomOptions) -> ViewTransform {
        let image_point = screen_to_image(anchor, self);
        let scale = options.clamp_scale(self.scale * factor);

        ViewTransform {
            scale,
            offset_x: anchor.x - image_point.x * scale,
            offset_y: anchor.y - image_point.y * scale,
        }
    }

    /// Wheel zoom: negative `delta_y` zooms in, positive zooms out.
    pub fn zoom_wheel(&self, anchor: Point, delta_y: f64, options: &ZoomOptions) -> ViewTransform {
        if delta_y == 0.0 {
            return *self;
        }
        let factor = if delta_y < 0.0 {
            options.zoom_in_factor
        } else {
            options.zoom_out_factor
        };
        self.zoom_at(anchor, factor, options)
    }

    /// Apply a screen-space pan delta to the transform.
    pub fn pan_by(&self, dx: f64, dy: f64) -> ViewTransform {
        ViewTransform {
            scale: self.scale,
            offset_x: self.offset_x + dx,
            offset_y: self.offset_y + dy,
        }
    }

    /// Largest scale at which the whole image fits the container (minus
    /// `padding` on each side), centered.
    pub fn fit(
        image_width: f64,
        image_height: f64,
        container_width: f64,
        container_height: f64,
        padding: f64,
        options: &ZoomOptions,
    ) -> ViewTransform {
        if image_width <= 0.0 || image_height <= 0.0 {
            return ViewTransform::identity();
        }
        let available_w = (container_width - 2.0 * padding).max(1.0);
        let available_h = (container_height - 2.0 * padding).max(1.0);
        let scale = options.clamp_scale((available_w / image_width).min(available_h / image_height));

        ViewTransform {
            scale,
            offset_x: (container_width - image_width * scale) / 2.0,
            offset_y: (container_height - image_height * scale) / 2.0,
        }
    }

    /// Map an image-space point to the screen.
    pub fn to_screen(&self, point: Point) -> Point {
        image_to_screen(point, self)
    }

    /// Map a screen point to image space.
    pub fn to_image(&self, point: Point) -> Point {
        screen_to_image(point, self)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}
