//! Coordinate-space math for bounding boxes.
//!
//! Three spaces are involved:
//! - screen space: canvas pixels, what pointer events report
//! - image space: source-image pixels, used for [`PixelBox`]
//! - normalized space: fractions of the image size, used for [`Annotation`]
//!
//! Everything in this module is a pure function of its inputs.

use crate::model::{Annotation, CategoryId, NewAnnotation};
use crate::zoom::ViewTransform;

/// A 2D point. The coordinate space depends on context.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Largest per-axis distance to another point.
    pub fn chebyshev_distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Axis-aligned box in top-left + extent form. Width/height may be
/// negative while a drag is in progress; see [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PixelBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Inclusive containment test. Expects a normalized box.
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn approx_eq(&self, other: &PixelBox, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.w - other.w).abs() <= epsilon
            && (self.h - other.h).abs() <= epsilon
    }
}

/// Map an image-space point to screen space.
pub fn image_to_screen(point: Point, transform: &ViewTransform) -> Point {
    Point::new(
        point.x * transform.scale + transform.offset_x,
        point.y * transform.scale + transform.offset_y,
    )
}

/// Map a screen-space point to image space. Inverse of [`image_to_screen`].
pub fn screen_to_image(point: Point, transform: &ViewTransform) -> Point {
    Point::new(
        (point.x - transform.offset_x) / transform.scale,
        (point.y - transform.offset_y) / transform.scale,
    )
}

/// Map an image-space box to a screen-space box.
pub fn box_to_screen(bbox: &PixelBox, transform: &ViewTransform) -> PixelBox {
    let origin = image_to_screen(Point::new(bbox.x, bbox.y), transform);
    PixelBox::new(
        origin.x,
        origin.y,
        bbox.w * transform.scale,
        bbox.h * transform.scale,
    )
}

/// Convert a normalized annotation to an image-space box.
pub fn to_pixel_box(annotation: &Annotation, image_width: f64, image_height: f64) -> PixelBox {
    PixelBox {
        x: (annotation.x_center - annotation.width / 2.0) * image_width,
        y: (annotation.y_center - annotation.height / 2.0) * image_height,
        w: annotation.width * image_width,
        h: annotation.height * image_height,
    }
}

/// Convert an image-space box to normalized center form. Inverse of
/// [`to_pixel_box`]; the box should be normalized first.
pub fn to_annotation(
    bbox: &PixelBox,
    image_width: f64,
    image_height: f64,
    category_id: CategoryId,
) -> NewAnnotation {
    NewAnnotation {
        category_id,
        x_center: (bbox.x + bbox.w / 2.0) / image_width,
        y_center: (bbox.y + bbox.h / 2.0) / image_height,
        width: bbox.w / image_width,
        height: bbox.h / image_height,
    }
}

/// Flip negative extents into canonical top-left / positive-extent form.
pub fn normalize(bbox: PixelBox) -> PixelBox {
    let (x, w) = if bbox.w < 0.0 {
        (bbox.x + bbox.w, -bbox.w)
    } else {
        (bbox.x, bbox.w)
    };
    let (y, h) = if bbox.h < 0.0 {
        (bbox.y + bbox.h, -bbox.h)
    } else {
        (bbox.y, bbox.h)
    };
    PixelBox { x, y, w, h }
}

/// Clamp an image-space point to the image rectangle.
pub fn clamp_to_image(point: Point, image_width: f64, image_height: f64) -> Point {
    Point::new(
        point.x.clamp(0.0, image_width),
        point.y.clamp(0.0, image_height),
    )
}

/// Which edges a resize handle moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleDirection {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl HandleDirection {
    /// All handles, clockwise from the top-left corner.
    pub fn all() -> [HandleDirection; 8] {
        [
            HandleDirection::TopLeft,
            HandleDirection::Top,
            HandleDirection::TopRight,
            HandleDirection::Right,
            HandleDirection::BottomRight,
            HandleDirection::Bottom,
            HandleDirection::BottomLeft,
            HandleDirection::Left,
        ]
    }

    /// Short code: `tl, t, tr, r, br, b, bl, l`.
    pub fn code(&self) -> &'static str {
        match self {
            HandleDirection::TopLeft => "tl",
            HandleDirection::Top => "t",
            HandleDirection::TopRight => "tr",
            HandleDirection::Right => "r",
            HandleDirection::BottomRight => "br",
            HandleDirection::Bottom => "b",
            HandleDirection::BottomLeft => "bl",
            HandleDirection::Left => "l",
        }
    }

    fn moves_left(&self) -> bool {
        matches!(
            self,
            HandleDirection::TopLeft | HandleDirection::Left | HandleDirection::BottomLeft
        )
    }

    fn moves_right(&self) -> bool {
        matches!(
            self,
            HandleDirection::TopRight | HandleDirection::Right | HandleDirection::BottomRight
        )
    }

    fn moves_top(&self) -> bool {
        matches!(
            self,
            HandleDirection::TopLeft | HandleDirection::Top | HandleDirection::TopRight
        )
    }

    fn moves_bottom(&self) -> bool {
        matches!(
            self,
            HandleDirection::BottomLeft | HandleDirection::Bottom | HandleDirection::BottomRight
        )
    }
}

/// A resize control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub direction: HandleDirection,
    pub position: Point,
}

/// The eight control points of a box: corners and edge midpoints.
/// Points are in the same space as the box.
pub fn handles(bbox: &PixelBox) -> [Handle; 8] {
    let left = bbox.x;
    let right = bbox.right();
    let top = bbox.y;
    let bottom = bbox.bottom();
    let mid_x = bbox.x + bbox.w / 2.0;
    let mid_y = bbox.y + bbox.h / 2.0;

    HandleDirection::all().map(|direction| {
        let position = match direction {
            HandleDirection::TopLeft => Point::new(left, top),
            HandleDirection::Top => Point::new(mid_x, top),
            HandleDirection::TopRight => Point::new(right, top),
            HandleDirection::Right => Point::new(right, mid_y),
            HandleDirection::BottomRight => Point::new(right, bottom),
            HandleDirection::Bottom => Point::new(mid_x, bottom),
            HandleDirection::BottomLeft => Point::new(left, bottom),
            HandleDirection::Left => Point::new(left, mid_y),
        };
        Handle {
            direction,
            position,
        }
    })
}

/// First handle whose Chebyshev distance to `point` is within `tolerance`.
pub fn hit_test_handles(point: Point, handles: &[Handle], tolerance: f64) -> Option<Handle> {
    handles
        .iter()
        .find(|handle| handle.position.chebyshev_distance_to(&point) <= tolerance)
        .copied()
}

/// Topmost annotation containing an image-space point. Later annotations
/// are drawn on top, so the search runs in reverse order.
pub fn hit_test_box<'a>(
    point: Point,
    annotations: &'a [Annotation],
    image_width: f64,
    image_height: f64,
) -> Option<&'a Annotation> {
    annotations.iter().rev().find(|annotation| {
        normalize(to_pixel_box(annotation, image_width, image_height)).contains(&point)
    })
}

/// Move the edges selected by `direction` to `point`, keeping the opposite
/// edges anchored. A moving edge stops `min_extent` short of its anchor.
pub fn resize_box(
    bbox: &PixelBox,
    direction: HandleDirection,
    point: Point,
    min_extent: f64,
) -> PixelBox {
    let bbox = normalize(*bbox);
    let mut left = bbox.x;
    let mut right = bbox.right();
    let mut top = bbox.y;
    let mut bottom = bbox.bottom();

    if direction.moves_left() {
        left = point.x.min(right - min_extent);
    }
    if direction.moves_right() {
        right = point.x.max(left + min_extent);
    }
    if direction.moves_top() {
        top = point.y.min(bottom - min_extent);
    }
    if direction.moves_bottom() {
        bottom = point.y.max(top + min_extent);
    }

    PixelBox::new(left, top, right - left, bottom - top)
}
