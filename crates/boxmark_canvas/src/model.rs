//! Annotation and category data model.
//!
//! Geometry here is always normalized to the image: `x_center`, `y_center`,
//! `width` and `height` are fractions of the image width/height.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-side category identifier.
pub type CategoryId = u64;

/// Identity of an annotation.
///
/// Persisted ids come from the server; provisional ids are handed out
/// locally for annotations that have not been saved yet. The two spaces are
/// distinct variants, so they can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationId {
    Persisted(u64),
    Provisional(u64),
}

impl AnnotationId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, AnnotationId::Provisional(_))
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationId::Persisted(id) => write!(f, "{}", id),
            AnnotationId::Provisional(id) => write!(f, "new-{}", id),
        }
    }
}

/// A bounding-box label in normalized center form.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub category_id: CategoryId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl Annotation {
    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: &AnnotationPatch) {
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(x_center) = patch.x_center {
            self.x_center = x_center;
        }
        if let Some(y_center) = patch.y_center {
            self.y_center = y_center;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
    }

    /// Geometry and category without the identity.
    pub fn to_new(&self) -> NewAnnotation {
        NewAnnotation {
            category_id: self.category_id,
            x_center: self.x_center,
            y_center: self.y_center,
            width: self.width,
            height: self.height,
        }
    }
}

/// An annotation that has no identity yet. Also the wire shape of one entry
/// in a save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub category_id: CategoryId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl NewAnnotation {
    pub fn with_id(self, id: AnnotationId) -> Annotation {
        Annotation {
            id,
            category_id: self.category_id,
            x_center: self.x_center,
            y_center: self.y_center,
            width: self.width,
            height: self.height,
        }
    }

    /// Patch that moves an existing annotation onto this geometry, keeping
    /// its category.
    pub fn geometry_patch(&self) -> AnnotationPatch {
        AnnotationPatch {
            category_id: None,
            x_center: Some(self.x_center),
            y_center: Some(self.y_center),
            width: Some(self.width),
            height: Some(self.height),
        }
    }
}

/// Partial update for an annotation; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnnotationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_center: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_center: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl AnnotationPatch {
    pub fn category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An annotation category with a name, color and optional shortcut key.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Unique identifier for the category
    pub id: CategoryId,
    /// Display name of the category
    pub name: String,
    /// RGB color for the category
    pub color: [u8; 3],
    /// Single-character shortcut, stored lowercase
    pub shortcut_key: Option<char>,
    /// Position in the category list
    pub sort_order: i32,
}

impl Category {
    /// Create a new category with the given ID, name, and color.
    pub fn new(id: CategoryId, name: &str, color: [u8; 3]) -> Self {
        Self {
            id,
            name: name.to_string(),
            color,
            shortcut_key: None,
            sort_order: 0,
        }
    }

    pub fn with_shortcut(mut self, key: char) -> Self {
        self.shortcut_key = Some(key.to_ascii_lowercase());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// Parse a `#RRGGBB` (or `RRGGBB`) color string.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
