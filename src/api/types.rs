//! Wire types exchanged with the annotation server.

use boxmark_canvas::model::parse_hex_color;
use boxmark_canvas::{Annotation, AnnotationId, Category, CategoryId, NewAnnotation};
use serde::{Deserialize, Serialize};

/// Color used for categories that arrive without a parseable color.
pub const DEFAULT_CATEGORY_COLOR: [u8; 3] = [255, 0, 0];

/// Labeling status of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Pending,
    Assigned,
    Labeled,
    Skipped,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

/// An image as returned by the server, with its current annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub dataset_id: u64,
    pub filename: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub status: ImageStatus,
    #[serde(default)]
    pub annotations: Vec<AnnotationRecord>,
}

impl ImageRecord {
    /// Dimensions, if the server knows both.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// The embedded annotations in store form.
    pub fn to_annotations(&self) -> Vec<Annotation> {
        self.annotations.iter().map(Annotation::from).collect()
    }
}

/// A persisted annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: u64,
    #[serde(default)]
    pub image_id: Option<u64>,
    pub category_id: CategoryId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&AnnotationRecord> for Annotation {
    fn from(record: &AnnotationRecord) -> Self {
        Annotation {
            id: AnnotationId::Persisted(record.id),
            category_id: record.category_id,
            x_center: record.x_center,
            y_center: record.y_center,
            width: record.width,
            height: record.height,
        }
    }
}

/// A category definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub shortcut_key: Option<String>,
    /// `#RRGGBB`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        let color = record
            .color
            .as_deref()
            .and_then(parse_hex_color)
            .unwrap_or(DEFAULT_CATEGORY_COLOR);
        let mut category = Category::new(record.id, &record.name, color).with_sort_order(record.sort_order);
        if let Some(key) = record.shortcut_key.as_deref().and_then(|s| s.trim().chars().next()) {
            category = category.with_shortcut(key);
        }
        category
    }
}

/// Body of a save call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub annotations: Vec<NewAnnotation>,
    pub skip: bool,
}

/// Response to a save call. Servers may report a count, the persisted
/// records (in request order), or only a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<ImageStatus>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub annotations: Option<Vec<AnnotationRecord>>,
}
