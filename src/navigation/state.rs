//! Pipeline state shared between the navigator and its background tasks.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use boxmark_canvas::Annotation;
use serde::{Deserialize, Serialize};

use crate::api::ImageRecord;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_LOW_WATER_MARK, DEFAULT_PROCESSED_HISTORY};
use crate::image_cache::{BlobCache, ImageBlob};
use crate::undo::{HistoryConfig, LinearHistory};

/// Tunables for the prefetch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Images requested per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Queue length below which a background replenish starts
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
    /// Retained processed-image history entries
    #[serde(default = "default_max_processed")]
    pub max_processed: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_low_water_mark() -> usize {
    DEFAULT_LOW_WATER_MARK
}

fn default_max_processed() -> usize {
    DEFAULT_PROCESSED_HISTORY
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            low_water_mark: default_low_water_mark(),
            max_processed: default_max_processed(),
        }
    }
}

/// The image currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownImage {
    pub record: ImageRecord,
    pub blob: Option<ImageBlob>,
}

impl ShownImage {
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Dimensions from the record, falling back to the blob header.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if let Some(dimensions) = self.record.dimensions() {
            return Some(dimensions);
        }
        let blob = self.blob.as_ref()?;
        match blob.dimensions() {
            Ok(dimensions) => Some(dimensions),
            Err(e) => {
                log::warn!("Could not read dimensions of image {}: {}", self.record.id, e);
                None
            }
        }
    }
}

/// An image the user already saved or skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEntry {
    pub record: ImageRecord,
    /// Annotation set at save time
    pub annotations: Vec<Annotation>,
}

#[derive(Debug)]
pub(crate) struct PipelineState {
    pub queue: VecDeque<ImageRecord>,
    pub current: Option<ShownImage>,
    pub processed: LinearHistory<ProcessedEntry>,
    pub browsing: bool,
    pub progress: u8,
    pub blobs: BlobCache,
    pub exhausted: bool,
}

impl PipelineState {
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            processed: LinearHistory::with_config(HistoryConfig {
                max_history: config.max_processed,
            }),
            browsing: false,
            progress: 0,
            blobs: BlobCache::new(),
            exhausted: false,
        }
    }

    /// Whether an image is already queued or on screen.
    pub fn is_known(&self, image_id: u64) -> bool {
        self.current.as_ref().is_some_and(|c| c.id() == image_id)
            || self.queue.iter().any(|r| r.id == image_id)
    }

    /// Drop queue, current image, history and blobs.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.current = None;
        self.processed.clear();
        self.browsing = false;
        self.progress = 0;
        self.exhausted = false;
        self.blobs.release_all();
    }

    /// Put an image on screen, releasing the blob of the one it replaces.
    pub fn show(&mut self, record: ImageRecord, blob: Option<ImageBlob>) {
        if let Some(previous) = self.current.take() {
            if previous.id() != record.id {
                self.blobs.release(previous.id());
            }
        }
        log::debug!("Showing image {} ({})", record.id, record.filename);
        self.exhausted = false;
        self.current = Some(ShownImage { record, blob });
    }

    /// Clear the screen after the pipeline ran dry.
    pub fn show_nothing(&mut self) {
        if let Some(previous) = self.current.take() {
            self.blobs.release(previous.id());
        }
        log::info!("No more images to annotate");
        self.exhausted = true;
    }
}

/// Prefetch ownership shared with background tasks.
///
/// Lives outside the pipeline `RefCell` so that releasing it never fails.
/// Every new initialization starts a new generation; work belonging to an
/// older generation must not touch the pipeline.
#[derive(Debug, Default)]
pub(crate) struct PrefetchTracker {
    active: Cell<bool>,
    generation: Cell<u64>,
}

impl PrefetchTracker {
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Holds the in-progress flag for one generation; clears it on drop unless
/// a newer generation took over.
pub(crate) struct PrefetchGuard {
    tracker: Rc<PrefetchTracker>,
    generation: u64,
}

impl PrefetchGuard {
    /// Take the flag, or `None` if a prefetch is already running.
    pub fn acquire(tracker: &Rc<PrefetchTracker>) -> Option<Self> {
        if tracker.active.replace(true) {
            return None;
        }
        Some(Self {
            tracker: Rc::clone(tracker),
            generation: tracker.generation.get(),
        })
    }

    /// Take the flag unconditionally, invalidating any running prefetch.
    pub fn supersede(tracker: &Rc<PrefetchTracker>) -> Self {
        let generation = tracker.generation.get().wrapping_add(1);
        tracker.generation.set(generation);
        if tracker.active.replace(true) {
            log::debug!("Superseding the running prefetch");
        }
        Self {
            tracker: Rc::clone(tracker),
            generation,
        }
    }

    /// Whether no newer generation has started since this guard was taken.
    pub fn is_current(&self) -> bool {
        self.tracker.generation.get() == self.generation
    }
}

impl Drop for PrefetchGuard {
    fn drop(&mut self) {
        if self.is_current() {
            self.tracker.active.set(false);
        }
    }
}
