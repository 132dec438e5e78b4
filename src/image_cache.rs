//! Cache of prefetched image blobs.
//!
//! Blobs are keyed by image id and hold the encoded bytes exactly as served.
//! Decoding for display is left to the host; only the header is parsed here,
//! to recover dimensions the server did not report.

use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;

/// Encoded image bytes, cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    bytes: Rc<[u8]>,
}

impl std::fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBlob")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Rc::from(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Width and height read from the image header, without decoding pixels.
    pub fn dimensions(&self) -> Result<(u32, u32), image::ImageError> {
        image::ImageReader::new(Cursor::new(self.bytes()))
            .with_guessed_format()?
            .into_dimensions()
    }
}

/// Blob cache keyed by image id.
#[derive(Debug, Default)]
pub struct BlobCache {
    blobs: HashMap<u64, ImageBlob>,
}

impl BlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob, replacing any previous one for the same image.
    pub fn insert(&mut self, image_id: u64, bytes: Vec<u8>) -> ImageBlob {
        let blob = ImageBlob::new(bytes);
        log::trace!("Cached blob for image {} ({} bytes)", image_id, blob.len());
        self.blobs.insert(image_id, blob.clone());
        blob
    }

    pub fn get(&self, image_id: u64) -> Option<ImageBlob> {
        self.blobs.get(&image_id).cloned()
    }

    pub fn contains(&self, image_id: u64) -> bool {
        self.blobs.contains_key(&image_id)
    }

    /// Drop the cached blob of one image. Returns whether one was cached.
    pub fn release(&mut self, image_id: u64) -> bool {
        let released = self.blobs.remove(&image_id).is_some();
        if released {
            log::trace!("Released blob for image {}", image_id);
        }
        released
    }

    /// Drop every cached blob.
    pub fn release_all(&mut self) {
        if !self.blobs.is_empty() {
            log::debug!("Released {} cached blobs", self.blobs.len());
        }
        self.blobs.clear();
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
