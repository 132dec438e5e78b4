//! In-memory [`ImageApi`] for tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;

use boxmark_canvas::Category;

use super::{
    AnnotationRecord, ApiError, ImageApi, ImageRecord, ImageStatus, SaveRequest, SaveResponse,
};

/// Encode a blank PNG of the given size.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub(crate) fn record(id: u64) -> ImageRecord {
    ImageRecord {
        id,
        dataset_id: 1,
        filename: format!("img_{id}.jpg"),
        width: Some(640),
        height: Some(480),
        status: ImageStatus::Pending,
        annotations: Vec::new(),
    }
}

fn failure(path: String) -> ApiError {
    ApiError::Status {
        status: 500,
        url: path,
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub categories: Vec<Category>,
    /// Images the server will hand out, in order
    pub pending: VecDeque<ImageRecord>,
    /// Authoritative image state by id
    pub images: HashMap<u64, ImageRecord>,
    pub failing_blobs: HashSet<u64>,
    pub fail_batch: bool,
    pub fail_save: bool,
    pub fail_image: bool,
    /// Return persisted records from save
    pub echo_saved: bool,
    pub saved: Vec<(u64, SaveRequest)>,
    pub batch_calls: usize,
    pub next_calls: usize,
    pub image_calls: Vec<u64>,
    pub next_annotation_id: u64,
}

/// Fake server holding a pending queue and an image table.
#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    pub state: RefCell<FakeState>,
}

impl FakeApi {
    /// Server with images `1..=count` pending.
    pub fn with_images(count: u64) -> Self {
        let api = FakeApi::default();
        {
            let mut state = api.state.borrow_mut();
            for id in 1..=count {
                state.pending.push_back(record(id));
                state.images.insert(id, record(id));
            }
            state.next_annotation_id = 1000;
        }
        api
    }

    fn take_pending(state: &mut FakeState, count: usize) -> Vec<ImageRecord> {
        let mut out = Vec::new();
        while out.len() < count {
            let Some(mut image) = state.pending.pop_front() else {
                break;
            };
            image.status = ImageStatus::Assigned;
            state.images.insert(image.id, image.clone());
            out.push(image);
        }
        out
    }
}

impl ImageApi for FakeApi {
    async fn categories(&self, _dataset_id: u64) -> Result<Vec<Category>, ApiError> {
        Ok(self.state.borrow().categories.clone())
    }

    async fn next_batch(&self, dataset_id: u64, count: usize) -> Result<Vec<ImageRecord>, ApiError> {
        let mut state = self.state.borrow_mut();
        state.batch_calls += 1;
        if state.fail_batch {
            return Err(failure(format!("images/next/{dataset_id}/batch")));
        }
        Ok(Self::take_pending(&mut state, count))
    }

    async fn next_image(&self, _dataset_id: u64) -> Result<Option<ImageRecord>, ApiError> {
        let mut state = self.state.borrow_mut();
        state.next_calls += 1;
        Ok(Self::take_pending(&mut state, 1).pop())
    }

    async fn image(&self, image_id: u64) -> Result<ImageRecord, ApiError> {
        let mut state = self.state.borrow_mut();
        state.image_calls.push(image_id);
        if state.fail_image {
            return Err(failure(format!("images/{image_id}")));
        }
        state.images.get(&image_id).cloned().ok_or(ApiError::Status {
            status: 404,
            url: format!("images/{image_id}"),
        })
    }

    async fn image_file(&self, image_id: u64) -> Result<Vec<u8>, ApiError> {
        if self.state.borrow().failing_blobs.contains(&image_id) {
            return Err(failure(format!("images/{image_id}/file")));
        }
        Ok(png_bytes(4, 3))
    }

    async fn save(&self, image_id: u64, request: &SaveRequest) -> Result<SaveResponse, ApiError> {
        let mut state = self.state.borrow_mut();
        if state.fail_save {
            return Err(failure(format!("images/{image_id}/save")));
        }
        state.saved.push((image_id, request.clone()));

        let mut persisted = Vec::new();
        if !request.skip {
            for annotation in &request.annotations {
                state.next_annotation_id += 1;
                persisted.push(AnnotationRecord {
                    id: state.next_annotation_id,
                    image_id: Some(image_id),
                    category_id: annotation.category_id,
                    x_center: annotation.x_center,
                    y_center: annotation.y_center,
                    width: annotation.width,
                    height: annotation.height,
                });
            }
        }
        let status = if request.skip {
            ImageStatus::Skipped
        } else {
            ImageStatus::Labeled
        };
        if let Some(image) = state.images.get_mut(&image_id) {
            image.annotations = persisted.clone();
            image.status = status;
        }

        let echo = state.echo_saved;
        Ok(SaveResponse {
            message: Some("saved".to_string()),
            status: Some(status),
            count: Some(persisted.len()),
            annotations: echo.then_some(persisted),
        })
    }
}
