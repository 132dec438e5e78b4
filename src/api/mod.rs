//! Collaborator API used by the navigation pipeline and the workspace.
//!
//! [`ImageApi`] describes the request/response contract of the annotation
//! server; [`HttpApi`] implements it over HTTP.

mod error;
mod http;
#[cfg(test)]
pub(crate) mod mock;
mod types;

use std::future::Future;

use boxmark_canvas::Category;

pub use error::ApiError;
pub use http::HttpApi;
pub use types::{
    AnnotationRecord, CategoryRecord, DEFAULT_CATEGORY_COLOR, ImageRecord, ImageStatus,
    SaveRequest, SaveResponse,
};

/// Request/response contract of the annotation server.
///
/// Futures are polled on a single-threaded executor and need not be `Send`.
pub trait ImageApi {
    /// Categories of a dataset, in server order.
    fn categories(&self, dataset_id: u64) -> impl Future<Output = Result<Vec<Category>, ApiError>>;

    /// Up to `count` upcoming images of a dataset.
    fn next_batch(
        &self,
        dataset_id: u64,
        count: usize,
    ) -> impl Future<Output = Result<Vec<ImageRecord>, ApiError>>;

    /// The single next image, or `None` when nothing is left.
    fn next_image(&self, dataset_id: u64)
    -> impl Future<Output = Result<Option<ImageRecord>, ApiError>>;

    /// Authoritative state of one image.
    fn image(&self, image_id: u64) -> impl Future<Output = Result<ImageRecord, ApiError>>;

    /// Raw encoded image bytes.
    fn image_file(&self, image_id: u64) -> impl Future<Output = Result<Vec<u8>, ApiError>>;

    /// Replace the annotations of an image and mark it processed.
    fn save(
        &self,
        image_id: u64,
        request: &SaveRequest,
    ) -> impl Future<Output = Result<SaveResponse, ApiError>>;
}
