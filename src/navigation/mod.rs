//! Navigation and prefetch pipeline.
//!
//! Keeps a forward queue of upcoming images whose blobs are fetched ahead of
//! time, the image currently on screen, and a bounded history of processed
//! images for stepping backwards. Background replenishment runs as a local
//! task sharing the pipeline state through `Rc<RefCell<_>>`; the state is
//! never borrowed across an `.await`.

mod state;

use std::cell::RefCell;
use std::rc::Rc;

use boxmark_canvas::Annotation;

use crate::api::{ApiError, ImageApi, ImageRecord};
use crate::image_cache::ImageBlob;
use crate::task;

pub use state::{NavigationConfig, ProcessedEntry, ShownImage};
use state::{PipelineState, PrefetchGuard, PrefetchTracker};

/// Completed share of a batch as a whole percentage, rounded down so that
/// 100 means every item is done.
fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

/// Drives the forward queue and the processed-image history.
pub struct Navigator<A> {
    api: Rc<A>,
    config: NavigationConfig,
    state: Rc<RefCell<PipelineState>>,
    prefetch: Rc<PrefetchTracker>,
}

impl<A> Clone for Navigator<A> {
    fn clone(&self) -> Self {
        Self {
            api: Rc::clone(&self.api),
            config: self.config,
            state: Rc::clone(&self.state),
            prefetch: Rc::clone(&self.prefetch),
        }
    }
}

impl<A: ImageApi + 'static> Navigator<A> {
    pub fn new(api: Rc<A>, config: NavigationConfig) -> Self {
        let state = Rc::new(RefCell::new(PipelineState::new(&config)));
        Self {
            api,
            config,
            state,
            prefetch: Rc::new(PrefetchTracker::default()),
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Forward pipeline
    // ------------------------------------------------------------------

    /// Start over on a dataset: fetch a batch, prefetch its blobs one by one
    /// and show the first image.
    pub async fn initialize(&self, dataset_id: u64) -> Result<bool, ApiError> {
        self.initialize_with_progress(dataset_id, |_| {}).await
    }

    /// [`initialize`](Self::initialize), reporting prefetch progress (0-100)
    /// after every batch item. Progress never decreases and reaches 100 with
    /// the last item.
    ///
    /// A prefetch already running is superseded: its results are discarded.
    /// Returns `Ok(false)` if this call was itself superseded by a later
    /// initialization before it finished, in which case it left the
    /// pipeline alone.
    pub async fn initialize_with_progress(
        &self,
        dataset_id: u64,
        mut on_progress: impl FnMut(u8),
    ) -> Result<bool, ApiError> {
        let guard = PrefetchGuard::supersede(&self.prefetch);
        self.state.borrow_mut().reset();
        log::info!("Initializing dataset {}", dataset_id);

        let batch = match self.api.next_batch(dataset_id, self.config.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                log::warn!("Batch fetch failed, falling back to a single image: {}", e);
                self.api.next_image(dataset_id).await?.into_iter().collect()
            }
        };

        let total = batch.len();
        log::debug!("Prefetching {} images", total);
        for (i, record) in batch.into_iter().enumerate() {
            if !guard.is_current() {
                log::debug!("Initialization of dataset {} superseded", dataset_id);
                return Ok(false);
            }
            let fetched = self.api.image_file(record.id).await;
            if !guard.is_current() {
                log::debug!("Initialization of dataset {} superseded", dataset_id);
                return Ok(false);
            }
            match fetched {
                Ok(bytes) => {
                    let mut s = self.state.borrow_mut();
                    s.blobs.insert(record.id, bytes);
                    s.queue.push_back(record);
                }
                Err(e) => {
                    log::warn!("Skipping image {}: prefetch failed: {}", record.id, e);
                }
            }
            let progress = percent(i + 1, total);
            self.state.borrow_mut().progress = progress;
            log::debug!("Prefetch progress: {}%", progress);
            on_progress(progress);
        }
        if !guard.is_current() {
            log::debug!("Initialization of dataset {} superseded", dataset_id);
            return Ok(false);
        }
        if total == 0 {
            self.state.borrow_mut().progress = 100;
            on_progress(100);
        }

        let mut s = self.state.borrow_mut();
        match s.queue.pop_front() {
            Some(record) => {
                let blob = s.blobs.get(record.id);
                s.show(record, blob);
            }
            None => s.show_nothing(),
        }
        Ok(true)
    }

    /// Show the next queued image. Starts a background replenish when the
    /// queue drops below the low-water mark, and fetches directly from the
    /// server when the queue is already empty.
    ///
    /// Returns `Ok(false)` when there is nothing left anywhere.
    pub async fn advance(&self, dataset_id: u64) -> Result<bool, ApiError> {
        if let Some(remaining) = self.pop_into_current() {
            if remaining < self.config.low_water_mark {
                self.spawn_replenish(dataset_id);
            }
            return Ok(true);
        }

        log::debug!("Queue empty, fetching the next image directly");
        let next = self.api.next_image(dataset_id).await?;
        let Some(record) = next else {
            // a background replenish may have filled the queue meanwhile
            if self.pop_into_current().is_some() {
                return Ok(true);
            }
            self.state.borrow_mut().show_nothing();
            return Ok(false);
        };

        let blob = self.fetch_blob(record.id).await;
        self.show_forward(record, blob);
        self.spawn_replenish(dataset_id);
        Ok(true)
    }

    /// Pop the queue head onto the screen. Returns the remaining queue
    /// length, or `None` if the queue was empty.
    fn pop_into_current(&self) -> Option<usize> {
        let mut s = self.state.borrow_mut();
        let record = s.queue.pop_front()?;
        let blob = s.blobs.get(record.id);
        s.show(record, blob);
        s.browsing = false;
        s.processed.seek_head();
        Some(s.queue.len())
    }

    fn show_forward(&self, record: ImageRecord, blob: Option<ImageBlob>) {
        let mut s = self.state.borrow_mut();
        s.show(record, blob);
        s.browsing = false;
        s.processed.seek_head();
    }

    /// Start a background replenish unless a prefetch is already running.
    fn spawn_replenish(&self, dataset_id: u64) {
        let Some(guard) = PrefetchGuard::acquire(&self.prefetch) else {
            log::debug!("Replenish skipped: a prefetch is already running");
            return;
        };
        task::spawn_local(replenish(
            Rc::clone(&self.api),
            Rc::clone(&self.state),
            self.config.batch_size,
            dataset_id,
            guard,
        ));
    }

    /// Cached blob of an image, fetching it if needed. Failures are logged
    /// and yield `None`.
    async fn fetch_blob(&self, image_id: u64) -> Option<ImageBlob> {
        if let Some(blob) = self.state.borrow().blobs.get(image_id) {
            return Some(blob);
        }
        match self.api.image_file(image_id).await {
            Ok(bytes) => Some(self.state.borrow_mut().blobs.insert(image_id, bytes)),
            Err(e) => {
                log::warn!("Failed to fetch image {}: {}", image_id, e);
                None
            }
        }
    }

    /// Authoritative record plus blob of a processed image.
    async fn load_processed(&self, image_id: u64) -> Result<(ImageRecord, Option<ImageBlob>), ApiError> {
        log::debug!("Reloading image {} from server", image_id);
        let record = self.api.image(image_id).await?;
        let blob = self.fetch_blob(image_id).await;
        Ok((record, blob))
    }

    // ------------------------------------------------------------------
    // Processed-image history
    // ------------------------------------------------------------------

    /// Step back to the previous processed image, reloading its state from
    /// the server.
    ///
    /// Outside browsing mode the current image and `current_annotations`
    /// are first pushed onto the history (once). When the pipeline ran dry
    /// and nothing is shown, the newest processed image is shown instead.
    /// Returns `Ok(false)` when there is nothing to go back to. On error the
    /// cursor and the shown image are unchanged.
    pub async fn go_to_previous(&self, current_annotations: Vec<Annotation>) -> Result<bool, ApiError> {
        let target = {
            let mut s = self.state.borrow_mut();
            if s.processed.is_empty() {
                return Ok(false);
            }
            if s.browsing {
                s.processed.index().checked_sub(1)
            } else {
                s.processed.seek_head();
                match s.current.as_ref().map(|c| c.record.clone()) {
                    Some(record) => {
                        let entry = ProcessedEntry {
                            record,
                            annotations: current_annotations,
                        };
                        let on_top = s
                            .processed
                            .current()
                            .is_some_and(|top| top.record.id == entry.record.id);
                        if on_top {
                            if let Some(top) = s.processed.current_mut() {
                                top.annotations = entry.annotations;
                            }
                        } else {
                            log::debug!("Pushed image {} onto processed history", entry.record.id);
                            s.processed.push(entry);
                        }
                        s.processed.index().checked_sub(1)
                    }
                    None => Some(s.processed.index()),
                }
            }
        };
        let Some(target) = target else {
            return Ok(false);
        };
        let Some(image_id) = self.state.borrow().processed.get(target).map(|e| e.record.id) else {
            return Ok(false);
        };

        let (record, blob) = self.load_processed(image_id).await?;

        let mut s = self.state.borrow_mut();
        s.processed.seek(target);
        s.browsing = !s.processed.at_head();
        s.show(record, blob);
        log::debug!(
            "History: at {}/{} (browsing={})",
            s.processed.index() + 1,
            s.processed.len(),
            s.browsing
        );
        Ok(true)
    }

    /// Step forward through processed history. Only valid while browsing
    /// and not at the head; leaves browsing mode on reaching the head.
    pub async fn go_to_next(&self) -> Result<bool, ApiError> {
        let target = {
            let s = self.state.borrow();
            if !s.browsing || s.processed.at_head() {
                return Ok(false);
            }
            let target = s.processed.index() + 1;
            s.processed.get(target).map(|e| (target, e.record.id))
        };
        let Some((target, image_id)) = target else {
            return Ok(false);
        };

        let (record, blob) = self.load_processed(image_id).await?;

        let mut s = self.state.borrow_mut();
        s.processed.seek(target);
        s.browsing = !s.processed.at_head();
        s.show(record, blob);
        log::debug!(
            "History: at {}/{} (browsing={})",
            s.processed.index() + 1,
            s.processed.len(),
            s.browsing
        );
        Ok(true)
    }

    /// Record a saved or skipped image. Discards history past the cursor,
    /// replaces the entry under the cursor if it is the same image, and
    /// evicts the oldest entries past the cap.
    pub fn record_processed(&self, record: ImageRecord, annotations: Vec<Annotation>) {
        let mut s = self.state.borrow_mut();
        let entry = ProcessedEntry {
            record,
            annotations,
        };
        log::debug!(
            "Recording processed image {} ({} annotations)",
            entry.record.id,
            entry.annotations.len()
        );
        match s.processed.current_mut() {
            Some(top) if top.record.id == entry.record.id => *top = entry,
            _ => s.processed.push(entry),
        }
    }

    /// Replace the snapshot of the history entry being browsed. Returns
    /// `false` if not browsing that image.
    pub fn refresh_current_entry(&self, record: ImageRecord, annotations: Vec<Annotation>) -> bool {
        let mut s = self.state.borrow_mut();
        if !s.browsing {
            return false;
        }
        match s.processed.current_mut() {
            Some(entry) if entry.record.id == record.id => {
                entry.record = record;
                entry.annotations = annotations;
                true
            }
            _ => false,
        }
    }

    /// Leave browsing mode: move the cursor to the head without touching
    /// any data.
    pub fn exit_browsing(&self) {
        let mut s = self.state.borrow_mut();
        s.browsing = false;
        s.processed.seek_head();
    }

    /// Drop everything, releasing all cached blobs. A running prefetch is
    /// abandoned and its results discarded.
    pub fn reset(&self) {
        drop(PrefetchGuard::supersede(&self.prefetch));
        self.state.borrow_mut().reset();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current(&self) -> Option<ShownImage> {
        self.state.borrow().current.clone()
    }

    pub fn current_id(&self) -> Option<u64> {
        self.state.borrow().current.as_ref().map(ShownImage::id)
    }

    pub fn queue_len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    pub fn queued_ids(&self) -> Vec<u64> {
        self.state.borrow().queue.iter().map(|r| r.id).collect()
    }

    pub fn is_prefetching(&self) -> bool {
        self.prefetch.is_active()
    }

    /// Progress of the last initialization, 0-100.
    pub fn progress(&self) -> u8 {
        self.state.borrow().progress
    }

    pub fn is_browsing(&self) -> bool {
        self.state.borrow().browsing
    }

    /// Whether the pipeline ran dry and nothing is shown.
    pub fn is_exhausted(&self) -> bool {
        self.state.borrow().exhausted
    }

    pub fn processed_len(&self) -> usize {
        self.state.borrow().processed.len()
    }

    pub fn processed_ids(&self) -> Vec<u64> {
        self.state.borrow().processed.iter().map(|e| e.record.id).collect()
    }

    /// Cursor position in processed history.
    pub fn history_position(&self) -> usize {
        self.state.borrow().processed.index()
    }

    pub fn can_go_previous(&self) -> bool {
        let s = self.state.borrow();
        if s.browsing {
            return s.processed.can_undo();
        }
        match &s.current {
            Some(current) => match s.processed.last() {
                Some(top) if top.record.id == current.id() => s.processed.len() > 1,
                Some(_) => true,
                None => false,
            },
            None => !s.processed.is_empty(),
        }
    }

    pub fn can_go_next(&self) -> bool {
        let s = self.state.borrow();
        s.browsing && !s.processed.at_head()
    }

    pub fn blob_count(&self) -> usize {
        self.state.borrow().blobs.len()
    }
}

/// Fetch another batch and append the images not already queued or shown,
/// each once its blob has arrived. Failures skip the image. Stops without
/// touching the pipeline once a newer initialization has started.
async fn replenish<A: ImageApi>(
    api: Rc<A>,
    state: Rc<RefCell<PipelineState>>,
    batch_size: usize,
    dataset_id: u64,
    guard: PrefetchGuard,
) {
    log::debug!("Replenishing queue for dataset {}", dataset_id);
    let batch = match api.next_batch(dataset_id, batch_size).await {
        Ok(batch) => batch,
        Err(e) => {
            log::warn!("Background replenish failed: {}", e);
            return;
        }
    };

    let mut appended = 0;
    for record in batch {
        if !guard.is_current() {
            log::debug!("Replenish for dataset {} superseded, discarding", dataset_id);
            return;
        }
        if state.borrow().is_known(record.id) {
            log::debug!("Image {} already queued, skipping", record.id);
            continue;
        }
        let fetched = api.image_file(record.id).await;
        if !guard.is_current() {
            log::debug!("Replenish for dataset {} superseded, discarding", dataset_id);
            return;
        }
        match fetched {
            Ok(bytes) => {
                let mut s = state.borrow_mut();
                if s.is_known(record.id) {
                    continue;
                }
                s.blobs.insert(record.id, bytes);
                s.queue.push_back(record);
                appended += 1;
            }
            Err(e) => {
                log::warn!("Skipping image {}: prefetch failed: {}", record.id, e);
            }
        }
    }
    log::debug!(
        "Replenished {} images (queue length {})",
        appended,
        state.borrow().queue.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{record, FakeApi};
    use tokio::task::LocalSet;

    fn navigator(api: FakeApi, config: NavigationConfig) -> (Rc<FakeApi>, Navigator<FakeApi>) {
        let api = Rc::new(api);
        (Rc::clone(&api), Navigator::new(api, config))
    }

    fn config(batch_size: usize, low_water_mark: usize) -> NavigationConfig {
        NavigationConfig {
            batch_size,
            low_water_mark,
            ..Default::default()
        }
    }

    /// Let spawned replenish tasks run to completion.
    async fn settle(nav: &Navigator<FakeApi>) {
        for _ in 0..100 {
            if !nav.is_prefetching() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("replenish did not finish");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(200, 201), 99);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[tokio::test]
    async fn test_initialize_full_batch() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(30), NavigationConfig::default());
                let mut reported = Vec::new();
                nav.initialize_with_progress(1, |p| reported.push(p))
                    .await
                    .unwrap();

                assert_eq!(nav.current_id(), Some(1));
                assert_eq!(nav.queue_len() + 1, 20);
                assert_eq!(reported.len(), 20);
                assert!(reported.windows(2).all(|w| w[0] <= w[1]));
                assert_eq!(reported.last(), Some(&100));
                assert_eq!(nav.progress(), 100);
                assert!(!nav.is_prefetching());
                assert_eq!(api.state.borrow().batch_calls, 1);
                assert!(nav.current().unwrap().blob.is_some());
            })
            .await;
    }

    #[tokio::test]
    async fn test_initialize_skips_failed_blobs() {
        LocalSet::new()
            .run_until(async {
                let api = FakeApi::with_images(5);
                api.state.borrow_mut().failing_blobs.insert(3);
                let (_api, nav) = navigator(api, config(5, 1));
                let mut last = 0;
                nav.initialize_with_progress(1, |p| last = p).await.unwrap();

                assert_eq!(last, 100);
                assert_eq!(nav.current_id(), Some(1));
                assert_eq!(nav.queued_ids(), vec![2, 4, 5]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_initialize_falls_back_to_single_fetch() {
        LocalSet::new()
            .run_until(async {
                let api = FakeApi::with_images(5);
                api.state.borrow_mut().fail_batch = true;
                let (api, nav) = navigator(api, NavigationConfig::default());
                nav.initialize(1).await.unwrap();

                assert_eq!(nav.current_id(), Some(1));
                assert_eq!(nav.queue_len(), 0);
                assert_eq!(api.state.borrow().next_calls, 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_initialize_empty_dataset_is_exhausted() {
        LocalSet::new()
            .run_until(async {
                let (_api, nav) = navigator(FakeApi::with_images(0), NavigationConfig::default());
                nav.initialize(1).await.unwrap();
                assert!(nav.current().is_none());
                assert!(nav.is_exhausted());
                assert_eq!(nav.progress(), 100);
            })
            .await;
    }

    #[tokio::test]
    async fn test_initialize_supersedes_running_replenish() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(12), config(6, 5));
                nav.initialize(1).await.unwrap();
                assert!(nav.advance(1).await.unwrap());
                // replenish is spawned but has not run yet
                assert!(nav.is_prefetching());

                assert!(nav.initialize(1).await.unwrap());
                assert_eq!(nav.current_id(), Some(7));
                assert_eq!(nav.queued_ids(), vec![8, 9, 10, 11, 12]);
                assert!(!nav.is_prefetching());

                // the stale replenish gets an image but must not queue it
                api.state.borrow_mut().pending.push_back(record(20));
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(api.state.borrow().batch_calls, 3);
                assert_eq!(nav.queued_ids(), vec![8, 9, 10, 11, 12]);
                assert!(!nav.is_prefetching());
            })
            .await;
    }

    #[tokio::test]
    async fn test_replenish_skipped_while_prefetch_running() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(10), config(2, 5));
                nav.initialize(1).await.unwrap();
                let guard = PrefetchGuard::acquire(&nav.prefetch);
                assert!(guard.is_some());
                assert!(PrefetchGuard::acquire(&nav.prefetch).is_none());

                nav.spawn_replenish(1);
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(api.state.borrow().batch_calls, 1);

                drop(guard);
                assert!(!nav.is_prefetching());
                nav.spawn_replenish(1);
                settle(&nav).await;
                assert_eq!(api.state.borrow().batch_calls, 2);
                assert_eq!(nav.queued_ids(), vec![2, 3, 4]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_reset_abandons_running_replenish() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(4), config(2, 5));
                nav.initialize(1).await.unwrap();
                nav.spawn_replenish(1);
                nav.reset();
                assert!(!nav.is_prefetching());
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(api.state.borrow().batch_calls, 2);
                assert!(nav.queued_ids().is_empty());
                assert_eq!(nav.blob_count(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_advance_replenishes_below_low_water_mark() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(12), config(6, 5));
                nav.initialize(1).await.unwrap();
                assert_eq!(nav.queued_ids(), vec![2, 3, 4, 5, 6]);

                assert!(nav.advance(1).await.unwrap());
                assert_eq!(nav.current_id(), Some(2));
                assert!(nav.is_prefetching());
                settle(&nav).await;

                assert_eq!(api.state.borrow().batch_calls, 2);
                assert_eq!(nav.queued_ids(), vec![3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
                // blob of image 1 was released on leaving it
                assert_eq!(nav.blob_count(), nav.queue_len() + 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_replenish_filters_known_images() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(4), config(2, 5));
                nav.initialize(1).await.unwrap();
                // the server hands image 2 out again
                {
                    let mut s = api.state.borrow_mut();
                    let again = s.images[&2].clone();
                    s.pending.push_front(again);
                }
                nav.spawn_replenish(1);
                settle(&nav).await;
                assert_eq!(nav.queued_ids(), vec![2, 3]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_advance_on_empty_queue_fetches_directly() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(3), config(1, 5));
                nav.initialize(1).await.unwrap();
                assert_eq!(nav.queue_len(), 0);

                assert!(nav.advance(1).await.unwrap());
                assert_eq!(nav.current_id(), Some(2));
                assert_eq!(api.state.borrow().next_calls, 1);
                settle(&nav).await;
                assert_eq!(nav.queued_ids(), vec![3]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_advance_past_last_image_is_exhausted() {
        LocalSet::new()
            .run_until(async {
                let (_api, nav) = navigator(FakeApi::with_images(1), NavigationConfig::default());
                nav.initialize(1).await.unwrap();
                assert!(!nav.advance(1).await.unwrap());
                assert!(nav.current().is_none());
                assert!(nav.is_exhausted());
                assert_eq!(nav.blob_count(), 0);
            })
            .await;
    }

    async fn process_and_advance(nav: &Navigator<FakeApi>) {
        let current = nav.current().unwrap();
        nav.record_processed(current.record, Vec::new());
        nav.advance(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_previous_then_next_is_symmetric() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(10), config(10, 1));
                nav.initialize(1).await.unwrap();
                process_and_advance(&nav).await;
                process_and_advance(&nav).await;
                assert_eq!(nav.current_id(), Some(3));
                assert_eq!(nav.processed_ids(), vec![1, 2]);
                assert!(nav.can_go_previous());
                assert!(!nav.can_go_next());

                assert!(nav.go_to_previous(Vec::new()).await.unwrap());
                assert_eq!(nav.current_id(), Some(2));
                assert!(nav.is_browsing());
                assert_eq!(nav.processed_ids(), vec![1, 2, 3]);
                assert_eq!(api.state.borrow().image_calls, vec![2]);

                assert!(nav.go_to_next().await.unwrap());
                assert_eq!(nav.current_id(), Some(3));
                assert!(!nav.is_browsing());
                assert!(!nav.go_to_next().await.unwrap());

                // second round does not push image 3 twice
                assert!(nav.go_to_previous(Vec::new()).await.unwrap());
                assert_eq!(nav.processed_ids(), vec![1, 2, 3]);
                assert!(nav.go_to_previous(Vec::new()).await.unwrap());
                assert_eq!(nav.current_id(), Some(1));
                assert!(!nav.go_to_previous(Vec::new()).await.unwrap());
            })
            .await;
    }

    #[tokio::test]
    async fn test_previous_without_history_is_noop() {
        LocalSet::new()
            .run_until(async {
                let (_api, nav) = navigator(FakeApi::with_images(3), NavigationConfig::default());
                nav.initialize(1).await.unwrap();
                assert!(!nav.can_go_previous());
                assert!(!nav.go_to_previous(Vec::new()).await.unwrap());
                assert_eq!(nav.processed_len(), 0);
                assert!(!nav.go_to_next().await.unwrap());
            })
            .await;
    }

    #[tokio::test]
    async fn test_previous_failure_leaves_state() {
        LocalSet::new()
            .run_until(async {
                let (api, nav) = navigator(FakeApi::with_images(5), NavigationConfig::default());
                nav.initialize(1).await.unwrap();
                process_and_advance(&nav).await;
                api.state.borrow_mut().fail_image = true;

                assert!(nav.go_to_previous(Vec::new()).await.is_err());
                assert_eq!(nav.current_id(), Some(2));
                assert!(!nav.is_browsing());
                assert_eq!(nav.history_position(), nav.processed_len() - 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_previous_after_exhaustion_shows_last_processed() {
        LocalSet::new()
            .run_until(async {
                let (_api, nav) = navigator(FakeApi::with_images(2), NavigationConfig::default());
                nav.initialize(1).await.unwrap();
                process_and_advance(&nav).await;
                process_and_advance(&nav).await;
                assert!(nav.is_exhausted());

                assert!(nav.go_to_previous(Vec::new()).await.unwrap());
                assert_eq!(nav.current_id(), Some(2));
                assert!(!nav.is_browsing());

                assert!(nav.go_to_previous(Vec::new()).await.unwrap());
                assert_eq!(nav.current_id(), Some(1));
                assert!(nav.is_browsing());
            })
            .await;
    }

    #[tokio::test]
    async fn test_processed_history_is_bounded() {
        LocalSet::new()
            .run_until(async {
                let config = NavigationConfig {
                    max_processed: 3,
                    ..config(10, 1)
                };
                let (_api, nav) = navigator(FakeApi::with_images(10), config);
                nav.initialize(1).await.unwrap();
                for _ in 0..5 {
                    process_and_advance(&nav).await;
                }
                assert_eq!(nav.processed_ids(), vec![3, 4, 5]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_exit_browsing_and_refresh() {
        LocalSet::new()
            .run_until(async {
                let (_api, nav) = navigator(FakeApi::with_images(5), NavigationConfig::default());
                nav.initialize(1).await.unwrap();
                process_and_advance(&nav).await;
                process_and_advance(&nav).await;
                nav.go_to_previous(Vec::new()).await.unwrap();
                nav.go_to_previous(Vec::new()).await.unwrap();
                assert_eq!(nav.current_id(), Some(1));

                let record = nav.current().unwrap().record;
                assert!(nav.refresh_current_entry(record.clone(), Vec::new()));

                nav.exit_browsing();
                assert!(!nav.is_browsing());
                assert_eq!(nav.history_position(), 2);
                assert_eq!(nav.current_id(), Some(1));
                assert!(!nav.refresh_current_entry(record, Vec::new()));
            })
            .await;
    }
}
