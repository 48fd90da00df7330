//! Progress-callback trait for per-page flattening events.
//!
//! Inject an [`Arc<dyn FlattenProgressCallback>`] via
//! [`crate::config::FlattenConfigBuilder::progress_callback`] to observe a
//! run as it walks the document. Pages are flattened strictly in order on
//! the calling thread, so events arrive in page order.
//!
//! # Example
//!
//! ```rust
//! use spool_flatten::{FlattenConfig, FlattenProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     flattened: AtomicUsize,
//! }
//!
//! impl FlattenProgressCallback for CountingCallback {
//!     fn on_page_flattened(&self, page_num: usize, total_pages: usize, encoded_bytes: usize) {
//!         self.flattened.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} ({} bytes)", page_num, total_pages, encoded_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { flattened: AtomicUsize::new(0) });
//!
//! let config = FlattenConfig::builder()
//!     .progress_callback(counter as Arc<dyn FlattenProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it flattens each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait FlattenProgressCallback: Send + Sync {
    /// Called once after the source document is loaded, before page 1.
    fn on_flatten_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rendered.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once a page has been rendered, converted and encoded.
    ///
    /// # Arguments
    /// * `page_num`      — 1-indexed page number
    /// * `total_pages`   — total pages
    /// * `encoded_bytes` — size of the page's image stream in the output
    fn on_page_flattened(&self, page_num: usize, total_pages: usize, encoded_bytes: usize) {
        let _ = (page_num, total_pages, encoded_bytes);
    }

    /// Called once after the output has been assembled.
    ///
    /// Not called when the run aborts.
    fn on_flatten_complete(&self, total_pages: usize, output_bytes: u64) {
        let _ = (total_pages, output_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FlattenProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FlattenConfig`].
pub type ProgressCallback = Arc<dyn FlattenProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl FlattenProgressCallback for Recorder {
        fn on_flatten_start(&self, total_pages: usize) {
            self.events.lock().unwrap().push(format!("start {total_pages}"));
        }

        fn on_page_flattened(&self, page_num: usize, _total: usize, _bytes: usize) {
            self.events.lock().unwrap().push(format!("page {page_num}"));
        }

        fn on_flatten_complete(&self, total_pages: usize, _output_bytes: u64) {
            self.events.lock().unwrap().push(format!("done {total_pages}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_flatten_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_flattened(1, 2, 1024);
        cb.on_flatten_complete(2, 4096);
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_flatten_start(2);
        rec.on_page_start(1, 2);
        rec.on_page_flattened(1, 2, 10);
        rec.on_page_flattened(2, 2, 10);
        rec.on_flatten_complete(2, 100);
        assert_eq!(
            *rec.events.lock().unwrap(),
            vec!["start 2", "page 1", "page 2", "done 2"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_flatten_start(1);
        cb.on_page_flattened(1, 1, 1);
    }
}
