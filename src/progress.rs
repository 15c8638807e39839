//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the document. The CLI uses this to
//! drive its progress bar.
//!
//! # Example
//!
//! Collect the pages a person should re-read by hand:
//!
//! ```rust
//! use contract_ocr::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct ReviewQueue(Mutex<Vec<usize>>);
//!
//! impl ExtractionProgressCallback for ReviewQueue {
//!     fn on_page_error(&self, page_num: usize, _total_pages: usize, _error: &str) {
//!         if let Ok(mut pages) = self.0.lock() {
//!             pages.push(page_num);
//!         }
//!     }
//! }
//!
//! let queue = Arc::new(ReviewQueue::default());
//! let config = ExtractionConfig::builder()
//!     .progress_callback(queue.clone())
//!     .build()
//!     .unwrap();
//! # drop(config);
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With [`crate::Concurrency::Pooled`], `on_page_start`, `on_page_complete`
/// and `on_page_error` may fire for several pages at once and out of page
/// order. Protect shared state with `Mutex` or atomics.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the page count is known, before any page is extracted.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when work on a rendered page begins.
    ///
    /// `page_num` is 1-indexed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced text (possibly empty for a blank page).
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages
    /// * `text_len`   : byte length of the cleaned page text
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page failed to render, or its extractor calls failed
    /// after all retries.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    ///
    /// `success_count` counts pages without a [`crate::PageError`].
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Remembers which pages failed, with the message shown to the user.
    #[derive(Default)]
    struct FailedPages(Mutex<Vec<(usize, String)>>);

    impl ExtractionProgressCallback for FailedPages {
        fn on_page_error(&self, page_num: usize, _total_pages: usize, error: &str) {
            self.0.lock().unwrap().push((page_num, error.to_string()));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_extraction_complete(5, 4);
    }

    #[test]
    fn overriding_one_method_keeps_the_other_defaults() {
        let failed = FailedPages::default();
        let cb: &dyn ExtractionProgressCallback = &failed;

        cb.on_extraction_start(4);
        cb.on_page_start(3, 4);
        cb.on_page_error(3, 4, "call timed out after 60s");
        cb.on_page_complete(1, 4, 812);
        cb.on_page_error(2, 4, "rasterisation failed");
        cb.on_extraction_complete(4, 2);

        let recorded = failed.0.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                (3, "call timed out after 60s".to_string()),
                (2, "rasterisation failed".to_string()),
            ]
        );
    }
}
