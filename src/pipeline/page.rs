//! Per-page extraction: optimise one rendered page, call the extractor with
//! retry, and clean the result.
//!
//! [`extract_page`] never fails. Whatever goes wrong on a page ends up in
//! [`PageResult::error`] and the page contributes empty text, so a single
//! bad page cannot abort the document.

use crate::config::ImageProfile;
use crate::error::{ExtractorError, PageError};
use crate::output::PageResult;
use crate::pipeline::optimize::{optimize_image, OptimizedImage};
use crate::pipeline::postprocess::clean_page_text;
use crate::pipeline::retry::{RetryPolicy, Sleeper};
use async_trait::async_trait;
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, warn};

/// Turns one optimised page image into its verbatim text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &OptimizedImage) -> Result<String, ExtractorError>;
}

/// Everything [`extract_page`] needs besides the page itself.
#[derive(Clone, Copy)]
pub struct PageContext<'a> {
    pub extractor: &'a dyn TextExtractor,
    pub profile: &'a ImageProfile,
    pub retry: &'a RetryPolicy,
    pub sleeper: &'a dyn Sleeper,
}

/// Extract the text of page `index` from its rendered image.
pub async fn extract_page(index: usize, image: DynamicImage, ctx: PageContext<'_>) -> PageResult {
    let start = Instant::now();
    let page = index + 1;
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

    let profile = *ctx.profile;
    let optimized =
        match tokio::task::spawn_blocking(move || optimize_image(&image, &profile)).await {
            Ok(Ok(optimized)) => optimized,
            Ok(Err(e)) => {
                warn!("Page {}: image optimisation failed: {}", page, e);
                return PageResult::failed(
                    index,
                    0,
                    elapsed(start),
                    PageError::OptimizeFailed {
                        page,
                        detail: e.to_string(),
                    },
                );
            }
            Err(e) => {
                warn!("Page {}: optimisation task panicked: {}", page, e);
                return PageResult::failed(
                    index,
                    0,
                    elapsed(start),
                    PageError::OptimizeFailed {
                        page,
                        detail: e.to_string(),
                    },
                );
            }
        };

    let mut attempt = 0;
    loop {
        attempt += 1;
        match ctx.extractor.extract_text(&optimized).await {
            Ok(raw) => {
                let text = clean_page_text(&raw);
                debug!(
                    "Page {}: {} chars after {} attempt(s)",
                    page,
                    text.len(),
                    attempt
                );
                return PageResult {
                    index,
                    text,
                    attempts: attempt,
                    duration_ms: elapsed(start),
                    error: None,
                };
            }
            Err(e) if ctx.retry.should_retry(attempt) => {
                let delay = ctx.retry.delay_for(attempt);
                warn!(
                    "Page {}: attempt {}/{} failed ({}), retrying in {:?}",
                    page, attempt, ctx.retry.max_attempts, e, delay
                );
                ctx.sleeper.sleep(delay).await;
            }
            Err(e) => {
                warn!("Page {}: giving up after {} attempt(s): {}", page, attempt, e);
                return PageResult::failed(
                    index,
                    attempt,
                    elapsed(start),
                    PageError::ExtractorFailed {
                        page,
                        attempts: attempt,
                        detail: e.to_string(),
                    },
                );
            }
        }
    }
}
