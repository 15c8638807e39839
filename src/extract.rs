//! Document extraction: rasterise, extract every page, assemble the text.
//!
//! ## Data flow
//!
//! ```text
//! spawn_blocking ──mpsc(workers)──▶ ReceiverStream ──buffered(width)──▶ sort ──▶ assemble
//!  (rasteriser)     RenderEvent       extract_page per page               by index
//! ```
//!
//! The rasteriser thread can only run `workers` pages ahead of the
//! extractors, so at most a handful of rendered bitmaps are alive at once.
//! `buffered` keeps up to `width` extractor calls in flight and yields them
//! in submission order; sequential mode is simply `width = 1`.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, PageError};
use crate::output::{DocumentMetadata, ExtractionOutput, ExtractionStats, PageResult};
use crate::pipeline::input;
use crate::pipeline::page::{extract_page, PageContext, TextExtractor};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer, RenderSink, RenderedPage};
use crate::progress::ExtractionProgressCallback;
use crate::provider::ProviderClient;
use futures::future;
use futures::stream::StreamExt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// What the rasteriser thread sends to the extraction side.
enum RenderEvent {
    Opened { page_count: usize },
    Page(RenderedPage),
}

/// [`RenderSink`] that forwards into a bounded channel, blocking the
/// rasteriser thread while the channel is full.
struct ChannelSink {
    tx: mpsc::Sender<RenderEvent>,
}

impl RenderSink for ChannelSink {
    fn document_opened(&mut self, page_count: usize) -> bool {
        self.tx
            .blocking_send(RenderEvent::Opened { page_count })
            .is_ok()
    }

    fn page_rendered(&mut self, page: RenderedPage) -> bool {
        self.tx.blocking_send(RenderEvent::Page(page)).is_ok()
    }
}

/// Extract the text of a PDF held in memory, with explicit collaborators.
///
/// This is the core of the crate; [`extract`] and friends only resolve the
/// input and the provider before calling it.
///
/// # Errors
/// * The rasteriser's fatal error if the document could not be opened.
/// * [`ExtractError::ExtractionFailed`] if no page produced any text,
///   including documents without pages.
pub async fn extract_document(
    pdf: Vec<u8>,
    rasterizer: Arc<dyn Rasterizer>,
    extractor: &dyn TextExtractor,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let (tx, mut rx) = mpsc::channel(config.concurrency.workers());
    let scale = config.scale;

    let render_task = tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink { tx };
        rasterizer.rasterize(&pdf, scale, &mut sink)
    });

    let page_count = match rx.recv().await {
        Some(RenderEvent::Opened { page_count }) => page_count,
        Some(RenderEvent::Page(_)) => {
            return Err(ExtractError::Internal(
                "Rasteriser produced a page before opening the document".into(),
            ))
        }
        None => {
            // The sender is gone without announcing a document: the task's
            // result says why.
            return match render_task.await {
                Ok(Err(e)) => Err(e),
                Ok(Ok(())) => Err(ExtractError::Internal(
                    "Rasteriser finished without opening the document".into(),
                )),
                Err(e) => Err(ExtractError::Internal(format!("Render task panicked: {e}"))),
            };
        }
    };
    let render_open_ms = total_start.elapsed().as_millis() as u64;

    let width = config.concurrency.width(page_count);
    info!("Extracting {} pages ({} in flight)", page_count, width);

    let progress = config.progress_callback.as_deref();
    if let Some(cb) = progress {
        cb.on_extraction_start(page_count);
    }

    let ctx = PageContext {
        extractor,
        profile: &config.image_profile,
        retry: &config.retry,
        sleeper: config.sleeper.as_ref(),
    };

    let mut pages: Vec<PageResult> = ReceiverStream::new(rx)
        .filter_map(|event| {
            future::ready(match event {
                RenderEvent::Page(page) => Some(page),
                RenderEvent::Opened { .. } => None,
            })
        })
        .map(|page| process_page(page, ctx, page_count, progress))
        .buffered(width)
        .collect()
        .await;

    match render_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!("Rasteriser stopped after {} of {} pages: {}", pages.len(), page_count, e);
            fill_missing_pages(&mut pages, page_count, &e.to_string());
        }
        Err(e) => return Err(ExtractError::Internal(format!("Render task panicked: {e}"))),
    }
    if pages.len() < page_count {
        fill_missing_pages(&mut pages, page_count, "page was never rendered");
    }

    pages.sort_by_key(|p| p.index);

    let text = assemble_text(&pages);
    let mut stats = ExtractionStats::from_pages(&pages);
    stats.render_open_ms = render_open_ms;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    if let Some(cb) = progress {
        cb.on_extraction_complete(page_count, page_count.saturating_sub(stats.failed_pages));
    }

    if text.is_empty() {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string());
        return Err(ExtractError::ExtractionFailed {
            total_pages: page_count,
            first_error,
        });
    }

    info!(
        "Extraction complete: {}/{} pages with text, {} failed, {}ms",
        stats.pages_with_text, page_count, stats.failed_pages, stats.total_duration_ms
    );

    Ok(ExtractionOutput { text, pages, stats })
}

/// Run one rendered page through the extractor, reporting progress.
async fn process_page(
    page: RenderedPage,
    ctx: PageContext<'_>,
    total_pages: usize,
    progress: Option<&dyn ExtractionProgressCallback>,
) -> PageResult {
    let page_num = page.index + 1;
    if let Some(cb) = progress {
        cb.on_page_start(page_num, total_pages);
    }

    let result = match page.image {
        Ok(image) => extract_page(page.index, image, ctx).await,
        Err(error) => {
            warn!("{}", error);
            PageResult::failed(page.index, 0, 0, error)
        }
    };

    if let Some(cb) = progress {
        match &result.error {
            None => cb.on_page_complete(page_num, total_pages, result.text.len()),
            Some(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
        }
    }
    result
}

/// Record a render failure for every announced page that never arrived.
fn fill_missing_pages(pages: &mut Vec<PageResult>, page_count: usize, detail: &str) {
    let mut seen = vec![false; page_count];
    for p in pages.iter() {
        if let Some(slot) = seen.get_mut(p.index) {
            *slot = true;
        }
    }
    for (index, _) in seen.iter().enumerate().filter(|(_, seen)| !**seen) {
        pages.push(PageResult::failed(
            index,
            0,
            0,
            PageError::RenderFailed {
                page: index + 1,
                detail: detail.to_string(),
            },
        ));
    }
}

/// Join page texts in page order.
///
/// Pages whose text is blank are skipped; every other page is followed by a
/// newline, and trailing whitespace of the whole result is removed.
pub fn assemble_text(pages: &[PageResult]) -> String {
    let mut text = String::new();
    for page in pages.iter().filter(|p| !p.text.trim().is_empty()) {
        text.push_str(&page.text);
        text.push('\n');
    }
    text.truncate(text.trim_end().len());
    text
}

// ── Convenience entry points ─────────────────────────────────────────────

/// Extract the text of a PDF file or URL.
///
/// This is the primary entry point for the library. The provider is
/// resolved from `config` and the environment (see
/// [`crate::provider::resolve_provider`]); pages are rendered with pdfium.
///
/// # Example
/// ```rust,no_run
/// use contract_ocr::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = extract("lease.pdf", &ExtractionConfig::default()).await?;
/// println!("{}", output.text);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let input = input.as_ref();
    info!("Starting extraction: {}", input);
    let pdf = input::load_input(input, config.download_timeout_secs).await?;
    extract_from_bytes(pdf, config).await
}

/// Extract the text of PDF bytes already in memory.
pub async fn extract_from_bytes(
    bytes: impl Into<Vec<u8>>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let bytes = bytes.into();
    input::check_magic(&bytes, "<in-memory bytes>")?;

    let client = ProviderClient::from_config(config)?;
    let rasterizer = Arc::new(PdfiumRasterizer::from_config(config));
    extract_document(bytes, rasterizer, &client, config).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside one.
pub fn extract_sync(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input, config))
}

/// Extract a PDF and write the text to `output_path`.
///
/// The file is written atomically: readers never see a partial file.
pub async fn extract_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract(input, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let text = output.text;

    tokio::task::spawn_blocking(move || write_text_atomic(&path, &text))
        .await
        .map_err(|e| ExtractError::Internal(format!("Write task panicked: {e}")))??;

    Ok(output.stats)
}

/// Write `contents`, newline-terminated, to `path` via a temp file in the
/// same directory, then rename over the target.
pub fn write_text_atomic(path: &Path, contents: &str) -> Result<(), ExtractError> {
    let fail = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(fail)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(fail)?;
    tmp.write_all(contents.as_bytes()).map_err(fail)?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        tmp.write_all(b"\n").map_err(fail)?;
    }
    tmp.persist(path).map_err(|e| fail(e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Read PDF metadata without extracting any text.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(input: impl AsRef<str>) -> Result<DocumentMetadata, ExtractError> {
    inspect_with(input, &ExtractionConfig::default()).await
}

/// [`inspect`] honouring the password, pdfium library and download timeout
/// of `config`.
pub async fn inspect_with(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentMetadata, ExtractError> {
    let pdf = input::load_input(input.as_ref(), config.download_timeout_secs).await?;
    let rasterizer = PdfiumRasterizer::from_config(config);

    tokio::task::spawn_blocking(move || rasterizer.metadata(&pdf))
        .await
        .map_err(|e| ExtractError::Internal(format!("Metadata task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, text: &str) -> PageResult {
        PageResult {
            index,
            text: text.into(),
            attempts: 1,
            duration_ms: 0,
            error: None,
        }
    }

    #[test]
    fn assemble_skips_blank_pages() {
        let pages = [page(0, "one"), page(1, "  \n"), page(2, "three")];
        assert_eq!(assemble_text(&pages), "one\nthree");
    }

    #[test]
    fn assemble_trims_trailing_whitespace_only() {
        let pages = [page(0, "  indented"), page(1, "last  ")];
        assert_eq!(assemble_text(&pages), "  indented\nlast");
    }

    #[test]
    fn assemble_of_nothing_is_empty() {
        assert_eq!(assemble_text(&[]), "");
        assert_eq!(assemble_text(&[page(0, "")]), "");
    }

    #[test]
    fn missing_pages_are_filled_as_render_failures() {
        let mut pages = vec![page(0, "a"), page(2, "c")];
        fill_missing_pages(&mut pages, 4, "stopped");
        pages.sort_by_key(|p| p.index);

        let indices: Vec<_> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(matches!(
            pages[1].error,
            Some(PageError::RenderFailed { page: 2, .. })
        ));
        assert!(pages[3].text.is_empty());
    }

    #[test]
    fn atomic_write_creates_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("lease.txt");

        write_text_atomic(&path, "Clause 1").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Clause 1\n");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "no temp file left behind");
    }
}
