//! PDF rasterisation: open a PDF byte buffer and render each page to an image.
//!
//! ## Threading
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking and keeps
//! its document handles tied to the thread that opened them. A [`Rasterizer`]
//! therefore runs entirely inside one `spawn_blocking` thread and hands pages
//! out one at a time through a [`RenderSink`]. The document never leaves
//! that thread and is released as soon as `rasterize` returns, whether it
//! finished, failed, or the sink hung up.
//!
//! ## Why cap pixels as well as scale?
//!
//! Page boxes vary wildly: an A0 drawing at 1.5× would produce a
//! 5,000 × 7,000 px bitmap. `max_render_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded before the optimiser
//! shrinks the image further.

use crate::error::{ExtractError, PageError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rendered page, or the reason it could not be rendered.
#[derive(Debug)]
pub struct RenderedPage {
    /// 0-based page index.
    pub index: usize,
    pub image: Result<DynamicImage, PageError>,
}

/// Receives rasteriser output in page order.
///
/// Both methods return `false` when the receiver is gone; the rasteriser
/// must then stop rendering and return.
pub trait RenderSink {
    /// Called exactly once, after the document opened and before any page.
    fn document_opened(&mut self, page_count: usize) -> bool;

    /// Called once per page, in ascending index order.
    fn page_rendered(&mut self, page: RenderedPage) -> bool;
}

/// Opens a PDF and renders its pages.
///
/// Implementations block; callers run them on the blocking pool.
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf` at `scale` times its native resolution.
    ///
    /// Fatal errors (`CorruptPdf`, `PasswordRequired`, `WrongPassword`,
    /// `PdfiumBindingFailed`) are returned before `document_opened` is
    /// called. A page that fails to render is reported through the sink as
    /// an `Err` image, never as a fatal error.
    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        sink: &mut dyn RenderSink,
    ) -> Result<(), ExtractError>;
}

/// [`Rasterizer`] backed by a pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
    password: Option<String>,
    max_render_pixels: Option<u32>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to this library file (or directory containing it) instead of
    /// `PDFIUM_LIB_PATH` or the system search path.
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Cap either rendered dimension at `px` pixels.
    pub fn with_max_render_pixels(mut self, px: u32) -> Self {
        self.max_render_pixels = Some(px);
        self
    }

    /// Build from the relevant fields of an [`crate::ExtractionConfig`].
    pub fn from_config(config: &crate::ExtractionConfig) -> Self {
        Self {
            library_path: config.pdfium_library.clone(),
            password: config.password.clone(),
            max_render_pixels: Some(config.max_rendered_pixels),
        }
    }

    fn open<'a>(
        &self,
        pdfium: &'a Pdfium,
        pdf: &'a [u8],
    ) -> Result<PdfDocument<'a>, ExtractError> {
        pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| classify_load_error(&format!("{e:?}"), self.password.is_some()))
    }

    fn render_config(&self, scale: f32) -> PdfRenderConfig {
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        match self.max_render_pixels {
            Some(px) => config
                .set_maximum_width(px as i32)
                .set_maximum_height(px as i32),
            None => config,
        }
    }

    /// Read document metadata without rendering any page.
    pub fn metadata(&self, pdf: &[u8]) -> Result<DocumentMetadata, ExtractError> {
        let pdfium = bind_pdfium(self.library_path.as_deref())?;
        let document = self.open(&pdfium, pdf)?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
        })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf: &[u8],
        scale: f32,
        sink: &mut dyn RenderSink,
    ) -> Result<(), ExtractError> {
        let pdfium = bind_pdfium(self.library_path.as_deref())?;
        let document = self.open(&pdfium, pdf)?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        if !sink.document_opened(page_count) {
            return Ok(());
        }

        let render_config = self.render_config(scale);

        for index in 0..page_count {
            let image =
                render_page(pages, index, &render_config).map_err(|e| PageError::RenderFailed {
                    page: index + 1,
                    detail: format!("{e:?}"),
                });

            if let Ok(img) = &image {
                debug!(
                    "Rendered page {} → {}x{} px",
                    index + 1,
                    img.width(),
                    img.height()
                );
            }

            if !sink.page_rendered(RenderedPage { index, image }) {
                debug!("Page consumer hung up after page {}", index + 1);
                break;
            }
        }

        Ok(())
    }
}

fn render_page(
    pages: &PdfPages<'_>,
    index: usize,
    config: &PdfRenderConfig,
) -> Result<DynamicImage, PdfiumError> {
    let page = pages.get(index as PdfPageIndex)?;
    let bitmap = page.render_with_config(config)?;
    Ok(bitmap.as_image())
}

/// Bind to pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system
/// library search path.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let explicit = library
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => {
            let path = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Map a pdfium load failure onto the fatal error taxonomy.
fn classify_load_error(detail: &str, had_password: bool) -> ExtractError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ExtractError::WrongPassword
        } else {
            ExtractError::PasswordRequired
        }
    } else {
        ExtractError::CorruptPdf {
            detail: detail.to_string(),
        }
    }
}
