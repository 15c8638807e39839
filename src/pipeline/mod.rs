//! Pipeline stages for page-by-page PDF text extraction.
//!
//! Each submodule implements one step, so each can be tested alone and the
//! rasteriser or the extractor can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ optimize ──▶ encode ──▶ page (extractor + retry) ──▶ postprocess
//! (bytes)   (pdfium)   (resize,     (base64)   (vision LLM)                  (cleanup)
//!                       gray, JPEG)
//! ```
//!
//! 1. [`input`]   : load a local path or download a URL into memory
//! 2. [`render`]  : rasterise pages on a blocking thread, one at a time
//! 3. [`optimize`]: shrink and re-encode each page before upload
//! 4. [`encode`]  : base64-wrap the optimised image for the vision API
//! 5. [`page`]    : call the extractor with [`retry`]; never fails a document
//! 6. [`postprocess`]: deterministic cleanup of model output

pub mod encode;
pub mod input;
pub mod optimize;
pub mod page;
pub mod postprocess;
pub mod render;
pub mod retry;
