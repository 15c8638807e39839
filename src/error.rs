//! Error types for the contract-ocr library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`ExtractError`]: **Fatal**: the operation cannot produce a result at
//!   all (unreadable input, corrupt PDF, no provider, every page empty).
//!   Returned as `Err(ExtractError)` from the top-level functions.
//!
//! * [`PageError`]: **Non-fatal**: a single page failed (render glitch,
//!   extractor still failing after retries) but the document carries on.
//!   Stored inside [`crate::output::PageResult`]; the page contributes an
//!   empty string to the document text.
//!
//! * [`ExtractorError`]: what a [`crate::pipeline::page::TextExtractor`]
//!   call returns on failure. Every variant is retried the same way; the
//!   distinction only matters for logs.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the contract-ocr library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input is not usable: not a path or URL, an empty document text,
    /// an empty question.
    #[error("Invalid input '{input}'")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("Input is not a valid PDF: '{origin}'\nFirst bytes: {magic:?}")]
    NotAPdf { origin: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium for your platform or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Extraction outcome ────────────────────────────────────────────────
    /// No page produced any text: every page was empty or failed, or the
    /// document has no pages at all.
    #[error("No text could be extracted from the PDF ({total_pages} pages){}", first_error_suffix(.first_error))]
    ExtractionFailed {
        total_pages: usize,
        first_error: Option<String>,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A text-model call made for `task` failed.
    #[error("LLM call for {task} failed: {detail}")]
    ModelCallFailed { task: &'static str, detail: String },

    /// The model answered, but not with the JSON shape `task` expects.
    #[error("LLM returned a malformed {task} response: {detail}")]
    MalformedResponse { task: &'static str, detail: String },

    /// A question was asked before any document was loaded into the session.
    #[error("No document has been loaded yet. Extract a document first.")]
    NoDocumentLoaded,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn first_error_suffix(first_error: &Option<String>) -> String {
    first_error
        .as_ref()
        .map(|e| format!("\nFirst error: {e}"))
        .unwrap_or_default()
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The extraction continues unless no page yields text.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed (malformed page, unsupported content).
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered image could not be resized or re-encoded.
    #[error("Page {page}: image optimisation failed: {detail}")]
    OptimizeFailed { page: usize, detail: String },

    /// The extractor kept failing until the attempt budget ran out.
    #[error("Page {page}: text extraction failed after {attempts} attempts: {detail}")]
    ExtractorFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },
}

/// Failure of a single extractor or completer call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractorError {
    /// The call did not finish within the configured timeout.
    #[error("call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider reported an error (quota, overload, auth, transport).
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider answered with something unusable.
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failed_display_with_first_error() {
        let e = ExtractError::ExtractionFailed {
            total_pages: 3,
            first_error: Some("Page 1: text extraction failed after 2 attempts: boom".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 pages"), "got: {msg}");
        assert!(msg.contains("boom"), "got: {msg}");
    }

    #[test]
    fn extraction_failed_display_without_pages() {
        let e = ExtractError::ExtractionFailed {
            total_pages: 0,
            first_error: None,
        };
        let msg = e.to_string();
        assert!(msg.contains("0 pages"), "got: {msg}");
        assert!(!msg.contains("First error"), "got: {msg}");
    }

    #[test]
    fn page_error_display() {
        let e = PageError::ExtractorFailed {
            page: 4,
            attempts: 2,
            detail: "provider error: 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Page 4"), "got: {msg}");
        assert!(msg.contains("2 attempts"), "got: {msg}");
    }

    #[test]
    fn extractor_timeout_display() {
        let e = ExtractorError::Timeout { secs: 60 };
        assert_eq!(e.to_string(), "call timed out after 60s");
    }

    #[test]
    fn malformed_response_names_task() {
        let e = ExtractError::MalformedResponse {
            task: "analysis",
            detail: "expected value at line 1".into(),
        };
        assert!(e.to_string().contains("analysis"));
    }
}
