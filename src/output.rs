//! Output types returned by the extraction pipeline.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Outcome of one page.
///
/// A failed page carries empty `text` and `Some(error)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 0-based page index.
    pub index: usize,
    /// Cleaned page text. Empty for blank or failed pages.
    pub text: String,
    /// Extractor calls made for this page (0 if it never reached the extractor).
    pub attempts: u32,
    /// Wall-clock time spent on this page, optimisation included.
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

impl PageResult {
    /// 1-based page number, as shown to humans.
    pub fn page_number(&self) -> usize {
        self.index + 1
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// A failed page carrying `error`.
    pub(crate) fn failed(index: usize, attempts: u32, duration_ms: u64, error: PageError) -> Self {
        Self {
            index,
            text: String::new(),
            attempts,
            duration_ms,
            error: Some(error),
        }
    }
}

/// Result of extracting a whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Non-empty page texts in page order, each followed by a newline, with
    /// trailing whitespace of the whole text trimmed.
    pub text: String,
    /// One entry per page, sorted by index.
    pub pages: Vec<PageResult>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// The first page error, in page order.
    pub fn first_error(&self) -> Option<&PageError> {
        self.pages.iter().find_map(|p| p.error.as_ref())
    }
}

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    /// Pages whose cleaned text is non-empty.
    pub pages_with_text: usize,
    /// Pages that succeeded but produced no text (blank pages).
    pub empty_pages: usize,
    pub failed_pages: usize,
    /// Extractor calls across all pages, retries included.
    pub total_attempts: u32,
    /// Time from start until the page count was known.
    pub render_open_ms: u64,
    pub total_duration_ms: u64,
}

impl ExtractionStats {
    /// Tally counters from page results.
    pub fn from_pages(pages: &[PageResult]) -> Self {
        let mut stats = Self {
            total_pages: pages.len(),
            ..Self::default()
        };
        for page in pages {
            stats.total_attempts += page.attempts;
            if !page.is_success() {
                stats.failed_pages += 1;
            } else if page.text.trim().is_empty() {
                stats.empty_pages += 1;
            } else {
                stats.pages_with_text += 1;
            }
        }
        stats
    }
}

/// PDF document metadata, read without rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
