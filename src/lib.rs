//! # contract-ocr
//!
//! Extract the text of PDF contracts page by page with a vision LLM, then
//! summarise, risk-flag, question and compare them.
//!
//! ## Why vision instead of a text layer?
//!
//! Contracts arrive as scans, phone photos printed to PDF, or documents with
//! stamps and signatures over the text. Their text layer is often missing or
//! garbage. Each page is instead rasterised, shrunk to a legible grayscale
//! image and read by a vision model, the way a person would read it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     local file or URL → bytes
//!  ├─ 2. Render    pdfium on a blocking thread, pages streamed one by one
//!  ├─ 3. Optimise  ≤1024 px, grayscale, JPEG
//!  ├─ 4. Extract   vision LLM per page, bounded concurrency, retry
//!  ├─ 5. Assemble  page texts in page order
//!  └─ 6. Analyse   summary / red flags / Q&A / version comparison
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contract_ocr::{extract, ContractAnalyst, ExtractionConfig, ProviderClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract("lease.pdf", &config).await?;
//!
//!     let analyst = ContractAnalyst::new(Arc::new(ProviderClient::from_config(&config)?));
//!     let analysis = analyst.analyze(&output.text).await?;
//!     println!("{}", analysis.summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `contract-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{
    Clause, ComparisonReport, ContractAnalyst, DocumentAnalysis, ModifiedClause, RiskAssessment,
};
pub use config::{
    ColorMode, Concurrency, ExtractionConfig, ExtractionConfigBuilder, ImageProfile, OutputFormat,
    Resample,
};
pub use error::{ExtractError, ExtractorError, PageError};
pub use extract::{
    extract, extract_document, extract_from_bytes, extract_sync, extract_to_file, inspect,
    inspect_with,
};
pub use output::{DocumentMetadata, ExtractionOutput, ExtractionStats, PageResult};
pub use pipeline::optimize::OptimizedImage;
pub use pipeline::page::TextExtractor;
pub use pipeline::render::{PdfiumRasterizer, Rasterizer, RenderSink, RenderedPage};
pub use pipeline::retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{ProviderClient, TextCompleter};
pub use session::DocumentSession;
