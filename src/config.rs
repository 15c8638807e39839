//! Configuration types for page-by-page PDF text extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks and to diff two runs to see why
//! their outputs differ.

use crate::error::ExtractError;
use crate::pipeline::retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a document extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use contract_ocr::{Concurrency, ExtractionConfig, ImageProfile};
///
/// let config = ExtractionConfig::builder()
///     .scale(1.5)
///     .image_profile(ImageProfile::fast())
///     .concurrency(Concurrency::Pooled { workers: 4 })
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Multiplier on native page resolution before rasterisation. Range: 0.25–4.0. Default: 1.5.
    ///
    /// 1.5× of a 72-DPI page box gives ~108 DPI, enough for a vision model to
    /// read body text before the optimiser shrinks the image anyway.
    pub scale: f32,

    /// Hard cap on either rendered dimension in pixels. Default: 3000.
    ///
    /// Protects memory against oversized page boxes (posters, engineering
    /// drawings) independently of `scale`.
    pub max_rendered_pixels: u32,

    /// Resize and re-encode policy applied to each page before upload.
    pub image_profile: ImageProfile,

    /// Page scheduling policy. Default: pooled with 4 workers.
    pub concurrency: Concurrency,

    /// Attempt budget and backoff for failed extractor calls. Default: 2 attempts, 2 s apart.
    pub retry: RetryPolicy,

    /// Wait implementation used between attempts. Default: [`TokioSleeper`].
    pub sleeper: Arc<dyn Sleeper>,

    /// LLM model identifier, e.g. "gemini-2.5-flash", "gpt-4.1-nano".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every LLM call. Default: 0.0.
    ///
    /// Transcription and clause analysis both want the most literal answer.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom system prompt for page transcription. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to a pdfium shared library. Falls back to
    /// `PDFIUM_LIB_PATH`, then to the system library search path.
    pub pdfium_library: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scale: 1.5,
            max_rendered_pixels: 3000,
            image_profile: ImageProfile::default(),
            concurrency: Concurrency::default(),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            api_timeout_secs: 60,
            system_prompt: None,
            password: None,
            pdfium_library: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("scale", &self.scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("image_profile", &self.image_profile)
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(0.25, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn image_profile(mut self, profile: ImageProfile) -> Self {
        self.config.image_profile = profile;
        self
    }

    /// Override only the long-edge bound of the current image profile.
    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.image_profile.max_dimension = px.max(MIN_DIMENSION);
        self
    }

    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.config.concurrency = match concurrency {
            Concurrency::Pooled { workers } => Concurrency::Pooled {
                workers: workers.max(1),
            },
            other => other,
        };
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n.max(1);
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.retry.backoff = backoff;
        self
    }

    /// Shorthand for a fixed delay between attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.backoff = Backoff::Fixed(delay);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.config.sleeper = sleeper;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "Scale must be a positive number, got {}",
                c.scale
            )));
        }
        if c.image_profile.max_dimension < MIN_DIMENSION {
            return Err(ExtractError::InvalidConfig(format!(
                "Image max dimension must be ≥ {MIN_DIMENSION}, got {}",
                c.image_profile.max_dimension
            )));
        }
        if let OutputFormat::Jpeg { quality } = c.image_profile.format {
            if !(1..=100).contains(&quality) {
                return Err(ExtractError::InvalidConfig(format!(
                    "JPEG quality must be 1–100, got {quality}"
                )));
            }
        }
        if c.retry.max_attempts == 0 {
            return Err(ExtractError::InvalidConfig(
                "Retry policy needs at least one attempt".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Image policy ─────────────────────────────────────────────────────────

/// Smallest long-edge bound the builder accepts.
pub const MIN_DIMENSION: u32 = 16;

/// How each rendered page is shrunk and re-encoded before upload.
///
/// This is a cost/accuracy dial, not a fixed algorithm: a smaller long edge
/// and grayscale JPEG cut upload size and latency, at some OCR accuracy cost
/// on fine print. Three presets cover the useful points on that curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProfile {
    /// Upper bound on the longer image side, in pixels.
    pub max_dimension: u32,
    /// Resampling filter used when downscaling.
    pub resample: Resample,
    /// Colour mode of the uploaded image.
    pub color: ColorMode,
    /// Encoding of the uploaded image.
    pub format: OutputFormat,
}

impl ImageProfile {
    /// 1024 px, Lanczos, grayscale JPEG q85. The default.
    pub const fn compact() -> Self {
        Self {
            max_dimension: 1024,
            resample: Resample::Lanczos3,
            color: ColorMode::Grayscale,
            format: OutputFormat::Jpeg { quality: 85 },
        }
    }

    /// 1000 px, Lanczos, RGB JPEG q85. For documents where colour carries
    /// meaning (stamps, highlighted clauses).
    pub const fn color() -> Self {
        Self {
            max_dimension: 1000,
            resample: Resample::Lanczos3,
            color: ColorMode::Rgb,
            format: OutputFormat::Jpeg { quality: 85 },
        }
    }

    /// 800 px, bilinear, grayscale JPEG q85. Cheapest and fastest.
    pub const fn fast() -> Self {
        Self {
            max_dimension: 800,
            resample: Resample::Bilinear,
            color: ColorMode::Grayscale,
            format: OutputFormat::Jpeg { quality: 85 },
        }
    }

    /// Same as `self` but encoded losslessly.
    pub const fn lossless(mut self) -> Self {
        self.format = OutputFormat::Png;
        self
    }
}

impl Default for ImageProfile {
    fn default() -> Self {
        Self::compact()
    }
}

/// Resampling filter for the downscale step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resample {
    Nearest,
    Bilinear,
    CatmullRom,
    #[default]
    Lanczos3,
}

impl Resample {
    pub(crate) fn filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Bilinear => FilterType::Triangle,
            Resample::CatmullRom => FilterType::CatmullRom,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Colour mode of the optimised image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMode {
    /// 8-bit luma. Text legibility does not need colour.
    #[default]
    Grayscale,
    /// 8-bit RGB, alpha dropped.
    Rgb,
}

/// Encoding of the optimised image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Baseline JPEG at the given quality (1–100).
    Jpeg { quality: u8 },
    /// PNG with best compression.
    Png,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpeg { quality: 85 }
    }
}

impl OutputFormat {
    /// MIME type sent alongside the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

// ── Scheduling policy ────────────────────────────────────────────────────

/// How pages are scheduled onto the extractor.
///
/// Both modes emit results in page order; they differ only in how many
/// extractor calls are in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Concurrency {
    /// One page at a time. Lowest peak memory, highest latency.
    Sequential,
    /// Up to `workers` pages in flight, never more than the page count.
    Pooled { workers: usize },
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency::Pooled { workers: 4 }
    }
}

impl Concurrency {
    /// Upper bound on in-flight pages before the page count is known.
    pub fn workers(self) -> usize {
        match self {
            Concurrency::Sequential => 1,
            Concurrency::Pooled { workers } => workers.max(1),
        }
    }

    /// Effective number of in-flight pages for a document of `page_count` pages.
    pub fn width(self, page_count: usize) -> usize {
        self.workers().min(page_count).max(1)
    }
}
