//! CLI binary for contract-ocr.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one task and prints the result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use contract_ocr::extract::write_text_atomic;
use contract_ocr::{
    extract, inspect_with, Concurrency, ContractAnalyst, DocumentSession, ExtractionConfig,
    ExtractionOutput, ExtractionProgressCallback, ImageProfile, ProgressCallback, ProviderClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// page. Pages may finish out of order in pooled mode.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// A spinner until `on_extraction_start` announces the page count.
    fn new_dynamic(label: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(format!("Opening {label}…"));
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting text from {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep long provider errors on one line.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if failed >= total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract the text of a contract (stdout)
  contract-ocr extract lease.pdf

  # Extract to a file, one page at a time
  contract-ocr extract --sequential lease.pdf -o lease.txt

  # Summary, key clauses and red flags
  contract-ocr analyze lease.pdf

  # Ask questions about a document
  contract-ocr ask lease.pdf -Q "What is the notice period?" -Q "Who pays maintenance?"

  # What changed between two versions, and is it riskier?
  contract-ocr compare lease-2023.pdf lease-2024.pdf

  # Inspect PDF metadata (no API key needed)
  contract-ocr inspect lease.pdf --json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default model gemini-2.5-flash)
  OPENAI_API_KEY          OpenAI API key (default model gpt-4.1-nano)
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium, or the directory holding it
  RUST_LOG                Log filter, overrides -v / -q

  A .env file in the working directory is loaded before arguments are read.
"#;

/// Extract, analyse and compare PDF contracts with vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "contract-ocr",
    version,
    about = "Extract, analyse and compare PDF contracts with vision LLMs",
    long_about = "Read PDF contracts (local files or URLs) page by page with a vision LLM, \
then summarise them, flag risky clauses, answer questions, or compare two versions. \
Supports OpenAI, Anthropic, Google Gemini, Ollama and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: SharedOpts,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the text of a PDF.
    Extract {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Write text to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output structured JSON (text, pages, stats) instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Summarise a contract and flag risky clauses.
    Analyze {
        input: String,

        #[arg(long)]
        json: bool,
    },

    /// Answer questions about a contract from its text alone.
    Ask {
        input: String,

        /// Question to ask; repeat for several.
        #[arg(short = 'Q', long = "question", required = true)]
        questions: Vec<String>,
    },

    /// Compare two versions of a contract.
    Compare {
        /// The earlier version.
        old: String,
        /// The version being proposed.
        new: String,

        #[arg(long)]
        json: bool,
    },

    /// Print PDF metadata only, no extraction.
    Inspect {
        input: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct SharedOpts {
    /// Render scale relative to the page's native size (0.25–4.0).
    #[arg(long, global = true, env = "CONTRACT_OCR_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// Image preset sent to the model.
    #[arg(long, global = true, env = "CONTRACT_OCR_PROFILE", value_enum, default_value = "compact")]
    profile: ProfileArg,

    /// Override the preset's longest image side, in pixels.
    #[arg(long, global = true, env = "CONTRACT_OCR_MAX_DIMENSION")]
    max_dimension: Option<u32>,

    /// Pages extracted concurrently.
    #[arg(short, long, global = true, env = "CONTRACT_OCR_WORKERS", default_value_t = 4)]
    workers: usize,

    /// One page at a time (same as --workers 1).
    #[arg(long, global = true, env = "CONTRACT_OCR_SEQUENTIAL")]
    sequential: bool,

    /// Extractor attempts per page, first attempt included.
    #[arg(long, global = true, env = "CONTRACT_OCR_MAX_ATTEMPTS", default_value_t = 2)]
    max_attempts: u32,

    /// Pause between attempts, in milliseconds.
    #[arg(long, global = true, env = "CONTRACT_OCR_RETRY_DELAY_MS", default_value_t = 2000)]
    retry_delay_ms: u64,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        global = true,
        env = "CONTRACT_OCR_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: gemini, openai, anthropic, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-nano).
    #[arg(long, global = true, env = "CONTRACT_OCR_MODEL")]
    model: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "CONTRACT_OCR_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom page transcription prompt.
    #[arg(long, global = true, env = "CONTRACT_OCR_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true, env = "CONTRACT_OCR_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "CONTRACT_OCR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "CONTRACT_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CONTRACT_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "CONTRACT_OCR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    Compact,
    Color,
    Fast,
}

impl From<ProfileArg> for ImageProfile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Compact => ImageProfile::compact(),
            ProfileArg::Color => ImageProfile::color(),
            ProfileArg::Fast => ImageProfile::fast(),
        }
    }
}

impl Command {
    fn wants_json(&self) -> bool {
        match self {
            Command::Extract { json, .. }
            | Command::Analyze { json, .. }
            | Command::Compare { json, .. }
            | Command::Inspect { json, .. } => *json,
            Command::Ask { .. } => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is the normal case.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let opts = &cli.opts;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !opts.quiet && !opts.no_progress && !cli.command.wants_json();
    let filter = if opts.verbose {
        "debug"
    } else if opts.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(opts).await?;

    match &cli.command {
        Command::Inspect { input, json } => {
            let meta = inspect_with(input, &config)
                .await
                .context("Failed to inspect PDF")?;

            if *json {
                print_json(&meta)?;
            } else {
                println!("File:         {}", input);
                if let Some(ref t) = meta.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = meta.author {
                    println!("Author:       {}", a);
                }
                if let Some(ref s) = meta.subject {
                    println!("Subject:      {}", s);
                }
                println!("Pages:        {}", meta.page_count);
                println!("PDF Version:  {}", meta.pdf_version);
                if let Some(ref p) = meta.producer {
                    println!("Producer:     {}", p);
                }
                if let Some(ref c) = meta.creator {
                    println!("Creator:      {}", c);
                }
                if let Some(ref d) = meta.creation_date {
                    println!("Created:      {}", d);
                }
            }
        }

        Command::Extract {
            input,
            output,
            json,
        } => {
            let result = extract_one(input, &config, show_progress).await?;

            if let Some(path) = output {
                write_text_atomic(path, &result.text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !opts.quiet {
                    eprintln!(
                        "{}  {}/{} pages with text  {}ms  →  {}",
                        if result.stats.failed_pages == 0 {
                            green("✔")
                        } else {
                            cyan("⚠")
                        },
                        result.stats.pages_with_text,
                        result.stats.total_pages,
                        result.stats.total_duration_ms,
                        bold(&path.display().to_string()),
                    );
                }
            } else if *json {
                print_json(&result)?;
            } else {
                print_text(&result.text)?;
            }

            if !opts.quiet && !show_progress && output.is_none() && !*json {
                eprintln!(
                    "Extracted {}/{} pages in {}ms",
                    result.stats.pages_with_text,
                    result.stats.total_pages,
                    result.stats.total_duration_ms
                );
                if result.stats.failed_pages > 0 {
                    eprintln!("  {} pages failed", result.stats.failed_pages);
                }
            }
        }

        Command::Analyze { input, json } => {
            let document = extract_one(input, &config, show_progress).await?;
            let analyst = analyst(&config)?;
            let analysis = analyst
                .analyze(&document.text)
                .await
                .context("Analysis failed")?;

            if *json {
                print_json(&analysis)?;
            } else {
                println!("{}\n\n{}\n", bold("SUMMARY"), analysis.summary);
                println!("{}", bold("KEY CLAUSES"));
                for clause in &analysis.key_clauses {
                    println!("  {} {}\n    {}", cyan("•"), bold(&clause.title), clause.detail);
                }
                println!("\n{}", bold("RED FLAGS"));
                if analysis.red_flags.is_empty() {
                    println!("  {}", dim("none found"));
                }
                for flag in &analysis.red_flags {
                    println!("  {} {}\n    {}", red("!"), bold(&flag.title), flag.detail);
                }
            }
        }

        Command::Ask { input, questions } => {
            let document = extract_one(input, &config, show_progress).await?;
            let mut session = DocumentSession::new(analyst(&config)?);
            session.load(&document);

            for question in questions {
                let answer = session
                    .ask(question)
                    .await
                    .with_context(|| format!("Failed to answer {question:?}"))?;
                println!("{} {}\n{}\n", cyan("Q:"), bold(question), answer);
            }
        }

        Command::Compare { old, new, json } => {
            let old_doc = extract_one(old, &config, show_progress).await?;
            let new_doc = extract_one(new, &config, show_progress).await?;
            let report = analyst(&config)?
                .compare(&old_doc.text, &new_doc.text)
                .await
                .context("Comparison failed")?;

            if *json {
                print_json(&report)?;
            } else {
                let risk = &report.overall_risk_assessment;
                println!("{} {}\n{}\n", bold("OVERALL RISK:"), risk.rating, risk.summary);
                for (title, clauses) in [
                    ("NEW CLAUSES", &report.new_clauses),
                    ("REMOVED CLAUSES", &report.removed_clauses),
                ] {
                    println!("{}", bold(title));
                    if clauses.is_empty() {
                        println!("  {}", dim("none"));
                    }
                    for clause in clauses {
                        println!("  {} {}\n    {}", cyan("•"), bold(&clause.title), clause.detail);
                    }
                    println!();
                }
                println!("{}", bold("MODIFIED CLAUSES"));
                if report.modified_clauses.is_empty() {
                    println!("  {}", dim("none"));
                }
                for m in &report.modified_clauses {
                    println!("  {} {}", cyan("•"), bold(&m.clause_title));
                    println!("    {} {}", dim("before:"), m.old_text_summary);
                    println!("    {} {}", dim("after: "), m.new_text_summary);
                    println!("    {} {}", red("risk:  "), m.risk_analysis);
                }
            }
        }
    }

    Ok(())
}

/// Extract one document, with a fresh progress bar when enabled.
async fn extract_one(
    input: &str,
    config: &ExtractionConfig,
    show_progress: bool,
) -> Result<ExtractionOutput> {
    let mut config = config.clone();
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new_dynamic(input);
        config.progress_callback = Some(cb);
    }
    extract(input, &config)
        .await
        .with_context(|| format!("Extraction failed for {input}"))
}

fn analyst(config: &ExtractionConfig) -> Result<ContractAnalyst> {
    let client = ProviderClient::from_config(config).context("No LLM provider available")?;
    Ok(ContractAnalyst::new(Arc::new(client)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

fn print_text(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(opts: &SharedOpts) -> Result<ExtractionConfig> {
    let concurrency = if opts.sequential {
        Concurrency::Sequential
    } else {
        Concurrency::Pooled {
            workers: opts.workers,
        }
    };

    let mut builder = ExtractionConfig::builder()
        .scale(opts.scale)
        .image_profile(opts.profile.into())
        .concurrency(concurrency)
        .max_attempts(opts.max_attempts)
        .retry_delay(Duration::from_millis(opts.retry_delay_ms))
        .api_timeout_secs(opts.api_timeout)
        .download_timeout_secs(opts.download_timeout);

    if let Some(px) = opts.max_dimension {
        builder = builder.max_dimension(px);
    }
    if let Some(ref model) = opts.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = opts.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = opts.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = opts.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
