//! End-to-end integration tests for contract-ocr.
//!
//! These tests use real PDF files in `./test_cases/` and make live LLM API
//! calls.  They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! Expected files:
//!   test_cases/sample_lease.pdf     a short residential lease (2-4 pages)
//!   test_cases/sample_lease_v2.pdf  a revised version of the same lease

use contract_ocr::{
    extract, extract_from_bytes, extract_to_file, inspect, Concurrency, ContractAnalyst,
    DocumentSession, ExtractError, ExtractionConfig, ExtractionProgressCallback, ImageProfile,
    NoopProgressCallback, ProviderClient,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Basic shape checks every extraction must pass.
fn assert_text_quality(text: &str, context: &str) {
    assert!(!text.trim().is_empty(), "[{context}] text is empty");
    assert_eq!(text, text.trim_end(), "[{context}] trailing whitespace");
    assert!(
        !text.lines().next().unwrap_or("").starts_with("```"),
        "[{context}] output must not start with a code fence"
    );
    assert!(
        !text.contains("\n\n\n"),
        "[{context}] more than one consecutive blank line"
    );
    for ch in ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'] {
        assert!(
            !text.contains(ch),
            "[{context}] contains invisible char U+{:04X}",
            ch as u32
        );
    }
    println!("[{context}] {} bytes, quality checks passed", text.len());
}

// ── Input errors (no pdfium, no LLM, always run) ─────────────────────────────

#[tokio::test]
async fn test_inspect_nonexistent() {
    let err = inspect("/definitely/not/a/real/file.pdf")
        .await
        .expect_err("inspect() should fail for a missing file");
    assert!(matches!(err, ExtractError::FileNotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn test_extract_rejects_non_pdf_bytes() {
    let err = extract_from_bytes(b"PK\x03\x04 not a pdf".to_vec(), &ExtractionConfig::default())
        .await
        .expect_err("zip bytes are not a PDF");
    assert!(matches!(err, ExtractError::NotAPdf { .. }), "{err:?}");
}

#[tokio::test]
async fn test_extract_rejects_blank_input() {
    let err = extract("   ", &ExtractionConfig::default())
        .await
        .expect_err("blank input is invalid");
    assert!(matches!(err, ExtractError::InvalidInput { .. }), "{err:?}");
}

// ── Inspect (pdfium, no LLM) ─────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_sample_lease() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));

    let meta = inspect(path.to_str().unwrap())
        .await
        .expect("inspect() should succeed");

    assert!(meta.page_count >= 1);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

// ── Extraction (live LLM) ────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_sample_lease() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));

    let output = extract(path.to_str().unwrap(), &ExtractionConfig::default())
        .await
        .expect("extraction should succeed");

    assert_text_quality(&output.text, "sample_lease");
    assert_eq!(output.stats.failed_pages, 0, "no page should fail");
    assert_eq!(output.pages.len(), output.stats.total_pages);
    assert!(
        output.text.to_lowercase().contains("lease")
            || output.text.to_lowercase().contains("tenant"),
        "a lease should mention 'lease' or 'tenant'"
    );

    println!("--- BEGIN OUTPUT ---\n{}\n--- END OUTPUT ---", output.text);
}

#[tokio::test]
async fn test_sequential_matches_pooled_page_count() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));

    let config = ExtractionConfig::builder()
        .concurrency(Concurrency::Sequential)
        .image_profile(ImageProfile::fast())
        .build()
        .expect("valid config");

    let output = extract(path.to_str().unwrap(), &config)
        .await
        .expect("extraction should succeed");

    assert_text_quality(&output.text, "sequential");
    let indices: Vec<usize> = output.pages.iter().map(|p| p.index).collect();
    let expected: Vec<usize> = (0..output.stats.total_pages).collect();
    assert_eq!(indices, expected);
}

#[tokio::test]
async fn test_extract_to_file_writes_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("lease.txt");

    let stats = extract_to_file(path.to_str().unwrap(), &out_path, &ExtractionConfig::default())
        .await
        .expect("extraction should succeed");

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.ends_with('\n'));
    assert_text_quality(written.trim_end(), "to_file");
    assert!(stats.pages_with_text >= 1);
}

#[tokio::test]
async fn test_progress_callbacks_fire_for_every_page() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));

    #[derive(Default)]
    struct Counter {
        started: AtomicUsize,
        pages: AtomicUsize,
    }

    impl ExtractionProgressCallback for Counter {
        fn on_extraction_start(&self, total_pages: usize) {
            self.started.store(total_pages, Ordering::SeqCst);
        }
        fn on_page_start(&self, _page_num: usize, _total: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(Counter::default());
    let config = ExtractionConfig::builder()
        .progress_callback(counter.clone())
        .build()
        .expect("valid config");

    let output = extract(path.to_str().unwrap(), &config)
        .await
        .expect("extraction should succeed");

    assert_eq!(counter.started.load(Ordering::SeqCst), output.stats.total_pages);
    assert_eq!(counter.pages.load(Ordering::SeqCst), output.stats.total_pages);
}

// ── Analysis (live LLM) ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_analyze_and_ask_sample_lease() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));
    let config = ExtractionConfig::default();

    let output = extract(path.to_str().unwrap(), &config)
        .await
        .expect("extraction should succeed");

    let completer = Arc::new(ProviderClient::from_config(&config).expect("provider"));
    let mut session = DocumentSession::new(ContractAnalyst::new(completer));
    session.load(&output);

    let analysis = session.analyze().await.expect("analysis should succeed");
    assert!(!analysis.summary.trim().is_empty());
    println!("Summary: {}", analysis.summary);
    for flag in &analysis.red_flags {
        println!("  red flag: {} ({})", flag.title, flag.detail);
    }

    let answer = session
        .ask("Who are the parties to this agreement?")
        .await
        .expect("question should succeed");
    assert!(!answer.is_empty());
    println!("Answer: {answer}");
}

#[tokio::test]
async fn test_compare_lease_versions() {
    let old = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease.pdf"));
    let new = e2e_skip_unless_ready!(test_cases_dir().join("sample_lease_v2.pdf"));
    let config = ExtractionConfig::default();

    let old_text = extract(old.to_str().unwrap(), &config).await.unwrap().text;
    let new_text = extract(new.to_str().unwrap(), &config).await.unwrap().text;

    let analyst = ContractAnalyst::new(Arc::new(ProviderClient::from_config(&config).unwrap()));
    let report = analyst
        .compare(&old_text, &new_text)
        .await
        .expect("comparison should succeed");

    assert!(!report.overall_risk_assessment.rating.is_empty());
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
}

// ── Callback API (no LLM calls, always run) ──────────────────────────────────

/// The callback type stored in the config must be movable into a spawned task.
#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    use std::sync::Mutex;

    struct ErrorLogger {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ExtractionProgressCallback for ErrorLogger {
        fn on_page_error(&self, _page: usize, _total: usize, error: &str) {
            self.log.lock().unwrap().push(error.to_string());
        }
    }

    let log = Arc::new(Mutex::new(vec![]));
    let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(ErrorLogger {
        log: Arc::clone(&log),
    });

    tokio::spawn(async move {
        cb.on_page_error(2, 5, "call timed out after 60s");
    })
    .await
    .expect("spawn must succeed");

    assert_eq!(*log.lock().unwrap(), vec!["call timed out after 60s"]);
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();

    let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
    cb.on_page_error(1, 1, "an error");
}
