//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The rasteriser works on an in-memory buffer, so both sources end up as a
//! `Vec<u8>`. The `%PDF` magic is checked here so callers get a meaningful
//! error rather than a pdfium parse failure.

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the PDF behind `input`: a local file, or an HTTP(S) URL to download.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<Vec<u8>, ExtractError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(trimmed) {
        download_url(trimmed, timeout_secs).await
    } else {
        read_local(Path::new(trimmed)).await
    }
}

/// Read a local file, validating existence, permission and PDF magic bytes.
async fn read_local(path: &Path) -> Result<Vec<u8>, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    check_magic(&bytes, &path.display().to_string())?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ExtractError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| ExtractError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(classify)?.to_vec();
    check_magic(&bytes, url)?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

/// Reject buffers that do not start with `%PDF`.
pub fn check_magic(bytes: &[u8], origin: &str) -> Result<(), ExtractError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(ExtractError::NotAPdf {
            origin: origin.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Default output path for an input: same stem, `.txt` extension, in the
/// current directory for URLs.
pub fn default_output_path(input: &str) -> PathBuf {
    if is_url(input) {
        let name = reqwest::Url::parse(input)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document.pdf".to_string());
        PathBuf::from(name).with_extension("txt")
    } else {
        PathBuf::from(input).with_extension("txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("contracts/lease.pdf"),
            PathBuf::from("contracts/lease.txt")
        );
        assert_eq!(
            default_output_path("https://example.com/files/nda.pdf"),
            PathBuf::from("nda.txt")
        );
        assert_eq!(
            default_output_path("https://example.com/"),
            PathBuf::from("document.txt")
        );
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = load_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = load_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn non_pdf_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();

        let err = load_input(f.path().to_str().unwrap(), 5).await.unwrap_err();
        match err {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(magic, b"PK\x03\x04".to_vec()),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pdf_file_is_returned_verbatim() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%%EOF").unwrap();

        let bytes = load_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7\n%%EOF");
    }
}
