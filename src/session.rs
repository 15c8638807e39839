//! A conversation about one document.
//!
//! [`DocumentSession`] remembers the most recently loaded document text so
//! follow-up questions do not have to pass it again. It is a plain value:
//! whoever needs a session owns one, and two sessions never see each
//! other's documents.

use crate::analysis::{ContractAnalyst, DocumentAnalysis};
use crate::error::ExtractError;
use crate::output::ExtractionOutput;
use tracing::debug;

/// Holds the current document and answers questions about it.
#[derive(Clone)]
pub struct DocumentSession {
    analyst: ContractAnalyst,
    document: Option<String>,
}

impl DocumentSession {
    pub fn new(analyst: ContractAnalyst) -> Self {
        Self {
            analyst,
            document: None,
        }
    }

    /// Replace the current document with `text`.
    pub fn load_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!("Session document replaced ({} chars)", text.len());
        self.document = Some(text);
    }

    /// Replace the current document with the text of an extraction.
    pub fn load(&mut self, output: &ExtractionOutput) {
        self.load_text(output.text.clone());
    }

    /// The current document, if one has been loaded.
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn clear(&mut self) {
        self.document = None;
    }

    fn current(&self) -> Result<&str, ExtractError> {
        self.document.as_deref().ok_or(ExtractError::NoDocumentLoaded)
    }

    /// Answer `question` from the current document.
    pub async fn ask(&self, question: &str) -> Result<String, ExtractError> {
        let text = self.current()?;
        self.analyst.answer(text, question).await
    }

    /// Analyse the current document.
    pub async fn analyze(&self) -> Result<DocumentAnalysis, ExtractError> {
        let text = self.current()?;
        self.analyst.analyze(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;
    use crate::provider::TextCompleter;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Echoes the question line back so tests can see which document was used.
    struct EchoDocument;

    #[async_trait]
    impl TextCompleter for EchoDocument {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ExtractorError> {
            let doc = prompt
                .split("---")
                .nth(1)
                .map(str::trim)
                .unwrap_or_default();
            Ok(format!("from: {doc}"))
        }
    }

    fn session() -> DocumentSession {
        DocumentSession::new(ContractAnalyst::new(Arc::new(EchoDocument)))
    }

    #[test]
    fn ask_without_document_fails() {
        let s = session();
        let err = tokio_test::block_on(s.ask("What is the rent?")).unwrap_err();
        assert!(matches!(err, ExtractError::NoDocumentLoaded));
    }

    #[test]
    fn ask_uses_latest_document() {
        let mut s = session();
        s.load_text("first lease");
        s.load_text("second lease");

        let answer = tokio_test::block_on(s.ask("Which lease?")).unwrap();
        assert_eq!(answer, "from: second lease");
    }

    #[test]
    fn clear_forgets_document() {
        let mut s = session();
        s.load_text("lease");
        s.clear();
        assert!(s.document().is_none());
        assert!(matches!(
            tokio_test::block_on(s.analyze()),
            Err(ExtractError::NoDocumentLoaded)
        ));
    }

    #[test]
    fn sessions_are_independent() {
        let mut a = session();
        let b = session();
        a.load_text("only in a");
        assert_eq!(a.document(), Some("only in a"));
        assert!(b.document().is_none());
    }
}
