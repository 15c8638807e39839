//! Contract analysis over extracted text: summary and risks, questions,
//! version comparison.
//!
//! Each task is one text-model call through a [`TextCompleter`]. The JSON
//! tasks tolerate the usual model noise (code fences, a sentence before the
//! object) and missing arrays; anything else that does not parse is a
//! [`ExtractError::MalformedResponse`].

use crate::error::ExtractError;
use crate::pipeline::postprocess::extract_json_object;
use crate::prompts::{analysis_prompt, comparison_prompt, question_prompt, ANALYST_SYSTEM_PROMPT};
use crate::provider::TextCompleter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A titled clause with an explanation of what it means for the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub title: String,
    pub detail: String,
}

/// Plain-language review of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub summary: String,
    #[serde(default)]
    pub key_clauses: Vec<Clause>,
    #[serde(default)]
    pub red_flags: Vec<Clause>,
}

/// Overall verdict on the changes between two versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// e.g. "Low Risk", "Medium Risk", "High Risk".
    pub rating: String,
    pub summary: String,
}

/// A clause present in both versions whose terms changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedClause {
    pub clause_title: String,
    pub old_text_summary: String,
    pub new_text_summary: String,
    pub risk_analysis: String,
}

/// Clause-level difference between an old and a new contract version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub overall_risk_assessment: RiskAssessment,
    #[serde(default)]
    pub new_clauses: Vec<Clause>,
    #[serde(default)]
    pub removed_clauses: Vec<Clause>,
    #[serde(default)]
    pub modified_clauses: Vec<ModifiedClause>,
}

/// Runs the analysis tasks against a text model.
#[derive(Clone)]
pub struct ContractAnalyst {
    completer: Arc<dyn TextCompleter>,
}

impl ContractAnalyst {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self { completer }
    }

    /// Summarise `text` and list its key clauses and red flags.
    pub async fn analyze(&self, text: &str) -> Result<DocumentAnalysis, ExtractError> {
        let text = non_empty(text, "document text")?;
        info!("Analysing document ({} chars)", text.len());
        let raw = self.call("analysis", &analysis_prompt(text)).await?;
        parse_json("analysis", &raw)
    }

    /// Answer `question` from `text` alone.
    ///
    /// When the document does not contain the answer the model is told to
    /// reply with [`crate::prompts::ANSWER_NOT_FOUND`].
    pub async fn answer(&self, text: &str, question: &str) -> Result<String, ExtractError> {
        let text = non_empty(text, "document text")?;
        let question = non_empty(question, "question")?;
        info!("Answering question: {}", question);
        let raw = self.call("question", &question_prompt(text, question)).await?;
        Ok(raw.trim().to_string())
    }

    /// Compare an old and a new version of a contract.
    pub async fn compare(&self, old: &str, new: &str) -> Result<ComparisonReport, ExtractError> {
        let old = non_empty(old, "old document text")?;
        let new = non_empty(new, "new document text")?;
        info!("Comparing documents ({} vs {} chars)", old.len(), new.len());
        let raw = self.call("comparison", &comparison_prompt(old, new)).await?;
        parse_json("comparison", &raw)
    }

    async fn call(&self, task: &'static str, prompt: &str) -> Result<String, ExtractError> {
        self.completer
            .complete(ANALYST_SYSTEM_PROMPT, prompt)
            .await
            .map_err(|e| ExtractError::ModelCallFailed {
                task,
                detail: e.to_string(),
            })
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, ExtractError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ExtractError::InvalidInput {
            input: format!("empty {what}"),
        })
    } else {
        Ok(trimmed)
    }
}

fn parse_json<T: DeserializeOwned>(task: &'static str, raw: &str) -> Result<T, ExtractError> {
    let json = extract_json_object(raw).ok_or_else(|| ExtractError::MalformedResponse {
        task,
        detail: "no JSON object in response".into(),
    })?;
    debug!("Parsing {} response ({} bytes)", task, json.len());
    serde_json::from_str(json).map_err(|e| ExtractError::MalformedResponse {
        task,
        detail: e.to_string(),
    })
}
