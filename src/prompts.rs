//! Prompts for page transcription and contract analysis.
//!
//! Every prompt lives here so wording changes touch one file, and tests can
//! inspect prompts without a model. Page transcription can be overridden via
//! [`crate::config::ExtractionConfig::system_prompt`].

/// Default system prompt for transcribing one page image.
pub const PAGE_TRANSCRIPTION_PROMPT: &str = r#"You are a careful transcriber of legal documents. The image is one page of a contract or other legal document.

Extract all text from the page.

Rules:
1. Return the text verbatim, in reading order. Do not summarise, translate or correct it.
2. Keep the original line breaks, numbering and indentation where possible.
3. Reproduce tables row by row, separating cells with " | ".
4. If the page has no readable text, return nothing.
5. Return ONLY the extracted text. No commentary, no analysis, no code fences."#;

/// System prompt shared by every analysis task.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are an expert legal assistant. You explain contracts \
in plain, simple English that a non-lawyer can follow, and you never invent facts that are not \
in the documents you are given.";

/// The fixed answer when the document does not contain what was asked.
pub const ANSWER_NOT_FOUND: &str =
    "The answer to that question could not be found in the provided document.";

/// Prompt asking for a summary, key clauses and red flags as JSON.
pub fn analysis_prompt(document_text: &str) -> String {
    format!(
        r#"Analyze the legal document below and return a valid JSON object with exactly three keys: "summary", "keyClauses" and "redFlags".

1. "summary": a concise, easy-to-understand summary of the document's main purpose.
2. "keyClauses": an array of the 3-5 most important clauses. Each element is an object with a "title" and a "detail" explaining its impact on the reader.
3. "redFlags": an array of clauses that are risky, unfair or unusual. Each element is an object with a "title" and a "detail" explaining the risk. Use an empty array if there are none.

Return only the JSON object.

Document text:
---
{document_text}
---"#
    )
}

/// Prompt asking a question that must be answered from the document alone.
pub fn question_prompt(document_text: &str, question: &str) -> String {
    format!(
        r#"Answer the question in the simplest English possible, using ONLY the document text below. Do not use outside knowledge. If the answer is not in the document, reply exactly: "{ANSWER_NOT_FOUND}"

Document text:
---
{document_text}
---

Question: "{question}""#
    )
}

/// Prompt asking for a clause-level diff of two contract versions as JSON.
pub fn comparison_prompt(old_text: &str, new_text: &str) -> String {
    format!(
        r#"Compare the Old Document and the New Document below. Identify every significant difference and assess the risk of the changes for the person signing the new version.

Return a valid JSON object with exactly four keys:
1. "overallRiskAssessment": an object with a "rating" ("Low Risk", "Medium Risk" or "High Risk") and a "summary" of what the changes mean overall.
2. "newClauses": an array of objects with a "title" and a "detail", for clauses present only in the New Document.
3. "removedClauses": an array of objects with a "title" and a "detail", for clauses present only in the Old Document, explaining what protection or term was lost.
4. "modifiedClauses": an array of objects for changed clauses, each with "clauseTitle", "oldTextSummary", "newTextSummary" and "riskAnalysis".

Return only the JSON object.

Old Document:
---
{old_text}
---

New Document:
---
{new_text}
---"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcription_prompt_forbids_commentary() {
        assert!(PAGE_TRANSCRIPTION_PROMPT.contains("verbatim"));
        assert!(PAGE_TRANSCRIPTION_PROMPT.contains("No commentary"));
    }

    #[test]
    fn analysis_prompt_names_every_json_key() {
        let p = analysis_prompt("LEASE AGREEMENT");
        for key in ["summary", "keyClauses", "redFlags", "LEASE AGREEMENT"] {
            assert!(p.contains(key), "missing {key}");
        }
    }

    #[test]
    fn question_prompt_carries_fallback_answer() {
        let p = question_prompt("text", "What is the notice period?");
        assert!(p.contains(ANSWER_NOT_FOUND));
        assert!(p.contains("What is the notice period?"));
    }

    #[test]
    fn comparison_prompt_orders_documents() {
        let p = comparison_prompt("OLD-TEXT", "NEW-TEXT");
        let old_at = p.find("OLD-TEXT").unwrap();
        let new_at = p.find("NEW-TEXT").unwrap();
        assert!(old_at < new_at);
        for key in ["overallRiskAssessment", "modifiedClauses", "riskAnalysis"] {
            assert!(p.contains(key), "missing {key}");
        }
    }
}
