//! Post-processing: deterministic cleanup of model output.
//!
//! Even a well-prompted model occasionally wraps its answer in a code fence,
//! answers with `\r\n` line endings, or sprinkles zero-width characters from
//! the source PDF into the text. The rules here fix those quirks without
//! touching content, so prompts can stay focused on *what* to extract.
//!
//! Two entry points:
//! * [`clean_page_text`]: applied to every transcribed page.
//! * [`extract_json_object`]: isolates the JSON object inside a text-model
//!   answer before it is parsed by [`crate::analysis`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all page-text rules to a raw transcription.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Strip an outer code fence (models sometimes disobey the prompt)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to one blank line
/// 6. Trim leading and trailing blank lines
///
/// A page that is blank after cleanup yields `""`.
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fence(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*?)\n?```$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── JSON isolation ───────────────────────────────────────────────────────────

/// Return the outermost `{ … }` object in a model answer.
///
/// Handles ```` ```json ```` fences and chatter before or after the object.
/// Returns `None` when no braces are present.
pub fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence() {
        assert_eq!(clean_page_text("```\nClause 1\nClause 2\n```"), "Clause 1\nClause 2");
    }

    #[test]
    fn test_strip_fence_with_lang() {
        assert_eq!(clean_page_text("```text\nRent: 10,000\n```"), "Rent: 10,000");
    }

    #[test]
    fn test_inner_fence_untouched() {
        let input = "Schedule A\n```\nverbatim\n```\nend";
        assert_eq!(clean_page_text(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "lessee\u{200B}shall\u{FEFF}pay\u{00AD}rent";
        assert_eq!(remove_invisible_chars(input), "lesseeshallpayrent");
    }

    #[test]
    fn test_blank_page_is_empty() {
        assert_eq!(clean_page_text("  \n\n \r\n"), "");
        assert_eq!(clean_page_text(""), "");
    }

    #[test]
    fn test_clean_page_text_full_pipeline() {
        let input = "\n\n1. TERM\u{200B}\r\n\r\n\r\n\r\nThe lease runs 11 months.   \n\n";
        assert_eq!(clean_page_text(input), "1. TERM\n\nThe lease runs 11 months.");
    }

    #[test]
    fn test_extract_json_from_fenced_answer() {
        let raw = "```json\n{\"summary\": \"ok\"}\n```";
        assert_eq!(extract_json_object(raw), Some("{\"summary\": \"ok\"}"));
    }

    #[test]
    fn test_extract_json_with_chatter() {
        let raw = "Here is the analysis:\n{\"a\": {\"b\": 1}}\nHope this helps.";
        assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
