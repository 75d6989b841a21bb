//! Post-processing of provider output.
//!
//! Models are asked for `{"refined_prompt": "..."}` but often wrap it in prose
//! or code fences, or drop the JSON entirely. Extraction tries three stages
//! and reports which one produced the value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_CANDIDATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*?\}").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Structured,
    Quoted,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub value: String,
    pub stage: ExtractionStage,
}

fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

fn structured(text: &str) -> Option<String> {
    JSON_CANDIDATE.find_iter(text).find_map(|m| {
        let parsed: Value = serde_json::from_str(m.as_str()).ok()?;
        match parsed.as_object()?.get("refined_prompt")? {
            Value::String(s) => Some(unescape_newlines(s)),
            other => Some(other.to_string()),
        }
    })
}

fn quoted(text: &str) -> Option<String> {
    QUOTED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| unescape_newlines(m.as_str()))
}

/// Run the three stages in order. Never fails; the last stage is the
/// trimmed input.
pub fn extract(text: &str) -> Extracted {
    if let Some(value) = structured(text) {
        return Extracted {
            value,
            stage: ExtractionStage::Structured,
        };
    }
    if let Some(value) = quoted(text) {
        return Extracted {
            value,
            stage: ExtractionStage::Quoted,
        };
    }
    Extracted {
        value: text.trim().to_string(),
        stage: ExtractionStage::Raw,
    }
}

pub fn extract_refined_prompt(text: &str) -> String {
    extract(text).value
}

/// Terminal rendering of a refined prompt: real newlines, `•` bullets, and
/// `**emphasis**` shown in upper case.
pub fn decorate_for_display(text: &str) -> String {
    let text = unescape_newlines(text);
    upper_case_emphasis(&bulletize(&text))
}

// A `*` followed by a space becomes a bullet unless it touches another `*`.
fn bulletize(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '*'
            && chars.get(i + 1) == Some(&' ')
            && (i == 0 || chars[i - 1] != '*')
        {
            out.push_str("• ");
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn upper_case_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if end > 0 => {
                out.push_str(&rest[..start]);
                out.push_str(&after[..end].to_uppercase());
                rest = &after[end + 2..];
            }
            _ => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_with_surrounding_prose() {
        let text = "Sure! Here it is:\n```json\n{\"refined_prompt\": \"Line one\\nLine two\"}\n```";
        let got = extract(text);
        assert_eq!(got.stage, ExtractionStage::Structured);
        assert_eq!(got.value, "Line one\nLine two");
    }

    #[test]
    fn test_first_matching_candidate_wins() {
        let text = r#"{"other": 1} then {"refined_prompt": "B"} and {"refined_prompt": "C"}"#;
        assert_eq!(extract_refined_prompt(text), "B");
    }

    #[test]
    fn test_literal_backslash_n_is_unescaped() {
        // Model double-escaped the newline, so JSON decoding leaves `\n` text.
        let text = r#"{"refined_prompt": "a\\nb"}"#;
        assert_eq!(extract_refined_prompt(text), "a\nb");
    }

    #[test]
    fn test_non_string_value_rendered_as_json() {
        let got = extract(r#"{"refined_prompt": 42}"#);
        assert_eq!(got.stage, ExtractionStage::Structured);
        assert_eq!(got.value, "42");
    }

    #[test]
    fn test_quoted_fallback() {
        let got = extract("The prompt is \"Write a poem\\nabout rain\" as requested");
        assert_eq!(got.stage, ExtractionStage::Quoted);
        assert_eq!(got.value, "Write a poem\nabout rain");
    }

    #[test]
    fn test_broken_json_falls_to_quoted() {
        let got = extract(r#"{"refined_prompt": "unterminated}"#);
        assert_eq!(got.stage, ExtractionStage::Quoted);
        assert_eq!(got.value, "refined_prompt");
    }

    #[test]
    fn test_raw_fallback_trims() {
        let got = extract("  just plain text \n");
        assert_eq!(got.stage, ExtractionStage::Raw);
        assert_eq!(got.value, "just plain text");
    }

    #[test]
    fn test_decorate_bullets_and_emphasis() {
        let text = "Intro\\n* first **key** point\\n* second";
        assert_eq!(
            decorate_for_display(text),
            "Intro\n• first KEY point\n• second"
        );
    }

    #[test]
    fn test_decorate_leaves_unpaired_markers() {
        assert_eq!(decorate_for_display("a ** b"), "a ** b");
        assert_eq!(decorate_for_display("x****y"), "x****y");
    }
}
