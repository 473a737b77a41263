//! Failure metadata extraction.
//!
//! Derives [`FailureMetadata`] fields from the error message, the stack
//! trace, and any structured payload carried inside the message. Rules run
//! in a fixed order and only ever fill gaps: caller-supplied metadata is
//! never overwritten, and the input record is never mutated.
//!
//! Rule order:
//! 1. structured error payload (message parsed as a JSON object)
//! 2. assertion parsing over code snippets
//! 3. line number from the stack trace
//! 4. locator from the message
//! 5. matcher from the message
//! 6. timeout from the message
//! 7. actual / expected operands from the message
//! 8. backtick-enclosed snippet from the message
//! 9. run id from the report link

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::model::TestFailure;

static STACK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at\s+.*:(\d+):\d+").unwrap());

static MESSAGE_LOCATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:getBy\w+|queryBy\w+|findBy\w+|selector|locator|xpath|css)\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#,
    )
    .unwrap()
});

static MESSAGE_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"expect.*?\.(to\w+)").unwrap());

static MESSAGE_TIMEOUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timeout\s+(?:of\s+)?(\d+)\s*(ms|s)?").unwrap());

static ACTUAL_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:received|actual|got):\s*"([^"]*)""#).unwrap());

static EXPECTED_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:expected|should):\s*"([^"]*)""#).unwrap());

static ACTUAL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Actual:\s*([^\n]+)").unwrap());

static EXPECTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Expected:\s*([^\n]+)").unwrap());

static BACKTICK_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

static RUN_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/runs/(\d+)").unwrap());

static SNIPPET_LOCATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"expect\(\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\)").unwrap());

// Matcher is the call chained after the closing paren of expect(...), which
// skips nested locator calls inside the expectation.
static SNIPPET_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*\.([A-Za-z_]\w*)\s*\(").unwrap());

static SNIPPET_EXPECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\)\s*\.\w+\(\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static SNIPPET_TIMEOUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"timeout:\s*(\d+)").unwrap());

/// Structured payload some runners embed as the entire error message.
#[derive(Debug, Deserialize)]
struct StructuredError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    actual: Option<serde_json::Value>,
    #[serde(default)]
    expected: Option<serde_json::Value>,
    #[serde(default)]
    locator: Option<String>,
    #[serde(default)]
    matcher: Option<String>,
    #[serde(default)]
    timeout: Option<serde_json::Value>,
    #[serde(default)]
    location: Option<StructuredLocation>,
    #[serde(default)]
    snippet: Option<SnippetField>,
}

#[derive(Debug, Deserialize)]
struct StructuredLocation {
    #[serde(default)]
    #[allow(dead_code)] // file cannot override the required testFilePath
    file: Option<String>,
    #[serde(default)]
    line: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnippetField {
    One(String),
    Many(Vec<String>),
}

impl SnippetField {
    fn lines(&self) -> Vec<String> {
        match self {
            SnippetField::One(s) => vec![s.clone()],
            SnippetField::Many(v) => v.clone(),
        }
    }
}

/// Derive metadata for one failure, returning a new record.
///
/// Idempotent: every field already present on the input survives unchanged,
/// so `enrich(enrich(f)) == enrich(f)`.
pub fn enrich(failure: &TestFailure) -> TestFailure {
    let mut meta = failure.meta();

    // Rule 1: structured payload carried in the message.
    let structured = parse_structured(&failure.error_message);
    let mut snippet_lines: Vec<String> = Vec::new();
    let mut message_text = failure.error_message.as_str();

    if let Some(s) = &structured {
        // The payload's message is the prose the text rules scan; the raw
        // JSON blob is not.
        if let Some(m) = &s.message {
            message_text = m;
        }
        if meta.actual_value.is_none() {
            meta.actual_value = s.actual.as_ref().map(stringify);
        }
        if meta.expected_value.is_none() {
            meta.expected_value = s.expected.as_ref().map(stringify);
        }
        if meta.locator.is_none() {
            meta.locator = s.locator.clone();
        }
        if meta.matcher.is_none() {
            meta.matcher = s.matcher.clone();
        }
        if meta.timeout_ms.is_none() {
            meta.timeout_ms = s.timeout.as_ref().and_then(numeric);
        }
        if meta.line_number.is_none() {
            meta.line_number = s.location.as_ref().and_then(|l| l.line);
        }
        if let Some(snippet) = &s.snippet {
            snippet_lines = snippet.lines();
            if meta.error_snippet.is_none() && !snippet_lines.is_empty() {
                meta.error_snippet = Some(snippet_lines.join("\n"));
            }
        }
    }

    // Rule 2: assertion parsing over the payload's snippet lines, gaps only.
    for line in &snippet_lines {
        if meta.locator.is_none() {
            meta.locator = snippet_locator(line);
        }
        if meta.matcher.is_none() {
            meta.matcher = snippet_matcher(line);
        }
        if meta.expected_value.is_none() {
            meta.expected_value = snippet_expected(line);
        }
        if meta.timeout_ms.is_none() {
            meta.timeout_ms = snippet_timeout(line);
        }
    }

    // Rule 3: first source line in the stack trace.
    if meta.line_number.is_none() {
        meta.line_number = failure.error_stack.as_deref().and_then(stack_line_number);
    }

    // Rules 4-7: message text.
    if meta.locator.is_none() {
        meta.locator = message_locator(message_text);
    }
    if meta.matcher.is_none() {
        meta.matcher = message_matcher(message_text);
    }
    if meta.timeout_ms.is_none() {
        meta.timeout_ms = message_timeout(message_text);
    }
    if meta.actual_value.is_none() {
        meta.actual_value = message_actual(message_text);
    }
    if meta.expected_value.is_none() {
        meta.expected_value = message_expected(message_text);
    }

    // Rule 8: backtick-enclosed span as a last-resort snippet.
    if meta.error_snippet.is_none() {
        meta.error_snippet = backtick_snippet(message_text);
    }

    // Rule 9: run id from the report link.
    if meta.run_id.is_none() {
        meta.run_id = meta.report_link.as_deref().and_then(run_id_from_link);
    }

    TestFailure {
        metadata: if meta.is_empty() { None } else { Some(meta) },
        ..failure.clone()
    }
}

fn parse_structured(message: &str) -> Option<StructuredError> {
    let trimmed = message.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn stack_line_number(stack: &str) -> Option<u32> {
    STACK_LINE
        .captures(stack)
        .and_then(|c| c[1].parse().ok())
}

fn message_locator(text: &str) -> Option<String> {
    MESSAGE_LOCATOR.captures(text).map(quoted_capture)
}

fn message_matcher(text: &str) -> Option<String> {
    MESSAGE_MATCHER.captures(text).map(|c| c[1].to_string())
}

fn message_timeout(text: &str) -> Option<u64> {
    let caps = MESSAGE_TIMEOUT.captures(text)?;
    let value: u64 = caps[1].parse().ok()?;
    match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(unit) if unit == "s" => Some(value * 1000),
        _ => Some(value),
    }
}

fn message_actual(text: &str) -> Option<String> {
    ACTUAL_QUOTED
        .captures(text)
        .map(|c| c[1].to_string())
        .or_else(|| ACTUAL_LINE.captures(text).map(|c| c[1].trim().to_string()))
}

fn message_expected(text: &str) -> Option<String> {
    EXPECTED_QUOTED
        .captures(text)
        .map(|c| c[1].to_string())
        .or_else(|| EXPECTED_LINE.captures(text).map(|c| c[1].trim().to_string()))
}

fn backtick_snippet(text: &str) -> Option<String> {
    BACKTICK_SPAN
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

fn run_id_from_link(link: &str) -> Option<String> {
    RUN_ID.captures(link).map(|c| c[1].to_string())
}

fn snippet_locator(line: &str) -> Option<String> {
    SNIPPET_LOCATOR.captures(line).map(|c| c[1].to_string())
}

fn snippet_matcher(line: &str) -> Option<String> {
    SNIPPET_MATCHER.captures(line).map(|c| c[1].to_string())
}

fn snippet_expected(line: &str) -> Option<String> {
    SNIPPET_EXPECTED.captures(line).map(quoted_capture)
}

fn snippet_timeout(line: &str) -> Option<u64> {
    SNIPPET_TIMEOUT.captures(line).and_then(|c| c[1].parse().ok())
}

fn quoted_capture(caps: regex::Captures<'_>) -> String {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
