//! Embedding-context construction.
//!
//! Renders an enriched failure to the multi-line text the embedding
//! provider sees. Line set, order, and punctuation are a contract: two
//! implementations must produce byte-identical contexts for the same
//! record so their embeddings stay comparable.

use crate::model::TestFailure;

/// Render one failure to its embedding input.
///
/// `Test`, `File`, and `Error` always appear; every other line only when
/// its field is present.
pub fn build_embedding_context(failure: &TestFailure) -> String {
    let mut lines = Vec::with_capacity(12);
    lines.push(format!("Test: {}", failure.test_title));
    lines.push(format!("File: {}", failure.test_file_path));

    if let Some(meta) = &failure.metadata {
        if let Some(project) = &meta.project_name {
            lines.push(format!("Project: {project}"));
        }
        if let Some(suite) = &meta.suite_name {
            lines.push(format!("Suite: {suite}"));
        }
        if let Some(line) = meta.line_number {
            lines.push(format!("Line: {line}"));
        }
        if let Some(locator) = &meta.locator {
            lines.push(format!("Locator: {locator}"));
        }
        if let Some(matcher) = &meta.matcher {
            lines.push(format!("Matcher: {matcher}"));
        }
        if let Some(actual) = &meta.actual_value {
            lines.push(format!("Actual: \"{actual}\""));
        }
        if let Some(expected) = &meta.expected_value {
            lines.push(format!("Expected: \"{expected}\""));
        }
        if let Some(timeout) = meta.timeout_ms {
            lines.push(format!("Timeout: {timeout}ms"));
        }
        if let Some(snippet) = &meta.error_snippet {
            lines.push(format!("Code: {snippet}"));
        }
    }

    lines.push(format!("Error: {}", failure.error_message));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FailureMetadata;
    use chrono::Utc;

    #[test]
    fn test_minimal_context_has_required_lines_only() {
        let failure = TestFailure {
            id: "f-1".to_string(),
            test_title: "renders the dashboard".to_string(),
            test_file_path: "tests/dashboard.spec.ts".to_string(),
            error_message: "boom".to_string(),
            error_stack: None,
            timestamp: Utc::now(),
            metadata: None,
        };

        assert_eq!(
            build_embedding_context(&failure),
            "Test: renders the dashboard\nFile: tests/dashboard.spec.ts\nError: boom"
        );
    }

    #[test]
    fn test_full_context_order_and_punctuation() {
        let failure = TestFailure {
            id: "f-1".to_string(),
            test_title: "login works".to_string(),
            test_file_path: "tests/auth/login.spec.ts".to_string(),
            error_message: "expect failed".to_string(),
            error_stack: None,
            timestamp: Utc::now(),
            metadata: Some(FailureMetadata {
                error_snippet: Some("await expect(button).toBeVisible()".to_string()),
                line_number: Some(42),
                project_name: Some("webapp".to_string()),
                suite_name: Some("auth".to_string()),
                locator: Some("button.login".to_string()),
                matcher: Some("toBeVisible".to_string()),
                timeout_ms: Some(5000),
                duration_ms: Some(5130),
                actual_value: Some("hidden".to_string()),
                expected_value: Some("visible".to_string()),
                run_id: Some("123".to_string()),
                report_link: None,
            }),
        };

        assert_eq!(
            build_embedding_context(&failure),
            "Test: login works\n\
             File: tests/auth/login.spec.ts\n\
             Project: webapp\n\
             Suite: auth\n\
             Line: 42\n\
             Locator: button.login\n\
             Matcher: toBeVisible\n\
             Actual: \"hidden\"\n\
             Expected: \"visible\"\n\
             Timeout: 5000ms\n\
             Code: await expect(button).toBeVisible()\n\
             Error: expect failed"
        );
    }
}
