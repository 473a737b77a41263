//! Failure and cluster records
//!
//! Records:
//! - `TestFailure`: one observed failure of one test at one time
//! - `FailureMetadata`: sparse bag of derived/annotated fields
//! - `EmbeddedFailure`: a failure plus its embedding vector
//! - `FailureCluster`: a group of related failures with summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed failure of one test at one time.
///
/// `id` is caller-supplied and must be unique within a detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFailure {
    /// Opaque identifier, unique within a detection pass.
    pub id: String,

    /// Human-readable test name.
    pub test_title: String,

    /// Source path of the test.
    pub test_file_path: String,

    /// Free-form error text from the runner.
    pub error_message: String,

    /// Stack trace text, when the runner captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stack: Option<String>,

    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,

    /// Derived and annotated fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FailureMetadata>,
}

impl TestFailure {
    /// Borrow the metadata bag, whether or not one is attached.
    pub fn meta(&self) -> FailureMetadata {
        self.metadata.clone().unwrap_or_default()
    }
}

/// Sparse bag of fields derived from the failure or annotated by the caller.
///
/// Every field is independently optional. A missing field and an explicit
/// null serialize identically, so round-tripping normalizes the two.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureMetadata {
    /// Code excerpt around the failing assertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_snippet: Option<String>,

    /// Source line of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_name: Option<String>,

    /// Selector identifying the UI element the failing assertion targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,

    /// Assertion predicate name (e.g. "toBeVisible").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,

    /// How long the runner waited before declaring failure, in milliseconds.
    #[serde(rename = "timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Test runtime in milliseconds.
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Assertion operands, stringified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,

    /// CI run identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// URL of the CI report the failure came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_link: Option<String>,
}

impl FailureMetadata {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == FailureMetadata::default()
    }
}

/// A failure together with its embedding vector.
///
/// All embeddings in a single clustering pass share one dimensionality,
/// and every component is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFailure {
    pub failure: TestFailure,
    pub embedding: Vec<f32>,
}

/// Values shared by at least half of a cluster's members.
///
/// Each list keeps first-appearance order over the cluster's member order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonPatterns {
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub line_numbers: Vec<u32>,
    #[serde(default)]
    pub code_snippets: Vec<String>,
    #[serde(default)]
    pub locators: Vec<String>,
    #[serde(default)]
    pub matchers: Vec<String>,
    #[serde(default)]
    pub timeouts: Vec<u64>,
}

/// Aggregate statistics for a cluster.
///
/// The list-valued fields may be absent in older persisted records and
/// default to empty on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    /// Number of member failures.
    pub failure_count: usize,

    /// Earliest member timestamp.
    pub first_seen: DateTime<Utc>,

    /// Latest member timestamp.
    pub last_seen: DateTime<Utc>,

    /// Mean gap between consecutive failures in milliseconds, when the
    /// cluster has at least two members.
    #[serde(
        rename = "averageTimeBetweenFailures",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub average_time_between_failures_ms: Option<f64>,

    /// Ids of the member failures.
    #[serde(default)]
    pub failure_ids: Vec<String>,

    /// Non-empty run ids of the members. Duplicates are kept so run
    /// multiplicity stays auditable.
    #[serde(default)]
    pub run_ids: Vec<String>,

    /// Member timestamps, same multiplicity as the members.
    #[serde(default)]
    pub failure_timestamps: Vec<DateTime<Utc>>,

    /// Each member's error message, truncated to 200 characters.
    #[serde(default)]
    pub error_messages: Vec<String>,
}

/// A group of semantically related failures plus descriptive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureCluster {
    /// Deterministic id of the form `YYYY-MM-DD-N` where `N` is the
    /// cluster's position in the assembly output for the pass.
    pub id: String,

    /// Member failures.
    pub failures: Vec<TestFailure>,

    #[serde(default)]
    pub common_patterns: CommonPatterns,

    pub metadata: ClusterMetadata,

    /// Short human-readable summary of where the cluster fails.
    #[serde(default)]
    pub failure_pattern: String,

    /// Short summary of the common assertion, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_pattern: Option<String>,
}
