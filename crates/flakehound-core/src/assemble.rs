//! Cluster assembly, ranking, and capping.
//!
//! Turns the index sets discovered by DBSCAN into [`FailureCluster`]
//! records: common-pattern tallies, temporal statistics, human-readable
//! summaries, and date-keyed deterministic ids.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::model::{ClusterMetadata, CommonPatterns, EmbeddedFailure, FailureCluster, TestFailure};

/// Maximum characters kept of each member's error message.
const ERROR_MESSAGE_LIMIT: usize = 200;

/// Maximum characters of snippet quoted in a failure-pattern summary.
const SNIPPET_SUMMARY_LIMIT: usize = 100;

/// Date key shared by every cluster id of a pass (`YYYY-MM-DD`).
///
/// Re-runs within one calendar day produce identical ids; across days only
/// this prefix changes.
pub fn pass_base_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Build clusters from discovered index sets, dropping those smaller than
/// `min_cluster_size`.
///
/// Ids are assigned from the position in the discovery order before the
/// size filter runs, so they are unique and reproducible even when small
/// clusters are discarded.
pub fn assemble_clusters(
    embedded: &[EmbeddedFailure],
    index_sets: &[Vec<usize>],
    min_cluster_size: usize,
    base_key: &str,
) -> Vec<FailureCluster> {
    index_sets
        .iter()
        .enumerate()
        .map(|(position, indices)| {
            let members: Vec<&TestFailure> =
                indices.iter().map(|&i| &embedded[i].failure).collect();
            build_cluster(&members, format!("{base_key}-{position}"))
        })
        .filter(|cluster| cluster.failures.len() >= min_cluster_size)
        .collect()
}

/// Sort by failure count descending (ties by id ascending) and keep the
/// first `max_clusters` when a cap is set.
pub fn rank_clusters(
    mut clusters: Vec<FailureCluster>,
    max_clusters: Option<usize>,
) -> Vec<FailureCluster> {
    clusters.sort_by(|a, b| {
        b.metadata
            .failure_count
            .cmp(&a.metadata.failure_count)
            .then_with(|| a.id.cmp(&b.id))
    });
    if let Some(max) = max_clusters {
        clusters.truncate(max);
    }
    clusters
}

fn build_cluster(members: &[&TestFailure], id: String) -> FailureCluster {
    let threshold = members.len().div_ceil(2);

    let common_patterns = CommonPatterns {
        file_paths: common_values(
            members.iter().map(|f| f.test_file_path.clone()),
            threshold,
        ),
        line_numbers: common_values(
            members.iter().filter_map(|f| f.meta().line_number),
            threshold,
        ),
        code_snippets: common_values(
            members.iter().filter_map(|f| f.meta().error_snippet),
            threshold,
        ),
        locators: common_values(members.iter().filter_map(|f| f.meta().locator), threshold),
        matchers: common_values(members.iter().filter_map(|f| f.meta().matcher), threshold),
        timeouts: common_values(members.iter().filter_map(|f| f.meta().timeout_ms), threshold),
    };

    // Temporal statistics over a timestamp-sorted view, id as tiebreak.
    let mut chronological: Vec<&TestFailure> = members.to_vec();
    chronological.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let first_seen = chronological.first().map(|f| f.timestamp).unwrap_or_default();
    let last_seen = chronological.last().map(|f| f.timestamp).unwrap_or_default();
    let average_time_between_failures_ms = if chronological.len() >= 2 {
        let total: i64 = chronological
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_milliseconds())
            .sum();
        Some(total as f64 / (chronological.len() - 1) as f64)
    } else {
        None
    };

    let metadata = ClusterMetadata {
        failure_count: members.len(),
        first_seen,
        last_seen,
        average_time_between_failures_ms,
        failure_ids: members.iter().map(|f| f.id.clone()).collect(),
        run_ids: members.iter().filter_map(|f| f.meta().run_id).collect(),
        failure_timestamps: members.iter().map(|f| f.timestamp).collect(),
        error_messages: members
            .iter()
            .map(|f| truncate_chars(&f.error_message, ERROR_MESSAGE_LIMIT))
            .collect(),
    };

    let failure_pattern = failure_pattern(&common_patterns);
    let assertion_pattern = assertion_pattern(&common_patterns);

    FailureCluster {
        id,
        failures: members.iter().map(|&f| f.clone()).collect(),
        common_patterns,
        metadata,
        failure_pattern,
        assertion_pattern,
    }
}

/// Values appearing in at least `threshold` members, in first-appearance
/// order over the member iteration.
fn common_values<T, I>(values: I, threshold: usize) -> Vec<T>
where
    T: Clone + Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut order: Vec<T> = Vec::new();
    for value in values {
        let count = counts.entry(value.clone()).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }
    order.retain(|value| counts[value] >= threshold);
    order
}

fn failure_pattern(patterns: &CommonPatterns) -> String {
    if let (Some(path), Some(line)) = (
        patterns.file_paths.first(),
        patterns.line_numbers.first(),
    ) {
        return format!("Common failure at {path}:{line}");
    }
    if let Some(snippet) = patterns.code_snippets.first() {
        let shortened = truncate_chars(snippet, SNIPPET_SUMMARY_LIMIT);
        let ellipsis = if shortened.len() < snippet.len() { "..." } else { "" };
        return format!("Common code pattern: {shortened}{ellipsis}");
    }
    "Similar test failures".to_string()
}

fn assertion_pattern(patterns: &CommonPatterns) -> Option<String> {
    match (patterns.locators.first(), patterns.matchers.first()) {
        (Some(locator), Some(matcher)) => {
            let mut summary = format!("{matcher} on {locator}");
            if let Some(timeout) = patterns.timeouts.first() {
                summary.push_str(&format!(" ({timeout}ms timeout)"));
            }
            Some(summary)
        }
        (Some(locator), None) => Some(format!("Common locator: {locator}")),
        (None, Some(matcher)) => Some(format!("Common matcher: {matcher}")),
        (None, None) => None,
    }
}

/// First `limit` code points of `text`.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FailureMetadata;
    use chrono::TimeZone;

    fn failure(id: &str, hour: u32, meta: FailureMetadata) -> TestFailure {
        TestFailure {
            id: id.to_string(),
            test_title: "login shows button".to_string(),
            test_file_path: "tests/auth/login.spec.ts".to_string(),
            error_message: "Error: expect(locator).toBeVisible() failed".to_string(),
            error_stack: None,
            timestamp: Utc.with_ymd_and_hms(2026, 7, 1, hour, 0, 0).unwrap(),
            metadata: Some(meta),
        }
    }

    fn embedded(failures: Vec<TestFailure>) -> Vec<EmbeddedFailure> {
        failures
            .into_iter()
            .map(|failure| EmbeddedFailure {
                failure,
                embedding: vec![0.1, 0.2],
            })
            .collect()
    }

    fn login_meta(run: &str) -> FailureMetadata {
        FailureMetadata {
            locator: Some("button.login".to_string()),
            matcher: Some("toBeVisible".to_string()),
            timeout_ms: Some(5000),
            run_id: Some(run.to_string()),
            line_number: Some(12),
            ..Default::default()
        }
    }

    #[test]
    fn test_common_values_threshold_and_order() {
        // 3 values, threshold ceil(3/2) = 2.
        let values = vec!["a", "b", "a"];
        assert_eq!(common_values(values, 2), vec!["a"]);

        // First-appearance order is preserved.
        let values = vec!["x", "y", "y", "x"];
        assert_eq!(common_values(values, 2), vec!["x", "y"]);
    }

    #[test]
    fn test_cluster_assembly_full_shape() {
        let failures = embedded(vec![
            failure("a", 10, login_meta("123")),
            failure("b", 11, login_meta("124")),
            failure("c", 12, login_meta("125")),
        ]);
        let clusters = assemble_clusters(&failures, &[vec![0, 1, 2]], 2, "2026-07-01");
        assert_eq!(clusters.len(), 1);

        let cluster = &clusters[0];
        assert_eq!(cluster.id, "2026-07-01-0");
        assert_eq!(cluster.metadata.failure_count, 3);
        assert_eq!(
            cluster.common_patterns.file_paths,
            vec!["tests/auth/login.spec.ts"]
        );
        assert_eq!(cluster.common_patterns.locators, vec!["button.login"]);
        assert_eq!(cluster.common_patterns.matchers, vec!["toBeVisible"]);
        assert_eq!(cluster.common_patterns.timeouts, vec![5000]);
        assert_eq!(cluster.metadata.run_ids, vec!["123", "124", "125"]);
        assert_eq!(cluster.metadata.failure_ids, vec!["a", "b", "c"]);

        // One hour apart: average gap is exactly 3_600_000 ms.
        assert_eq!(
            cluster.metadata.average_time_between_failures_ms,
            Some(3_600_000.0)
        );
        assert_eq!(
            cluster.metadata.first_seen,
            Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            cluster.metadata.last_seen,
            Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
        );

        assert_eq!(
            cluster.failure_pattern,
            "Common failure at tests/auth/login.spec.ts:12"
        );
        assert_eq!(
            cluster.assertion_pattern.as_deref(),
            Some("toBeVisible on button.login (5000ms timeout)")
        );
    }

    #[test]
    fn test_single_member_cluster_has_no_average_gap() {
        let failures = embedded(vec![failure("a", 10, FailureMetadata::default())]);
        let clusters = assemble_clusters(&failures, &[vec![0]], 1, "2026-07-01");
        assert_eq!(clusters[0].metadata.average_time_between_failures_ms, None);
        assert_eq!(clusters[0].metadata.first_seen, clusters[0].metadata.last_seen);
    }

    #[test]
    fn test_size_filter_runs_after_id_assignment() {
        let failures = embedded(vec![
            failure("a", 10, FailureMetadata::default()),
            failure("b", 11, FailureMetadata::default()),
            failure("c", 12, FailureMetadata::default()),
        ]);
        // First discovered cluster is too small and is dropped, but the
        // survivor keeps its discovery-position id.
        let clusters = assemble_clusters(&failures, &[vec![0], vec![1, 2]], 2, "2026-07-01");
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, "2026-07-01-1");
    }

    #[test]
    fn test_failure_pattern_falls_back_to_snippet_then_generic() {
        let patterns = CommonPatterns {
            code_snippets: vec!["x".repeat(150)],
            ..Default::default()
        };
        let summary = failure_pattern(&patterns);
        assert!(summary.starts_with("Common code pattern: "));
        assert!(summary.ends_with("..."));
        assert_eq!(
            summary.len(),
            "Common code pattern: ".len() + SNIPPET_SUMMARY_LIMIT + 3
        );

        assert_eq!(
            failure_pattern(&CommonPatterns::default()),
            "Similar test failures"
        );
    }

    #[test]
    fn test_assertion_pattern_variants() {
        let locator_only = CommonPatterns {
            locators: vec!["button.save".to_string()],
            ..Default::default()
        };
        assert_eq!(
            assertion_pattern(&locator_only).as_deref(),
            Some("Common locator: button.save")
        );

        let matcher_only = CommonPatterns {
            matchers: vec!["toHaveText".to_string()],
            ..Default::default()
        };
        assert_eq!(
            assertion_pattern(&matcher_only).as_deref(),
            Some("Common matcher: toHaveText")
        );

        assert_eq!(assertion_pattern(&CommonPatterns::default()), None);
    }

    #[test]
    fn test_error_messages_truncated_to_200_chars() {
        let mut long = failure("a", 10, FailureMetadata::default());
        long.error_message = "é".repeat(1000);
        let mut other = long.clone();
        other.id = "b".to_string();

        let clusters = assemble_clusters(&embedded(vec![long, other]), &[vec![0, 1]], 2, "d");
        for message in &clusters[0].metadata.error_messages {
            assert_eq!(message.chars().count(), 200);
        }
    }

    #[test]
    fn test_rank_orders_by_size_then_id() {
        let small = embedded(vec![
            failure("a", 10, FailureMetadata::default()),
            failure("b", 11, FailureMetadata::default()),
            failure("c", 12, FailureMetadata::default()),
            failure("d", 13, FailureMetadata::default()),
            failure("e", 14, FailureMetadata::default()),
        ]);
        let clusters = assemble_clusters(
            &small,
            &[vec![0, 1], vec![2, 3, 4]],
            2,
            "2026-07-01",
        );
        let ranked = rank_clusters(clusters, Some(5));
        assert_eq!(ranked[0].id, "2026-07-01-1"); // larger cluster first
        assert_eq!(ranked[1].id, "2026-07-01-0");

        // Equal sizes fall back to id order.
        let clusters = assemble_clusters(
            &small,
            &[vec![2, 3], vec![0, 1]],
            2,
            "2026-07-01",
        );
        let ranked = rank_clusters(clusters, None);
        assert_eq!(ranked[0].id, "2026-07-01-0");
        assert_eq!(ranked[1].id, "2026-07-01-1");
    }

    #[test]
    fn test_rank_caps_output() {
        let failures = embedded(
            (0..8)
                .map(|i| failure(&format!("f{i}"), 10, FailureMetadata::default()))
                .collect(),
        );
        let sets: Vec<Vec<usize>> = (0..4).map(|i| vec![i * 2, i * 2 + 1]).collect();
        let clusters = assemble_clusters(&failures, &sets, 2, "2026-07-01");
        assert_eq!(rank_clusters(clusters.clone(), Some(3)).len(), 3);
        assert_eq!(rank_clusters(clusters, None).len(), 4);
    }

    #[test]
    fn test_pass_base_key_format() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 23, 59, 59).unwrap();
        assert_eq!(pass_base_key(now), "2026-07-01");
    }
}
