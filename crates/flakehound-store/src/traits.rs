//! Storage trait definition.
//!
//! `DataStore` is the only capability the detection pipeline needs from
//! persistence. All backends are async and interchangeable; an in-memory
//! implementation doubles as the test fake.

use async_trait::async_trait;
use flakehound_core::{FailureCluster, TestFailure};

use crate::error::StoreResult;

/// Failure and cluster persistence.
///
/// Guarantees:
/// - `fetch_failures(days)` returns only failures observed within the past
///   `days` days, and the caller treats the result read-only.
/// - `save_clusters` persists the full ranked output of a pass, replacing
///   the previous pass on the same keyspace.
/// - `fetch_clusters` returns clusters largest-first; it serves reporting
///   flows, not the detection pipeline itself.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Failures whose timestamp is within the past `days` days.
    async fn fetch_failures(&self, days: u32) -> StoreResult<Vec<TestFailure>>;

    /// Record observed failures for later detection passes.
    async fn save_failures(&self, failures: &[TestFailure]) -> StoreResult<()>;

    /// Persist the ranked clusters of a pass, replacing the previous pass.
    async fn save_clusters(&self, clusters: &[FailureCluster]) -> StoreResult<()>;

    /// Retrieve persisted clusters, largest first, capped at `limit` when
    /// given.
    async fn fetch_clusters(&self, limit: Option<usize>) -> StoreResult<Vec<FailureCluster>>;
}
