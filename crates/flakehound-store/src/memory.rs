//! In-memory store (testing and single-shot runs)

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use flakehound_core::{FailureCluster, TestFailure};

use crate::error::StoreResult;
use crate::traits::DataStore;

/// In-memory backend holding failures and the latest pass of clusters.
///
/// Satisfies the full `DataStore` contract without external dependencies,
/// which also makes it the fake used across the workspace's tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    failures: Mutex<Vec<TestFailure>>,
    clusters: Mutex<Vec<FailureCluster>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with failures, bypassing the async trait.
    pub fn with_failures(failures: Vec<TestFailure>) -> Self {
        MemoryStore {
            failures: Mutex::new(failures),
            clusters: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn fetch_failures(&self, days: u32) -> StoreResult<Vec<TestFailure>> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let failures = self.failures.lock().unwrap();
        Ok(failures
            .iter()
            .filter(|f| f.timestamp >= cutoff)
            .cloned()
            .collect())
    }

    async fn save_failures(&self, new: &[TestFailure]) -> StoreResult<()> {
        let mut failures = self.failures.lock().unwrap();
        failures.extend_from_slice(new);
        Ok(())
    }

    async fn save_clusters(&self, clusters: &[FailureCluster]) -> StoreResult<()> {
        let mut stored = self.clusters.lock().unwrap();
        *stored = clusters.to_vec();
        Ok(())
    }

    async fn fetch_clusters(&self, limit: Option<usize>) -> StoreResult<Vec<FailureCluster>> {
        let stored = self.clusters.lock().unwrap();
        let mut clusters = stored.clone();
        if let Some(limit) = limit {
            clusters.truncate(limit);
        }
        Ok(clusters)
    }
}
