//! JSON file store.
//!
//! Persists failures and clusters as pretty-printed JSON arrays inside a
//! data directory:
//!
//! - `<data_dir>/test_failures.json`
//! - `<data_dir>/flaky_clusters.json`
//!
//! Timestamps are ISO-8601 strings. Writes go through a temporary file and
//! a rename so a crashed pass never leaves a half-written document behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use flakehound_core::{FailureCluster, TestFailure};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::StoreResult;
use crate::traits::DataStore;

const FAILURES_FILE: &str = "test_failures.json";
const CLUSTERS_FILE: &str = "flaky_clusters.json";

/// File-backed store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(JsonFileStore { data_dir })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    async fn read_all<T: DeserializeOwned>(&self, file: &str) -> StoreResult<Vec<T>> {
        let path = self.path(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_all<T: Serialize>(&self, file: &str, values: &[T]) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(values)?;
        let path = self.path(file);
        let tmp = self.path(&format!("{file}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote store document");
        Ok(())
    }

    /// Directory this store reads and writes.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl DataStore for JsonFileStore {
    #[instrument(skip(self))]
    async fn fetch_failures(&self, days: u32) -> StoreResult<Vec<TestFailure>> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let failures: Vec<TestFailure> = self.read_all(FAILURES_FILE).await?;
        Ok(failures
            .into_iter()
            .filter(|f| f.timestamp >= cutoff)
            .collect())
    }

    #[instrument(skip_all, fields(count = new.len()))]
    async fn save_failures(&self, new: &[TestFailure]) -> StoreResult<()> {
        let mut failures: Vec<TestFailure> = self.read_all(FAILURES_FILE).await?;
        failures.extend_from_slice(new);
        self.write_all(FAILURES_FILE, &failures).await
    }

    #[instrument(skip_all, fields(count = clusters.len()))]
    async fn save_clusters(&self, clusters: &[FailureCluster]) -> StoreResult<()> {
        self.write_all(CLUSTERS_FILE, clusters).await
    }

    #[instrument(skip(self))]
    async fn fetch_clusters(&self, limit: Option<usize>) -> StoreResult<Vec<FailureCluster>> {
        let mut clusters: Vec<FailureCluster> = self.read_all(CLUSTERS_FILE).await?;
        if let Some(limit) = limit {
            clusters.truncate(limit);
        }
        Ok(clusters)
    }
}
