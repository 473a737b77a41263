//! Embedded SurrealDB document store.
//!
//! Tables:
//! - `test_failures`: one row per observed failure
//! - `flaky_clusters`: the ranked clusters of the latest pass
//!
//! Timestamps are stored as native SurrealDB datetimes so the time-window
//! query runs inside the database; everything else keeps the domain shape.

use chrono::{DateTime, Duration, Utc};
use flakehound_core::{ClusterMetadata, CommonPatterns, FailureCluster, FailureMetadata, TestFailure};
use serde::{Deserialize, Serialize};
use surrealdb::engine::local::{Db, Mem, SurrealKv};
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::traits::DataStore;
use async_trait::async_trait;

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing a list of chrono DateTimes the same way
mod surreal_datetime_vec {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(dates: &[DateTime<Utc>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sds: Vec<SurrealDatetime> = dates.iter().map(|d| SurrealDatetime::from(*d)).collect();
        serde::Serialize::serialize(&sds, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sds = Vec::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sds.into_iter().map(DateTime::from).collect())
    }
}

/// Failure row. The domain `id` lives under `failure_id` because SurrealDB
/// reserves `id` for the record id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FailureRow {
    failure_id: String,
    test_title: String,
    test_file_path: String,
    error_message: String,
    error_stack: Option<String>,
    #[serde(with = "surreal_datetime")]
    timestamp: DateTime<Utc>,
    metadata: Option<FailureMetadata>,
}

impl From<&TestFailure> for FailureRow {
    fn from(failure: &TestFailure) -> Self {
        FailureRow {
            failure_id: failure.id.clone(),
            test_title: failure.test_title.clone(),
            test_file_path: failure.test_file_path.clone(),
            error_message: failure.error_message.clone(),
            error_stack: failure.error_stack.clone(),
            timestamp: failure.timestamp,
            metadata: failure.metadata.clone(),
        }
    }
}

impl From<FailureRow> for TestFailure {
    fn from(row: FailureRow) -> Self {
        TestFailure {
            id: row.failure_id,
            test_title: row.test_title,
            test_file_path: row.test_file_path,
            error_message: row.error_message,
            error_stack: row.error_stack,
            timestamp: row.timestamp,
            metadata: row.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClusterMetadataRow {
    failure_count: usize,
    #[serde(with = "surreal_datetime")]
    first_seen: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    last_seen: DateTime<Utc>,
    average_time_between_failures: Option<f64>,
    failure_ids: Vec<String>,
    run_ids: Vec<String>,
    #[serde(with = "surreal_datetime_vec")]
    failure_timestamps: Vec<DateTime<Utc>>,
    error_messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClusterRow {
    cluster_id: String,
    failures: Vec<FailureRow>,
    common_patterns: CommonPatterns,
    metadata: ClusterMetadataRow,
    failure_pattern: String,
    assertion_pattern: Option<String>,
}

impl From<&FailureCluster> for ClusterRow {
    fn from(cluster: &FailureCluster) -> Self {
        ClusterRow {
            cluster_id: cluster.id.clone(),
            failures: cluster.failures.iter().map(FailureRow::from).collect(),
            common_patterns: cluster.common_patterns.clone(),
            metadata: ClusterMetadataRow {
                failure_count: cluster.metadata.failure_count,
                first_seen: cluster.metadata.first_seen,
                last_seen: cluster.metadata.last_seen,
                average_time_between_failures: cluster
                    .metadata
                    .average_time_between_failures_ms,
                failure_ids: cluster.metadata.failure_ids.clone(),
                run_ids: cluster.metadata.run_ids.clone(),
                failure_timestamps: cluster.metadata.failure_timestamps.clone(),
                error_messages: cluster.metadata.error_messages.clone(),
            },
            failure_pattern: cluster.failure_pattern.clone(),
            assertion_pattern: cluster.assertion_pattern.clone(),
        }
    }
}

impl From<ClusterRow> for FailureCluster {
    fn from(row: ClusterRow) -> Self {
        FailureCluster {
            id: row.cluster_id,
            failures: row.failures.into_iter().map(TestFailure::from).collect(),
            common_patterns: row.common_patterns,
            metadata: ClusterMetadata {
                failure_count: row.metadata.failure_count,
                first_seen: row.metadata.first_seen,
                last_seen: row.metadata.last_seen,
                average_time_between_failures_ms: row.metadata.average_time_between_failures,
                failure_ids: row.metadata.failure_ids,
                run_ids: row.metadata.run_ids,
                failure_timestamps: row.metadata.failure_timestamps,
                error_messages: row.metadata.error_messages,
            },
            failure_pattern: row.failure_pattern,
            assertion_pattern: row.assertion_pattern,
        }
    }
}

/// SurrealDB connection handle for Flakehound
pub struct SurrealStore {
    db: Surreal<Db>,
}

impl SurrealStore {
    /// Connect to an in-memory SurrealDB and set up the schema.
    #[instrument(skip_all)]
    pub async fn connect_memory() -> StoreResult<Self> {
        info!("Connecting to SurrealDB (in-memory)");
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::finish_connect(db).await
    }

    /// Connect to an on-disk SurrealKV database and set up the schema.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect_file(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        info!("Connecting to SurrealDB (surrealkv)");
        let db = Surreal::new::<SurrealKv>(path.as_ref().to_string_lossy().as_ref())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::finish_connect(db).await
    }

    async fn finish_connect(db: Surreal<Db>) -> StoreResult<Self> {
        db.use_ns("flakehound")
            .use_db("main")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = SurrealStore { db };
        store.init_schema().await?;
        info!("SurrealDB connected and schema initialized");
        Ok(store)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> StoreResult<()> {
        debug!("Initializing Flakehound schema");

        let schema = r#"
            -- Observed failures
            DEFINE TABLE test_failures SCHEMAFULL;
            DEFINE FIELD failure_id ON test_failures TYPE string;
            DEFINE FIELD test_title ON test_failures TYPE string;
            DEFINE FIELD test_file_path ON test_failures TYPE string;
            DEFINE FIELD error_message ON test_failures TYPE string;
            DEFINE FIELD error_stack ON test_failures TYPE option<string>;
            DEFINE FIELD timestamp ON test_failures TYPE datetime;
            DEFINE FIELD metadata ON test_failures FLEXIBLE TYPE option<object>;
            DEFINE INDEX idx_failure_id ON test_failures FIELDS failure_id UNIQUE;
            DEFINE INDEX idx_failure_time ON test_failures FIELDS timestamp;

            -- Ranked clusters of the latest pass
            DEFINE TABLE flaky_clusters SCHEMAFULL;
            DEFINE FIELD cluster_id ON flaky_clusters TYPE string;
            DEFINE FIELD failures ON flaky_clusters FLEXIBLE TYPE array;
            DEFINE FIELD common_patterns ON flaky_clusters FLEXIBLE TYPE object;
            DEFINE FIELD metadata ON flaky_clusters FLEXIBLE TYPE object;
            DEFINE FIELD failure_pattern ON flaky_clusters TYPE string;
            DEFINE FIELD assertion_pattern ON flaky_clusters TYPE option<string>;
            DEFINE INDEX idx_cluster_id ON flaky_clusters FIELDS cluster_id UNIQUE;
        "#;

        self.db
            .query(schema)
            .await
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

        debug!("Schema initialized successfully");
        Ok(())
    }
}

#[async_trait]
impl DataStore for SurrealStore {
    #[instrument(skip(self))]
    async fn fetch_failures(&self, days: u32) -> StoreResult<Vec<TestFailure>> {
        let cutoff = SurrealDatetime::from(Utc::now() - Duration::days(i64::from(days)));

        let mut result = self
            .db
            .query("SELECT * FROM test_failures WHERE timestamp >= $cutoff ORDER BY timestamp ASC")
            .bind(("cutoff", cutoff))
            .await?;

        let rows: Vec<FailureRow> = result.take(0)?;
        Ok(rows.into_iter().map(TestFailure::from).collect())
    }

    #[instrument(skip_all, fields(count = failures.len()))]
    async fn save_failures(&self, failures: &[TestFailure]) -> StoreResult<()> {
        for failure in failures {
            let row = FailureRow::from(failure);
            let _: Option<FailureRow> = self.db.create("test_failures").content(row).await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(count = clusters.len()))]
    async fn save_clusters(&self, clusters: &[FailureCluster]) -> StoreResult<()> {
        // Each pass replaces the previous one.
        let _: Vec<ClusterRow> = self.db.delete("flaky_clusters").await?;

        for cluster in clusters {
            let row = ClusterRow::from(cluster);
            let _: Option<ClusterRow> = self.db.create("flaky_clusters").content(row).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_clusters(&self, limit: Option<usize>) -> StoreResult<Vec<FailureCluster>> {
        let query = match limit {
            Some(_) => {
                "SELECT * FROM flaky_clusters \
                 ORDER BY metadata.failure_count DESC, cluster_id ASC LIMIT $limit"
            }
            None => "SELECT * FROM flaky_clusters ORDER BY metadata.failure_count DESC, cluster_id ASC",
        };

        let mut request = self.db.query(query);
        if let Some(limit) = limit {
            request = request.bind(("limit", limit));
        }

        let mut result = request.await?;
        let rows: Vec<ClusterRow> = result.take(0)?;
        Ok(rows.into_iter().map(FailureCluster::from).collect())
    }
}
