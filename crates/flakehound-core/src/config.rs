//! Detection pass configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Distance function used by the density clustering stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - (a.b) / (|a| |b|)`; zero-magnitude vectors have similarity 0.
    #[default]
    Cosine,
    /// Standard L2 distance.
    Euclidean,
}

impl FromStr for DistanceMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            other => Err(ConfigError::UnknownDistance(other.to_string())),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Euclidean => write!(f, "euclidean"),
        }
    }
}

/// Configuration for one detection pass.
///
/// Validated at detective construction via [`DetectiveConfig::validate`];
/// any violation is fatal for the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectiveConfig {
    /// Fetch failures from the past `time_window_days` days.
    pub time_window_days: u32,

    /// DBSCAN neighborhood radius.
    pub epsilon: f64,

    /// Minimum neighborhood size (the point itself included) for a core
    /// point.
    pub min_points: usize,

    /// Clusters smaller than this are discarded after assembly.
    pub min_cluster_size: usize,

    /// Keep at most this many ranked clusters. `None` keeps all.
    pub max_clusters: Option<usize>,

    /// Distance function for clustering.
    pub distance: DistanceMetric,

    /// Largest number of contexts sent to the embedding provider at once.
    pub max_batch_size: usize,

    /// Pause between successive embedding batches, in milliseconds.
    pub batch_delay_ms: u64,
}

impl Default for DetectiveConfig {
    fn default() -> Self {
        DetectiveConfig {
            time_window_days: 7,
            epsilon: 0.3,
            min_points: 2,
            min_cluster_size: 2,
            max_clusters: Some(5),
            distance: DistanceMetric::Cosine,
            max_batch_size: 5,
            batch_delay_ms: 100,
        }
    }
}

impl DetectiveConfig {
    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epsilon <= 0.0 || !self.epsilon.is_finite() {
            return Err(ConfigError::Epsilon(self.epsilon));
        }
        if self.min_points < 1 {
            return Err(ConfigError::MinPoints);
        }
        if self.min_cluster_size < 1 {
            return Err(ConfigError::MinClusterSize);
        }
        if self.max_clusters == Some(0) {
            return Err(ConfigError::MaxClusters);
        }
        if self.time_window_days == 0 {
            return Err(ConfigError::TimeWindow);
        }
        if self.max_batch_size < 1 {
            return Err(ConfigError::MaxBatchSize);
        }
        Ok(())
    }

    /// Inter-batch pause as a [`Duration`].
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}
