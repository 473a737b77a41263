//! Flakehound Core - Flaky-test detection domain
//!
//! This crate holds the pure domain of the detection pipeline:
//!
//! - Failure records and cluster records ([`model`])
//! - Input validation ([`validate`])
//! - Pattern extraction from error text, stacks, and snippets ([`extract`])
//! - Embedding-context construction ([`context`])
//! - Density clustering over embedding vectors ([`cluster`])
//! - Cluster assembly, ranking, and capping ([`assemble`])
//!
//! Collaborator boundaries (storage, embedding providers) live in the
//! `flakehound-store` and `flakehound-embed` crates; the end-to-end pass is
//! orchestrated by `flakehound-detective`.

pub mod assemble;
pub mod cluster;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod model;
pub mod telemetry;
pub mod validate;

pub use assemble::{assemble_clusters, pass_base_key, rank_clusters};
pub use cluster::dbscan;
pub use config::{DetectiveConfig, DistanceMetric};
pub use context::build_embedding_context;
pub use error::{ConfigError, ValidationError};
pub use extract::enrich;
pub use model::{
    ClusterMetadata, CommonPatterns, EmbeddedFailure, FailureCluster, FailureMetadata, TestFailure,
};
pub use telemetry::init_tracing;
pub use validate::validate_failures;
