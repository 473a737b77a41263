//! Flakehound - semantic flaky-test detection CLI
//!
//! The `flakehound` command runs detection passes over recorded test
//! failures and reports the resulting clusters.
//!
//! ## Commands
//!
//! - `detect`: run one detection pass and persist the ranked clusters
//! - `report`: print previously persisted clusters
//!
//! A JSON config file (`--config`) supplies defaults; command-line flags
//! always win over file values.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

use flakehound_core::{DetectiveConfig, FailureCluster};
use flakehound_detective::{DetectiveError, FlakinessDetective};
use flakehound_embed::{EmbedError, EmbeddingProvider, GeminiConfig, GeminiEmbedder, MockEmbedder};
use flakehound_store::{DataStore, StoreConfig, StoreError};

#[derive(Parser)]
#[command(name = "flakehound")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Semantic flaky-test detection for CI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// JSON config file; flag values win over file values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one detection pass and persist the ranked clusters
    Detect {
        /// Look at failures from the past N days
        #[arg(short, long)]
        days: Option<u32>,

        /// DBSCAN neighborhood radius
        #[arg(long)]
        epsilon: Option<f64>,

        /// Neighborhood size required for a core point
        #[arg(long)]
        min_points: Option<usize>,

        /// Discard clusters smaller than this
        #[arg(long)]
        min_cluster_size: Option<usize>,

        /// Keep at most this many clusters (omit for all)
        #[arg(long)]
        max_clusters: Option<usize>,

        /// Distance metric: cosine or euclidean
        #[arg(long)]
        distance: Option<String>,

        /// Largest embedding batch sent at once
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pause between embedding batches, in milliseconds
        #[arg(long)]
        batch_delay_ms: Option<u64>,

        /// Storage backend
        #[arg(long, value_enum)]
        store: Option<StoreKind>,

        /// Data directory for file-backed stores
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Embedding provider
        #[arg(long, value_enum)]
        embedder: Option<EmbedderKind>,

        /// Embedding model name (gemini provider)
        #[arg(long)]
        model: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Print previously persisted clusters
    Report {
        /// Maximum number of clusters to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Storage backend
        #[arg(long, value_enum)]
        store: Option<StoreKind>,

        /// Data directory for file-backed stores
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreKind {
    Memory,
    File,
    Surreal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EmbedderKind {
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Shape of the optional `--config` file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileConfig {
    detective: Option<DetectiveConfig>,
    store: Option<StoreConfig>,
    embedder: Option<EmbedderSection>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EmbedderSection {
    kind: Option<EmbedderKind>,
    model: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    flakehound_core::init_tracing(cli.json, level);

    if let Err(err) = run(cli).await {
        eprintln!("flakehound: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = load_file_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Detect {
            days,
            epsilon,
            min_points,
            min_cluster_size,
            max_clusters,
            distance,
            batch_size,
            batch_delay_ms,
            store,
            data_dir,
            embedder,
            model,
            output,
        } => {
            let config = resolve_detective_config(
                &file_config,
                days,
                epsilon,
                min_points,
                min_cluster_size,
                max_clusters,
                distance.as_deref(),
                batch_size,
                batch_delay_ms,
            )?;
            let store = resolve_store(&file_config, store, data_dir.as_deref())
                .connect()
                .await?;
            let provider = resolve_provider(&file_config, embedder, model)?;
            cmd_detect(store, provider, config, output).await
        }
        Commands::Report {
            limit,
            store,
            data_dir,
            output,
        } => {
            let store = resolve_store(&file_config, store, data_dir.as_deref())
                .connect()
                .await?;
            cmd_report(store, limit, output).await
        }
    }
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn resolve_detective_config(
    file: &FileConfig,
    days: Option<u32>,
    epsilon: Option<f64>,
    min_points: Option<usize>,
    min_cluster_size: Option<usize>,
    max_clusters: Option<usize>,
    distance: Option<&str>,
    batch_size: Option<usize>,
    batch_delay_ms: Option<u64>,
) -> Result<DetectiveConfig, DetectiveError> {
    let mut config = file.detective.clone().unwrap_or_default();

    if let Some(days) = days {
        config.time_window_days = days;
    }
    if let Some(epsilon) = epsilon {
        config.epsilon = epsilon;
    }
    if let Some(min_points) = min_points {
        config.min_points = min_points;
    }
    if let Some(min_cluster_size) = min_cluster_size {
        config.min_cluster_size = min_cluster_size;
    }
    if let Some(max_clusters) = max_clusters {
        config.max_clusters = Some(max_clusters);
    }
    if let Some(distance) = distance {
        config.distance = distance.parse()?;
    }
    if let Some(batch_size) = batch_size {
        config.max_batch_size = batch_size;
    }
    if let Some(batch_delay_ms) = batch_delay_ms {
        config.batch_delay_ms = batch_delay_ms;
    }

    Ok(config)
}

fn resolve_store(
    file: &FileConfig,
    kind: Option<StoreKind>,
    data_dir: Option<&Path>,
) -> StoreConfig {
    let default_dir = || {
        data_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".flakehound"))
    };

    match kind {
        Some(StoreKind::Memory) => StoreConfig::Memory,
        Some(StoreKind::File) => StoreConfig::File {
            data_dir: default_dir(),
        },
        Some(StoreKind::Surreal) => StoreConfig::Surreal {
            path: Some(default_dir().join("flakehound.db")),
        },
        None => match (file.store.clone(), data_dir) {
            // An explicit --data-dir retargets a file-backed store from the
            // config file.
            (Some(StoreConfig::File { .. }), Some(dir)) => StoreConfig::File {
                data_dir: dir.to_path_buf(),
            },
            (Some(config), _) => config,
            (None, _) => StoreConfig::File {
                data_dir: default_dir(),
            },
        },
    }
}

fn resolve_provider(
    file: &FileConfig,
    kind: Option<EmbedderKind>,
    model: Option<String>,
) -> Result<Arc<dyn EmbeddingProvider>, EmbedError> {
    let section = file.embedder.clone().unwrap_or_default();
    let kind = kind.or(section.kind).unwrap_or(EmbedderKind::Gemini);

    match kind {
        EmbedderKind::Mock => Ok(Arc::new(MockEmbedder::default())),
        EmbedderKind::Gemini => {
            let mut config = GeminiConfig::default();
            if let Some(model) = model.or(section.model) {
                config.model = model;
            }
            Ok(Arc::new(GeminiEmbedder::new(config)?))
        }
    }
}

async fn cmd_detect(
    store: Arc<dyn DataStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: DetectiveConfig,
    output: OutputFormat,
) -> Result<()> {
    let detective = FlakinessDetective::new(store, provider, config)?;

    // Ctrl-C aborts the pass without partial output.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let clusters = detective.detect_with_cancellation(&cancel).await?;
    info!(clusters = clusters.len(), "detection pass persisted");

    print_clusters(&clusters, output)?;
    Ok(())
}

async fn cmd_report(
    store: Arc<dyn DataStore>,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<()> {
    let clusters = store.fetch_clusters(limit).await?;
    print_clusters(&clusters, output)?;
    Ok(())
}

fn print_clusters(clusters: &[FailureCluster], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(clusters)?);
        }
        OutputFormat::Text => {
            if clusters.is_empty() {
                println!("No flaky clusters found.");
                return Ok(());
            }
            for cluster in clusters {
                println!(
                    "{}: {} failures",
                    cluster.id, cluster.metadata.failure_count
                );
                println!("  pattern: {}", cluster.failure_pattern);
                if let Some(assertion) = &cluster.assertion_pattern {
                    println!("  assertion: {assertion}");
                }
                println!(
                    "  first seen: {}",
                    cluster.metadata.first_seen.to_rfc3339()
                );
                println!("  last seen:  {}", cluster.metadata.last_seen.to_rfc3339());
                if let Some(avg) = cluster.metadata.average_time_between_failures_ms {
                    println!("  avg gap:    {:.0}ms", avg);
                }
                if !cluster.metadata.run_ids.is_empty() {
                    println!("  runs: {}", cluster.metadata.run_ids.join(", "));
                }
                for failure in &cluster.failures {
                    println!("  - {} ({})", failure.test_title, failure.id);
                }
            }
        }
    }
    Ok(())
}

/// Map each failure kind to its exit code; success is 0.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<DetectiveError>() {
        return match err {
            DetectiveError::Config(_) => 2,
            DetectiveError::Validation(_) => 3,
            DetectiveError::Provider { .. } => 4,
            DetectiveError::Storage(_) => 5,
            DetectiveError::Cancelled => 130,
        };
    }
    if err.downcast_ref::<EmbedError>().is_some() {
        return 4;
    }
    if err.downcast_ref::<StoreError>().is_some() {
        return 5;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use flakehound_core::DistanceMetric;

    #[test]
    fn test_flags_win_over_file_config() {
        let file = FileConfig {
            detective: Some(DetectiveConfig {
                epsilon: 0.5,
                min_points: 4,
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = resolve_detective_config(
            &file,
            None,
            Some(0.15),
            None,
            None,
            None,
            Some("euclidean"),
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.epsilon, 0.15); // flag wins
        assert_eq!(config.min_points, 4); // file value survives
        assert_eq!(config.distance, DistanceMetric::Euclidean);
    }

    #[test]
    fn test_unknown_distance_is_a_config_error() {
        let err = resolve_detective_config(
            &FileConfig::default(),
            None,
            None,
            None,
            None,
            None,
            Some("manhattan"),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DetectiveError::Config(_)));
    }

    #[test]
    fn test_store_resolution_defaults_to_file_backend() {
        let config = resolve_store(&FileConfig::default(), None, None);
        assert_eq!(
            config,
            StoreConfig::File {
                data_dir: PathBuf::from(".flakehound")
            }
        );
    }

    #[test]
    fn test_data_dir_flag_retargets_file_store_from_config() {
        let file = FileConfig {
            store: Some(StoreConfig::File {
                data_dir: PathBuf::from("/var/fh"),
            }),
            ..Default::default()
        };
        let config = resolve_store(&file, None, Some(Path::new("/tmp/other")));
        assert_eq!(
            config,
            StoreConfig::File {
                data_dir: PathBuf::from("/tmp/other")
            }
        );
    }

    #[test]
    fn test_exit_codes_per_error_kind() {
        let config_err: anyhow::Error =
            DetectiveError::Config(flakehound_core::ConfigError::MinPoints).into();
        assert_eq!(exit_code(&config_err), 2);

        let cancelled: anyhow::Error = DetectiveError::Cancelled.into();
        assert_eq!(exit_code(&cancelled), 130);

        let missing_key: anyhow::Error = EmbedError::MissingApiKey.into();
        assert_eq!(exit_code(&missing_key), 4);

        let other = anyhow::anyhow!("unmapped");
        assert_eq!(exit_code(&other), 1);
    }

    #[test]
    fn test_file_config_shape() {
        let parsed: FileConfig = serde_json::from_str(
            r#"{
                "detective": {"epsilon": 0.2, "maxClusters": 10},
                "store": {"kind": "surreal"},
                "embedder": {"kind": "mock"}
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.detective.as_ref().unwrap().epsilon, 0.2);
        assert_eq!(parsed.detective.as_ref().unwrap().max_clusters, Some(10));
        assert_eq!(parsed.store, Some(StoreConfig::Surreal { path: None }));
        assert_eq!(parsed.embedder.unwrap().kind, Some(EmbedderKind::Mock));
    }
}
