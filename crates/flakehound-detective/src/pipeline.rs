//! Detection pass orchestration.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use flakehound_core::{
    assemble_clusters, dbscan, enrich, pass_base_key, rank_clusters, validate_failures,
    DetectiveConfig, FailureCluster, TestFailure,
};
use flakehound_embed::EmbeddingProvider;
use flakehound_store::DataStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::embedder::EmbeddingOrchestrator;
use crate::error::DetectiveError;

/// Runs detection passes against a store and an embedding provider.
///
/// Each pass owns its working set; a single detective can serve concurrent
/// passes because it holds no mutable state.
pub struct FlakinessDetective {
    store: Arc<dyn DataStore>,
    orchestrator: EmbeddingOrchestrator,
    config: DetectiveConfig,
}

impl std::fmt::Debug for FlakinessDetective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakinessDetective")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FlakinessDetective {
    /// Validate the configuration and wire the collaborators.
    pub fn new(
        store: Arc<dyn DataStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: DetectiveConfig,
    ) -> Result<Self, DetectiveError> {
        config.validate()?;
        let orchestrator =
            EmbeddingOrchestrator::new(provider, config.max_batch_size, config.batch_delay());
        Ok(FlakinessDetective {
            store,
            orchestrator,
            config,
        })
    }

    /// Run one detection pass to completion.
    pub async fn detect(&self) -> Result<Vec<FailureCluster>, DetectiveError> {
        self.detect_with_cancellation(&CancellationToken::new())
            .await
    }

    /// Run one detection pass, honoring `cancel` at every suspension point.
    ///
    /// On cancellation no partial output reaches the store and the pass
    /// returns [`DetectiveError::Cancelled`].
    pub async fn detect_with_cancellation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<FailureCluster>, DetectiveError> {
        let started = Instant::now();

        let failures = tokio::select! {
            _ = cancel.cancelled() => return Err(DetectiveError::Cancelled),
            fetched = self.store.fetch_failures(self.config.time_window_days) => fetched?,
        };
        info!(
            count = failures.len(),
            days = self.config.time_window_days,
            "fetched failures"
        );

        validate_failures(&failures)?;

        let enriched: Vec<TestFailure> = failures.iter().map(enrich).collect();

        let embedded = self.orchestrator.embed_failures(enriched, cancel).await?;

        let points: Vec<Vec<f32>> = embedded.iter().map(|e| e.embedding.clone()).collect();
        let index_sets = dbscan(
            &points,
            self.config.epsilon,
            self.config.min_points,
            self.config.distance,
        )?;
        info!(clusters = index_sets.len(), "density clustering done");

        let base_key = pass_base_key(Utc::now());
        let assembled =
            assemble_clusters(&embedded, &index_sets, self.config.min_cluster_size, &base_key);
        let ranked = rank_clusters(assembled, self.config.max_clusters);

        tokio::select! {
            _ = cancel.cancelled() => return Err(DetectiveError::Cancelled),
            saved = self.store.save_clusters(&ranked) => saved?,
        }

        info!(
            clusters = ranked.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "detection pass complete"
        );
        Ok(ranked)
    }

    /// Fetch persisted clusters for reporting flows.
    pub async fn report(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<FailureCluster>, DetectiveError> {
        Ok(self.store.fetch_clusters(limit).await?)
    }

    /// The validated configuration this detective runs with.
    pub fn config(&self) -> &DetectiveConfig {
        &self.config
    }
}
