use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{
    db::ConsensusStore,
    error::{AppError, AppResult},
    models::{BatchSummary, ConsensusResult, ItemKey, Weight},
};

/// Number of contributing ratings at which confidence reaches 1.0
pub const CONFIDENCE_SATURATION: u32 = 5;

/// Tunables threaded into the engine at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Weight of a trusted rater with no explicit weight on record
    pub default_weight: Weight,
    /// Upper bound on items recalculated concurrently in one batch
    pub max_concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_weight: Weight::DEFAULT,
            max_concurrency: 8,
        }
    }
}

/// Aggregate of the eligible ratings for one (viewer, item)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consensus {
    pub score: f64,
    pub rating_count: u32,
    pub confidence: f64,
}

/// Sample-size confidence: `count / 5`, capped at 1.0
pub fn confidence(rating_count: u32) -> f64 {
    (rating_count as f64 / CONFIDENCE_SATURATION as f64).min(1.0)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes the viewer's weighted consensus over eligible ratings
///
/// The viewer's own rating always weighs 1.0. Other raters use their entry in
/// `weights`, or `default_weight` when the viewer never set one. A lone rating
/// by the viewer is returned verbatim. Returns `None` when there are no
/// ratings or every weight is zero.
pub fn compute_consensus(
    viewer_id: Uuid,
    ratings: &[(Uuid, f64)],
    weights: &HashMap<Uuid, Weight>,
    default_weight: Weight,
) -> Option<Consensus> {
    if let [(rater_id, score)] = ratings {
        if *rater_id == viewer_id {
            return Some(Consensus {
                score: *score,
                rating_count: 1,
                confidence: confidence(1),
            });
        }
    }

    if ratings.is_empty() {
        return None;
    }

    let (weighted_sum, weight_sum) =
        ratings
            .iter()
            .fold((0.0, 0.0), |(weighted_sum, weight_sum), (rater_id, score)| {
                let weight = if *rater_id == viewer_id {
                    Weight::DEFAULT
                } else {
                    weights.get(rater_id).copied().unwrap_or(default_weight)
                };
                (
                    weighted_sum + score * weight.value(),
                    weight_sum + weight.value(),
                )
            });

    if weight_sum <= 0.0 {
        return None;
    }

    let rating_count = ratings.len() as u32;
    Some(Consensus {
        score: round_to_hundredths(weighted_sum / weight_sum),
        rating_count,
        confidence: confidence(rating_count),
    })
}

/// The raters whose opinions count for one viewer
#[derive(Debug, Clone)]
struct TrustContext {
    weights: HashMap<Uuid, Weight>,
    /// The viewer first, then every active trusted rater
    eligible_raters: Vec<Uuid>,
}

/// Recomputes and persists personalized consensus scores
#[derive(Clone)]
pub struct ConsensusEngine {
    store: Arc<dyn ConsensusStore>,
    settings: EngineSettings,
}

impl ConsensusEngine {
    pub fn new(store: Arc<dyn ConsensusStore>, settings: EngineSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn ConsensusStore> {
        &self.store
    }

    /// Loads the viewer's trust weights and filters raters to active accounts
    async fn load_trust_context(&self, viewer_id: Uuid) -> AppResult<TrustContext> {
        let weights: HashMap<Uuid, Weight> = self
            .store
            .list_trust_weights(viewer_id)
            .await?
            .into_iter()
            .filter(|(rater_id, _)| *rater_id != viewer_id)
            .collect();

        let mut trusted: Vec<Uuid> = weights.keys().copied().collect();
        trusted.sort();

        let active = self.store.list_active_rater_ids(&trusted).await?;

        let mut eligible_raters = Vec::with_capacity(trusted.len() + 1);
        eligible_raters.push(viewer_id);
        eligible_raters.extend(trusted.into_iter().filter(|id| active.contains(id)));

        tracing::debug!(
            viewer_id = %viewer_id,
            trusted = weights.len(),
            eligible = eligible_raters.len(),
            "Loaded trust context"
        );

        Ok(TrustContext {
            weights,
            eligible_raters,
        })
    }

    /// Recomputes one item and writes (or clears) its stored result
    async fn refresh_item(
        &self,
        viewer_id: Uuid,
        trust: &TrustContext,
        item: ItemKey,
    ) -> AppResult<Option<ConsensusResult>> {
        let ratings = self
            .store
            .list_eligible_ratings(item, &trust.eligible_raters)
            .await?;

        let consensus = compute_consensus(
            viewer_id,
            &ratings,
            &trust.weights,
            self.settings.default_weight,
        );

        match consensus {
            Some(consensus) => {
                let result = ConsensusResult {
                    viewer_id,
                    item_id: item.item_id,
                    dimension: item.dimension,
                    score: consensus.score,
                    rating_count: consensus.rating_count,
                    confidence: consensus.confidence,
                };
                self.store.upsert_consensus_result(&result).await?;

                tracing::debug!(
                    viewer_id = %viewer_id,
                    item = %item,
                    score = result.score,
                    rating_count = result.rating_count,
                    "Consensus updated"
                );

                Ok(Some(result))
            }
            None => {
                self.store.delete_consensus_result(viewer_id, item).await?;
                tracing::debug!(viewer_id = %viewer_id, item = %item, "No eligible ratings");
                Ok(None)
            }
        }
    }

    /// Recomputes the viewer's consensus for a single item
    ///
    /// Returns `None` when no eligible rating exists, in which case any stale
    /// result for the item is removed.
    pub async fn recalculate_item(
        &self,
        viewer_id: Uuid,
        item: ItemKey,
    ) -> AppResult<Option<ConsensusResult>> {
        let trust = self.load_trust_context(viewer_id).await?;
        self.refresh_item(viewer_id, &trust, item).await
    }

    /// Recomputes the viewer's consensus for every rated item
    ///
    /// Items are processed concurrently up to `max_concurrency`. A failing
    /// item is recorded in the summary and never stops its siblings; only a
    /// failure to load the viewer's trust weights or the item list is raised.
    pub async fn recalculate_for_viewer(&self, viewer_id: Uuid) -> AppResult<BatchSummary> {
        let start = Instant::now();

        let trust = Arc::new(self.load_trust_context(viewer_id).await?);

        let mut items: BTreeSet<ItemKey> = self.store.list_rated_items().await?.into_iter().collect();
        items.extend(
            self.store
                .list_consensus_results(viewer_id)
                .await?
                .iter()
                .map(ConsensusResult::item),
        );

        tracing::info!(
            viewer_id = %viewer_id,
            item_count = items.len(),
            "Starting consensus recalculation"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = Vec::with_capacity(items.len());

        for item in items {
            let engine = self.clone();
            let trust = Arc::clone(&trust);
            let semaphore = Arc::clone(&semaphore);
            let task = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                engine.refresh_item(viewer_id, &trust, item).await
            });
            tasks.push((item, task));
        }

        let mut summary = BatchSummary::default();

        for (item, task) in tasks {
            match task.await {
                Ok(Ok(result)) => summary.record_success(result.is_some()),
                Ok(Err(e)) => {
                    tracing::error!(viewer_id = %viewer_id, item = %item, error = %e, "Consensus recalculation failed for item");
                    summary.record_failure(viewer_id, item, e.to_string());
                }
                Err(e) => {
                    tracing::error!(viewer_id = %viewer_id, item = %item, error = %e, "Task join error");
                    summary.record_failure(viewer_id, item, e.to_string());
                }
            }
        }

        if summary.failed > 0 {
            tracing::warn!(
                viewer_id = %viewer_id,
                success_count = summary.succeeded,
                error_count = summary.failed,
                "Partial consensus recalculation failure"
            );
        }

        tracing::info!(
            viewer_id = %viewer_id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            without_data = summary.without_data,
            processing_time_ms = start.elapsed().as_millis(),
            "Consensus recalculation completed"
        );

        Ok(summary)
    }

    /// Recomputes one item for everyone whose score depends on `rater_id`
    ///
    /// That is the rater themself plus every viewer holding a trust weight on
    /// them. Per-viewer failures are collected, not raised.
    pub async fn refresh_audience(&self, rater_id: Uuid, item: ItemKey) -> AppResult<BatchSummary> {
        let mut viewers: BTreeSet<Uuid> = self
            .store
            .list_viewers_trusting(rater_id)
            .await?
            .into_iter()
            .collect();
        viewers.insert(rater_id);

        let mut summary = BatchSummary::default();

        for viewer_id in viewers {
            match self.recalculate_item(viewer_id, item).await {
                Ok(result) => summary.record_success(result.is_some()),
                Err(e) => {
                    tracing::error!(viewer_id = %viewer_id, item = %item, error = %e, "Consensus refresh failed for viewer");
                    summary.record_failure(viewer_id, item, e.to_string());
                }
            }
        }

        tracing::info!(
            rater_id = %rater_id,
            item = %item,
            viewers = summary.total,
            failed = summary.failed,
            "Refreshed consensus after rating change"
        );

        Ok(summary)
    }
}
