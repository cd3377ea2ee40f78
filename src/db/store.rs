use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ConsensusResult, ItemKey, RatingRecord, Weight},
};

/// Data access used by the consensus engine
///
/// Ratings and trust weights are the source of truth; consensus results are a
/// rebuildable cache. Every write is expected to be atomic for its key, so
/// concurrent recalculations of the same key resolve as last-write-wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConsensusStore: Send + Sync {
    /// Explicit trust weights the viewer has assigned, keyed by rater
    async fn list_trust_weights(&self, viewer_id: Uuid) -> AppResult<Vec<(Uuid, Weight)>>;

    /// Subset of `rater_ids` whose accounts are active
    async fn list_active_rater_ids(&self, rater_ids: &[Uuid]) -> AppResult<HashSet<Uuid>>;

    /// Available (non-null) scores for one item from the given raters
    async fn list_eligible_ratings(
        &self,
        item: ItemKey,
        rater_ids: &[Uuid],
    ) -> AppResult<Vec<(Uuid, f64)>>;

    /// Inserts or replaces the result for (viewer, item, dimension)
    async fn upsert_consensus_result(&self, result: &ConsensusResult) -> AppResult<()>;

    /// Removes the result for (viewer, item, dimension), if present
    async fn delete_consensus_result(&self, viewer_id: Uuid, item: ItemKey) -> AppResult<()>;

    async fn list_consensus_results(&self, viewer_id: Uuid) -> AppResult<Vec<ConsensusResult>>;

    /// Removes one trust edge, returning whether it existed
    async fn delete_trust_weight(&self, viewer_id: Uuid, rater_id: Uuid) -> AppResult<bool>;

    /// Removes several trust edges, returning how many existed
    async fn delete_trust_weights(&self, viewer_id: Uuid, rater_ids: &[Uuid]) -> AppResult<u64>;

    async fn bulk_upsert_trust_weights(
        &self,
        viewer_id: Uuid,
        weights: &[(Uuid, Weight)],
    ) -> AppResult<()>;

    /// Viewers holding a trust weight on the given rater
    async fn list_viewers_trusting(&self, rater_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Every (item, dimension) with at least one rating record
    async fn list_rated_items(&self) -> AppResult<Vec<ItemKey>>;

    async fn upsert_rating(&self, record: &RatingRecord) -> AppResult<()>;

    /// Removes a rating, returning whether it existed
    async fn delete_rating(&self, rater_id: Uuid, item: ItemKey) -> AppResult<bool>;
}
