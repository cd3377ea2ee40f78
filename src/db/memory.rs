use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::ConsensusStore,
    error::AppResult,
    models::{ConsensusResult, ItemKey, RatingRecord, Weight},
};

/// In-process store backed by hash maps
///
/// Accounts are active unless explicitly deactivated.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    ratings: HashMap<(Uuid, ItemKey), RatingRecord>,
    trust_weights: HashMap<(Uuid, Uuid), Weight>,
    results: HashMap<(Uuid, ItemKey), ConsensusResult>,
    inactive_users: HashSet<Uuid>,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an account active or inactive
    pub async fn set_user_active(&self, user_id: Uuid, active: bool) {
        let mut inner = self.inner.write().await;
        if active {
            inner.inactive_users.remove(&user_id);
        } else {
            inner.inactive_users.insert(user_id);
        }
    }

    /// Reads back a single result
    pub async fn consensus_result(&self, viewer_id: Uuid, item: ItemKey) -> Option<ConsensusResult> {
        let inner = self.inner.read().await;
        inner.results.get(&(viewer_id, item)).cloned()
    }
}

#[async_trait::async_trait]
impl ConsensusStore for InMemoryStore {
    async fn list_trust_weights(&self, viewer_id: Uuid) -> AppResult<Vec<(Uuid, Weight)>> {
        let inner = self.inner.read().await;
        Ok(inner
            .trust_weights
            .iter()
            .filter(|((viewer, _), _)| *viewer == viewer_id)
            .map(|((_, rater), weight)| (*rater, *weight))
            .collect())
    }

    async fn list_active_rater_ids(&self, rater_ids: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        let inner = self.inner.read().await;
        Ok(rater_ids
            .iter()
            .filter(|id| !inner.inactive_users.contains(*id))
            .copied()
            .collect())
    }

    async fn list_eligible_ratings(
        &self,
        item: ItemKey,
        rater_ids: &[Uuid],
    ) -> AppResult<Vec<(Uuid, f64)>> {
        let inner = self.inner.read().await;
        Ok(rater_ids
            .iter()
            .filter_map(|rater_id| {
                inner
                    .ratings
                    .get(&(*rater_id, item))
                    .and_then(RatingRecord::eligible_score)
                    .map(|score| (*rater_id, score))
            })
            .collect())
    }

    async fn upsert_consensus_result(&self, result: &ConsensusResult) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .results
            .insert((result.viewer_id, result.item()), result.clone());
        Ok(())
    }

    async fn delete_consensus_result(&self, viewer_id: Uuid, item: ItemKey) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.results.remove(&(viewer_id, item));
        Ok(())
    }

    async fn list_consensus_results(&self, viewer_id: Uuid) -> AppResult<Vec<ConsensusResult>> {
        let inner = self.inner.read().await;
        let mut results: Vec<ConsensusResult> = inner
            .results
            .values()
            .filter(|r| r.viewer_id == viewer_id)
            .cloned()
            .collect();
        results.sort_by_key(ConsensusResult::item);
        Ok(results)
    }

    async fn delete_trust_weight(&self, viewer_id: Uuid, rater_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.trust_weights.remove(&(viewer_id, rater_id)).is_some())
    }

    async fn delete_trust_weights(&self, viewer_id: Uuid, rater_ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let removed = rater_ids
            .iter()
            .filter(|rater_id| inner.trust_weights.remove(&(viewer_id, **rater_id)).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn bulk_upsert_trust_weights(
        &self,
        viewer_id: Uuid,
        weights: &[(Uuid, Weight)],
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        for (rater_id, weight) in weights {
            inner.trust_weights.insert((viewer_id, *rater_id), *weight);
        }
        Ok(())
    }

    async fn list_viewers_trusting(&self, rater_id: Uuid) -> AppResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        let viewers: BTreeSet<Uuid> = inner
            .trust_weights
            .keys()
            .filter(|(_, rater)| *rater == rater_id)
            .map(|(viewer, _)| *viewer)
            .collect();
        Ok(viewers.into_iter().collect())
    }

    async fn list_rated_items(&self) -> AppResult<Vec<ItemKey>> {
        let inner = self.inner.read().await;
        let items: BTreeSet<ItemKey> = inner.ratings.keys().map(|(_, item)| *item).collect();
        Ok(items.into_iter().collect())
    }

    async fn upsert_rating(&self, record: &RatingRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .ratings
            .insert((record.rater_id, record.item), record.clone());
        Ok(())
    }

    async fn delete_rating(&self, rater_id: Uuid, item: ItemKey) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.ratings.remove(&(rater_id, item)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimension, Score};

    #[tokio::test]
    async fn test_eligible_ratings_skip_not_applicable_and_unlisted_raters() {
        let store = InMemoryStore::new();
        let item = ItemKey::new(Uuid::new_v4(), Dimension::Vegetarian);
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .upsert_rating(&RatingRecord::rated(alice, item, Score::new(8.0).unwrap()))
            .await
            .unwrap();
        store
            .upsert_rating(&RatingRecord::not_applicable(bob, item))
            .await
            .unwrap();
        store
            .upsert_rating(&RatingRecord::rated(carol, item, Score::new(3.0).unwrap()))
            .await
            .unwrap();

        let ratings = store.list_eligible_ratings(item, &[alice, bob]).await.unwrap();
        assert_eq!(ratings, vec![(alice, 8.0)]);
    }

    #[tokio::test]
    async fn test_rating_upsert_overwrites() {
        let store = InMemoryStore::new();
        let item = ItemKey::overall(Uuid::new_v4());
        let rater = Uuid::new_v4();

        for score in [4.0, 9.5] {
            store
                .upsert_rating(&RatingRecord::rated(rater, item, Score::new(score).unwrap()))
                .await
                .unwrap();
        }

        let ratings = store.list_eligible_ratings(item, &[rater]).await.unwrap();
        assert_eq!(ratings, vec![(rater, 9.5)]);
        assert_eq!(store.list_rated_items().await.unwrap(), vec![item]);
    }

    #[tokio::test]
    async fn test_inactive_users_filtered() {
        let store = InMemoryStore::new();
        let (active, inactive) = (Uuid::new_v4(), Uuid::new_v4());
        store.set_user_active(inactive, false).await;

        let ids = store.list_active_rater_ids(&[active, inactive]).await.unwrap();
        assert!(ids.contains(&active));
        assert!(!ids.contains(&inactive));
    }

    #[tokio::test]
    async fn test_trust_weight_lifecycle() {
        let store = InMemoryStore::new();
        let viewer = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .bulk_upsert_trust_weights(viewer, &[(a, Weight::new(2.0).unwrap()), (b, Weight::DEFAULT)])
            .await
            .unwrap();
        assert_eq!(store.list_trust_weights(viewer).await.unwrap().len(), 2);
        assert_eq!(store.list_viewers_trusting(a).await.unwrap(), vec![viewer]);

        assert!(store.delete_trust_weight(viewer, a).await.unwrap());
        assert!(!store.delete_trust_weight(viewer, a).await.unwrap());
        assert_eq!(store.delete_trust_weights(viewer, &[a, b]).await.unwrap(), 1);
        assert!(store.list_trust_weights(viewer).await.unwrap().is_empty());
    }
}
