use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{BatchSummary, ItemKey, LetterRating, RatingRecord},
    services::{consensus::ConsensusEngine, rating_codec},
};

/// Stores a rater's rating and refreshes every affected consensus score
///
/// `None` marks the item as not applicable to the rater; such a record is
/// kept but never aggregated.
pub async fn submit_rating(
    engine: &ConsensusEngine,
    rater_id: Uuid,
    item: ItemKey,
    rating: Option<LetterRating>,
) -> AppResult<(RatingRecord, BatchSummary)> {
    let record = match rating {
        Some(rating) => RatingRecord::rated(rater_id, item, rating_codec::encode(rating)),
        None => RatingRecord::not_applicable(rater_id, item),
    };

    engine.store().upsert_rating(&record).await?;

    tracing::info!(
        rater_id = %rater_id,
        item = %item,
        score = ?record.score.map(|s| s.value()),
        "Rating stored"
    );

    let summary = engine.refresh_audience(rater_id, item).await?;
    Ok((record, summary))
}

/// Removes a rater's rating and refreshes every affected consensus score
pub async fn retract_rating(
    engine: &ConsensusEngine,
    rater_id: Uuid,
    item: ItemKey,
) -> AppResult<BatchSummary> {
    if !engine.store().delete_rating(rater_id, item).await? {
        return Err(AppError::NotFound(format!(
            "No rating by {} for {}",
            rater_id, item
        )));
    }

    tracing::info!(rater_id = %rater_id, item = %item, "Rating retracted");

    engine.refresh_audience(rater_id, item).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConsensusStore, InMemoryStore};
    use crate::models::{Dimension, Weight};
    use crate::services::consensus::EngineSettings;
    use std::sync::Arc;

    fn engine(store: &InMemoryStore) -> ConsensusEngine {
        ConsensusEngine::new(Arc::new(store.clone()), EngineSettings::default())
    }

    #[tokio::test]
    async fn test_submit_encodes_and_refreshes() {
        let store = InMemoryStore::new();
        let engine = engine(&store);
        let (viewer, friend) = (Uuid::new_v4(), Uuid::new_v4());
        let item = ItemKey::overall(Uuid::new_v4());
        store
            .bulk_upsert_trust_weights(viewer, &[(friend, Weight::new(2.0).unwrap())])
            .await
            .unwrap();

        submit_rating(&engine, viewer, item, Some("A".parse().unwrap()))
            .await
            .unwrap();
        let (record, summary) = submit_rating(&engine, friend, item, Some("B+".parse().unwrap()))
            .await
            .unwrap();

        assert_eq!(record.score.unwrap().value(), 6.5);
        assert_eq!(summary.succeeded, 2);

        // (9.0 * 1.0 + 6.5 * 2.0) / 3.0
        let result = store.consensus_result(viewer, item).await.unwrap();
        assert_eq!(result.score, 7.33);
        assert_eq!(result.rating_count, 2);
        assert_eq!(result.confidence, 0.4);
    }

    #[tokio::test]
    async fn test_not_applicable_is_stored_but_not_aggregated() {
        let store = InMemoryStore::new();
        let engine = engine(&store);
        let rater = Uuid::new_v4();
        let item = ItemKey::new(Uuid::new_v4(), Dimension::NonVegetarian);

        let (record, summary) = submit_rating(&engine, rater, item, None).await.unwrap();
        assert!(!record.available);
        assert_eq!(summary.without_data, 1);
        assert_eq!(store.list_rated_items().await.unwrap(), vec![item]);
        assert_eq!(store.consensus_result(rater, item).await, None);
    }

    #[tokio::test]
    async fn test_retract_removes_result() {
        let store = InMemoryStore::new();
        let engine = engine(&store);
        let rater = Uuid::new_v4();
        let item = ItemKey::overall(Uuid::new_v4());

        submit_rating(&engine, rater, item, Some("C-".parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(store.consensus_result(rater, item).await.unwrap().score, 1.0);

        retract_rating(&engine, rater, item).await.unwrap();
        assert_eq!(store.consensus_result(rater, item).await, None);
    }

    #[tokio::test]
    async fn test_retract_missing_rating_is_not_found() {
        let store = InMemoryStore::new();
        let result = retract_rating(&engine(&store), Uuid::new_v4(), ItemKey::overall(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
