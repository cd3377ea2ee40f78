use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    db::ConsensusStore,
    error::{AppError, AppResult},
    models::{TrustWeight, TrustWeightEntry, Weight},
};

/// Validates a whole batch before anything is written
///
/// Rejects out-of-range weights, edges from a viewer to themself (the viewer
/// always counts with weight 1.0) and raters listed more than once.
fn validate_entries(viewer_id: Uuid, entries: &[TrustWeightEntry]) -> AppResult<Vec<(Uuid, Weight)>> {
    let mut seen = HashSet::with_capacity(entries.len());

    entries
        .iter()
        .map(|entry| {
            if entry.rater_id == viewer_id {
                return Err(AppError::InvalidInput(
                    "A viewer cannot assign a trust weight to themself".to_string(),
                ));
            }
            if !seen.insert(entry.rater_id) {
                return Err(AppError::InvalidInput(format!(
                    "Rater {} appears more than once",
                    entry.rater_id
                )));
            }
            Ok((entry.rater_id, Weight::new(entry.weight)?))
        })
        .collect()
}

/// Lists the viewer's explicit trust weights
pub async fn list_trust_weights(
    store: &dyn ConsensusStore,
    viewer_id: Uuid,
) -> AppResult<Vec<TrustWeight>> {
    let mut weights: Vec<TrustWeight> = store
        .list_trust_weights(viewer_id)
        .await?
        .into_iter()
        .map(|(rater_id, weight)| TrustWeight {
            viewer_id,
            rater_id,
            weight,
        })
        .collect();
    weights.sort_by_key(|w| w.rater_id);
    Ok(weights)
}

/// Creates or updates one trust weight
pub async fn set_trust_weight(
    store: &dyn ConsensusStore,
    viewer_id: Uuid,
    rater_id: Uuid,
    weight: f64,
) -> AppResult<TrustWeight> {
    let validated = validate_entries(viewer_id, &[TrustWeightEntry { rater_id, weight }])?;
    store.bulk_upsert_trust_weights(viewer_id, &validated).await?;

    tracing::info!(viewer_id = %viewer_id, rater_id = %rater_id, weight, "Trust weight set");

    Ok(TrustWeight {
        viewer_id,
        rater_id,
        weight: validated[0].1,
    })
}

/// Creates or updates several trust weights in one atomic write
pub async fn bulk_upsert_trust_weights(
    store: &dyn ConsensusStore,
    viewer_id: Uuid,
    entries: &[TrustWeightEntry],
) -> AppResult<usize> {
    let validated = validate_entries(viewer_id, entries)?;
    store.bulk_upsert_trust_weights(viewer_id, &validated).await?;

    tracing::info!(viewer_id = %viewer_id, count = validated.len(), "Trust weights upserted");

    Ok(validated.len())
}

/// Removes one trust weight. Errors with `NotFound` if none existed.
pub async fn delete_trust_weight(
    store: &dyn ConsensusStore,
    viewer_id: Uuid,
    rater_id: Uuid,
) -> AppResult<()> {
    if !store.delete_trust_weight(viewer_id, rater_id).await? {
        return Err(AppError::NotFound(format!(
            "No trust weight from {} to {}",
            viewer_id, rater_id
        )));
    }

    tracing::info!(viewer_id = %viewer_id, rater_id = %rater_id, "Trust weight deleted");
    Ok(())
}

/// Removes several trust weights, returning how many existed
pub async fn delete_trust_weights(
    store: &dyn ConsensusStore,
    viewer_id: Uuid,
    rater_ids: &[Uuid],
) -> AppResult<u64> {
    if rater_ids.is_empty() {
        return Ok(0);
    }

    let removed = store.delete_trust_weights(viewer_id, rater_ids).await?;
    tracing::info!(viewer_id = %viewer_id, requested = rater_ids.len(), removed, "Trust weights deleted");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, MockConsensusStore};

    fn entry(rater_id: Uuid, weight: f64) -> TrustWeightEntry {
        TrustWeightEntry { rater_id, weight }
    }

    #[tokio::test]
    async fn test_set_and_list() {
        let store = InMemoryStore::new();
        let (viewer, rater) = (Uuid::new_v4(), Uuid::new_v4());

        let saved = set_trust_weight(&store, viewer, rater, 1.5).await.unwrap();
        assert_eq!(saved.weight.value(), 1.5);

        // Upsert replaces rather than duplicating
        set_trust_weight(&store, viewer, rater, 0.5).await.unwrap();
        let weights = list_trust_weights(&store, viewer).await.unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].weight.value(), 0.5);
    }

    #[tokio::test]
    async fn test_out_of_range_weight_rejected() {
        let store = InMemoryStore::new();
        let result = set_trust_weight(&store, Uuid::new_v4(), Uuid::new_v4(), 2.5).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_self_weight_rejected() {
        let store = InMemoryStore::new();
        let viewer = Uuid::new_v4();
        let result = set_trust_weight(&store, viewer, viewer, 1.0).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_invalid_bulk_batch_writes_nothing() {
        let mut store = MockConsensusStore::new();
        store.expect_bulk_upsert_trust_weights().never();

        let viewer = Uuid::new_v4();
        let rater = Uuid::new_v4();

        let out_of_range = [entry(Uuid::new_v4(), 1.0), entry(Uuid::new_v4(), -0.5)];
        assert!(bulk_upsert_trust_weights(&store, viewer, &out_of_range).await.is_err());

        let duplicated = [entry(rater, 1.0), entry(rater, 2.0)];
        assert!(bulk_upsert_trust_weights(&store, viewer, &duplicated).await.is_err());
    }

    #[tokio::test]
    async fn test_bulk_upsert() {
        let store = InMemoryStore::new();
        let viewer = Uuid::new_v4();
        let entries = [entry(Uuid::new_v4(), 0.0), entry(Uuid::new_v4(), 2.0)];

        assert_eq!(bulk_upsert_trust_weights(&store, viewer, &entries).await.unwrap(), 2);
        assert_eq!(list_trust_weights(&store, viewer).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_weight_is_not_found() {
        let store = InMemoryStore::new();
        let result = delete_trust_weight(&store, Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_delete_counts_existing() {
        let store = InMemoryStore::new();
        let viewer = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        set_trust_weight(&store, viewer, a, 1.0).await.unwrap();

        assert_eq!(delete_trust_weights(&store, viewer, &[a, b]).await.unwrap(), 1);
        assert_eq!(delete_trust_weights(&store, viewer, &[]).await.unwrap(), 0);
    }
}
