use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Dimension, ItemKey};

/// Personalized consensus score of one item for one viewer
///
/// Rows only exist when at least one eligible rating contributed, so the
/// score is always present. A missing row means "no data".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusResult {
    pub viewer_id: Uuid,
    pub item_id: Uuid,
    pub dimension: Dimension,
    /// Weighted score, rounded to two decimal places
    pub score: f64,
    /// Number of ratings that contributed to the score
    pub rating_count: u32,
    /// Sample-size confidence in [0.0, 1.0]
    pub confidence: f64,
}

impl ConsensusResult {
    pub fn item(&self) -> ItemKey {
        ItemKey::new(self.item_id, self.dimension)
    }
}

/// A single (viewer, item) recomputation that failed inside a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFailure {
    pub viewer_id: Uuid,
    pub item_id: Uuid,
    pub dimension: Dimension,
    pub error: String,
}

/// Outcome of a batch recalculation
///
/// `succeeded` counts every item processed without error, including items
/// that turned out to have no eligible ratings (`without_data`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub without_data: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchSummary {
    pub fn record_success(&mut self, produced_result: bool) {
        self.total += 1;
        self.succeeded += 1;
        if !produced_result {
            self.without_data += 1;
        }
    }

    pub fn record_failure(&mut self, viewer_id: Uuid, item: ItemKey, error: String) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(ItemFailure {
            viewer_id,
            item_id: item.item_id,
            dimension: item.dimension,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let viewer_id = Uuid::new_v4();
        let item = ItemKey::overall(Uuid::new_v4());

        let mut summary = BatchSummary::default();
        summary.record_success(true);
        summary.record_success(false);
        summary.record_failure(viewer_id, item, "connection reset".to_string());

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.without_data, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].item_id, item.item_id);
    }
}
