use std::collections::HashSet;

use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::ConsensusStore,
    error::{AppError, AppResult},
    models::{ConsensusResult, Dimension, ItemKey, RatingRecord, Weight},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL implementation of [`ConsensusStore`]
#[derive(Clone)]
pub struct PgConsensusStore {
    pool: PgPool,
}

impl PgConsensusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ConsensusRow = (Uuid, Uuid, String, f64, i32, f64);

fn result_from_row(row: ConsensusRow) -> AppResult<ConsensusResult> {
    let (viewer_id, item_id, dimension, score, rating_count, confidence) = row;
    let rating_count = u32::try_from(rating_count)
        .map_err(|_| AppError::Internal(format!("Negative rating count {}", rating_count)))?;

    Ok(ConsensusResult {
        viewer_id,
        item_id,
        dimension: dimension.parse()?,
        score,
        rating_count,
        confidence,
    })
}

#[async_trait::async_trait]
impl ConsensusStore for PgConsensusStore {
    async fn list_trust_weights(&self, viewer_id: Uuid) -> AppResult<Vec<(Uuid, Weight)>> {
        let rows: Vec<(Uuid, f64)> = sqlx::query_as(
            r#"
            SELECT rater_id, weight
            FROM trust_weights
            WHERE viewer_id = $1
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(rater_id, weight)| Ok((rater_id, Weight::new(weight)?)))
            .collect()
    }

    async fn list_active_rater_ids(&self, rater_ids: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        if rater_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM users
            WHERE id = ANY($1) AND active = true
            "#,
        )
        .bind(rater_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_eligible_ratings(
        &self,
        item: ItemKey,
        rater_ids: &[Uuid],
    ) -> AppResult<Vec<(Uuid, f64)>> {
        let rows: Vec<(Uuid, f64)> = sqlx::query_as(
            r#"
            SELECT rater_id, score
            FROM ratings
            WHERE item_id = $1
              AND dimension = $2
              AND rater_id = ANY($3)
              AND available = true
              AND score IS NOT NULL
            ORDER BY rater_id
            "#,
        )
        .bind(item.item_id)
        .bind(item.dimension.as_str())
        .bind(rater_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn upsert_consensus_result(&self, result: &ConsensusResult) -> AppResult<()> {
        let rating_count = i32::try_from(result.rating_count)
            .map_err(|_| AppError::Internal(format!("Rating count {} overflows", result.rating_count)))?;

        sqlx::query(
            r#"
            INSERT INTO consensus_results
                (viewer_id, item_id, dimension, score, rating_count, confidence, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (viewer_id, item_id, dimension) DO UPDATE
            SET score = EXCLUDED.score,
                rating_count = EXCLUDED.rating_count,
                confidence = EXCLUDED.confidence,
                updated_at = NOW()
            "#,
        )
        .bind(result.viewer_id)
        .bind(result.item_id)
        .bind(result.dimension.as_str())
        .bind(result.score)
        .bind(rating_count)
        .bind(result.confidence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_consensus_result(&self, viewer_id: Uuid, item: ItemKey) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM consensus_results
            WHERE viewer_id = $1 AND item_id = $2 AND dimension = $3
            "#,
        )
        .bind(viewer_id)
        .bind(item.item_id)
        .bind(item.dimension.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_consensus_results(&self, viewer_id: Uuid) -> AppResult<Vec<ConsensusResult>> {
        let rows: Vec<ConsensusRow> = sqlx::query_as(
            r#"
            SELECT viewer_id, item_id, dimension, score, rating_count, confidence
            FROM consensus_results
            WHERE viewer_id = $1
            ORDER BY item_id, dimension
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(result_from_row).collect()
    }

    async fn delete_trust_weight(&self, viewer_id: Uuid, rater_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM trust_weights
            WHERE viewer_id = $1 AND rater_id = $2
            "#,
        )
        .bind(viewer_id)
        .bind(rater_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_trust_weights(&self, viewer_id: Uuid, rater_ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM trust_weights
            WHERE viewer_id = $1 AND rater_id = ANY($2)
            "#,
        )
        .bind(viewer_id)
        .bind(rater_ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn bulk_upsert_trust_weights(
        &self,
        viewer_id: Uuid,
        weights: &[(Uuid, Weight)],
    ) -> AppResult<()> {
        if weights.is_empty() {
            return Ok(());
        }

        let (rater_ids, values): (Vec<Uuid>, Vec<f64>) = weights
            .iter()
            .map(|(rater_id, weight)| (*rater_id, weight.value()))
            .unzip();

        sqlx::query(
            r#"
            INSERT INTO trust_weights (viewer_id, rater_id, weight)
            SELECT $1, rater_id, weight
            FROM UNNEST($2::uuid[], $3::float8[]) AS t (rater_id, weight)
            ON CONFLICT (viewer_id, rater_id) DO UPDATE
            SET weight = EXCLUDED.weight
            "#,
        )
        .bind(viewer_id)
        .bind(rater_ids)
        .bind(values)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_viewers_trusting(&self, rater_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT viewer_id
            FROM trust_weights
            WHERE rater_id = $1
            ORDER BY viewer_id
            "#,
        )
        .bind(rater_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_rated_items(&self) -> AppResult<Vec<ItemKey>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT DISTINCT item_id, dimension
            FROM ratings
            ORDER BY item_id, dimension
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(item_id, dimension)| Ok(ItemKey::new(item_id, dimension.parse::<Dimension>()?)))
            .collect()
    }

    async fn upsert_rating(&self, record: &RatingRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (rater_id, item_id, dimension, score, available, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (rater_id, item_id, dimension) DO UPDATE
            SET score = EXCLUDED.score,
                available = EXCLUDED.available,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.rater_id)
        .bind(record.item.item_id)
        .bind(record.item.dimension.as_str())
        .bind(record.score.map(|s| s.value()))
        .bind(record.available)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_rating(&self, rater_id: Uuid, item: ItemKey) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM ratings
            WHERE rater_id = $1 AND item_id = $2 AND dimension = $3
            "#,
        )
        .bind(rater_id)
        .bind(item.item_id)
        .bind(item.dimension.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
