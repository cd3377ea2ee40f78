use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::ConsensusStore,
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        BatchSummary, ConsensusResult, Dimension, ItemKey, LetterRating, RatingRecord, TrustWeight,
        TrustWeightEntry,
    },
    services::{
        rating_codec::{self, ScoreLabel},
        ratings, trust_weights,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct DimensionQuery {
    #[serde(default)]
    pub dimension: Dimension,
}

#[derive(Debug, Deserialize)]
pub struct SetWeightRequest {
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteWeightsRequest {
    pub rater_ids: Vec<Uuid>,
}

/// A letter rating such as `"B+"`; an explicit `null` marks the item as not
/// applicable. The field itself is required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitRatingRequest {
    #[serde(default)]
    pub dimension: Dimension,
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from a missing field
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct SubmitRatingResponse {
    pub rating: RatingRecord,
    pub label: ScoreLabel,
    pub refreshed: BatchSummary,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub item_id: Uuid,
    pub dimension: Dimension,
    pub score: f64,
    pub label: ScoreLabel,
    pub rating_count: u32,
    pub confidence: f64,
}

impl From<&ConsensusResult> for ScoreResponse {
    fn from(result: &ConsensusResult) -> Self {
        Self {
            item_id: result.item_id,
            dimension: result.dimension,
            score: result.score,
            label: rating_codec::display(Some(result.score)),
            rating_count: result.rating_count,
            confidence: result.confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LabelQuery {
    pub score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ScaleEntry {
    pub label: String,
    pub score: f64,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// List a viewer's explicit trust weights
pub async fn list_trust_weights(
    State(state): State<AppState>,
    Path(viewer_id): Path<Uuid>,
) -> AppResult<Json<Vec<TrustWeight>>> {
    let weights = trust_weights::list_trust_weights(state.store(), viewer_id).await?;
    Ok(Json(weights))
}

/// Create or update several trust weights at once
pub async fn upsert_trust_weights(
    State(state): State<AppState>,
    Path(viewer_id): Path<Uuid>,
    Json(entries): Json<Vec<TrustWeightEntry>>,
) -> AppResult<Json<Value>> {
    let upserted =
        trust_weights::bulk_upsert_trust_weights(state.store(), viewer_id, &entries).await?;
    Ok(Json(json!({ "upserted": upserted })))
}

/// Remove several trust weights at once
pub async fn delete_trust_weights(
    State(state): State<AppState>,
    Path(viewer_id): Path<Uuid>,
    Json(request): Json<DeleteWeightsRequest>,
) -> AppResult<Json<Value>> {
    let deleted =
        trust_weights::delete_trust_weights(state.store(), viewer_id, &request.rater_ids).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Create or update one trust weight
pub async fn set_trust_weight(
    State(state): State<AppState>,
    Path((viewer_id, rater_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SetWeightRequest>,
) -> AppResult<Json<TrustWeight>> {
    let weight =
        trust_weights::set_trust_weight(state.store(), viewer_id, rater_id, request.weight).await?;
    Ok(Json(weight))
}

/// Remove one trust weight
pub async fn delete_trust_weight(
    State(state): State<AppState>,
    Path((viewer_id, rater_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    trust_weights::delete_trust_weight(state.store(), viewer_id, rater_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit or overwrite a rating, refreshing affected consensus scores
pub async fn submit_rating(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((item_id, rater_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SubmitRatingRequest>,
) -> AppResult<Json<SubmitRatingResponse>> {
    let rating = request.rating.ok_or_else(|| {
        AppError::InvalidInput("`rating` is required; send null for not applicable".to_string())
    })?;
    let rating = rating.as_deref().map(str::parse::<LetterRating>).transpose()?;
    let item = ItemKey::new(item_id, request.dimension);

    tracing::info!(
        request_id = %request_id,
        rater_id = %rater_id,
        item = %item,
        "Processing rating submission"
    );

    let (record, refreshed) = ratings::submit_rating(&state.engine, rater_id, item, rating).await?;
    let label = rating_codec::display(record.score.map(|s| s.value()));

    Ok(Json(SubmitRatingResponse {
        rating: record,
        label,
        refreshed,
    }))
}

/// Retract a rating, refreshing affected consensus scores
pub async fn retract_rating(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((item_id, rater_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<DimensionQuery>,
) -> AppResult<Json<BatchSummary>> {
    let item = ItemKey::new(item_id, query.dimension);

    tracing::info!(
        request_id = %request_id,
        rater_id = %rater_id,
        item = %item,
        "Processing rating retraction"
    );

    let summary = ratings::retract_rating(&state.engine, rater_id, item).await?;
    Ok(Json(summary))
}

/// Recalculate every consensus score for a viewer
pub async fn recalculate_viewer(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(viewer_id): Path<Uuid>,
) -> AppResult<Json<BatchSummary>> {
    tracing::info!(
        request_id = %request_id,
        viewer_id = %viewer_id,
        "Processing recalculation request"
    );

    let summary = state.engine.recalculate_for_viewer(viewer_id).await?;
    Ok(Json(summary))
}

/// Recalculate a viewer's consensus score for one item; `null` when no data
pub async fn recalculate_item(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((viewer_id, item_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<DimensionQuery>,
) -> AppResult<Json<Option<ScoreResponse>>> {
    let item = ItemKey::new(item_id, query.dimension);

    tracing::info!(
        request_id = %request_id,
        viewer_id = %viewer_id,
        item = %item,
        "Processing item recalculation request"
    );

    let result = state.engine.recalculate_item(viewer_id, item).await?;
    Ok(Json(result.as_ref().map(ScoreResponse::from)))
}

/// List a viewer's stored consensus scores
pub async fn list_scores(
    State(state): State<AppState>,
    Path(viewer_id): Path<Uuid>,
) -> AppResult<Json<Vec<ScoreResponse>>> {
    let results = state.store().list_consensus_results(viewer_id).await?;
    Ok(Json(results.iter().map(ScoreResponse::from).collect()))
}

/// Display label for an arbitrary aggregate score
pub async fn score_label(Query(query): Query<LabelQuery>) -> Json<Value> {
    Json(json!({ "label": rating_codec::display(query.score) }))
}

/// The full letter rating scale with stored scores
pub async fn rating_scale() -> Json<Vec<ScaleEntry>> {
    let scale = LetterRating::all()
        .map(|rating| ScaleEntry {
            label: rating.to_string(),
            score: rating_codec::encode(rating).value(),
        })
        .collect();
    Json(scale)
}
