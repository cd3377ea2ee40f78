use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Trust weights
        .route(
            "/viewers/:viewer_id/trust-weights",
            get(handlers::list_trust_weights)
                .put(handlers::upsert_trust_weights)
                .delete(handlers::delete_trust_weights),
        )
        .route(
            "/viewers/:viewer_id/trust-weights/:rater_id",
            put(handlers::set_trust_weight).delete(handlers::delete_trust_weight),
        )
        // Ratings
        .route(
            "/items/:item_id/ratings/:rater_id",
            put(handlers::submit_rating).delete(handlers::retract_rating),
        )
        .route("/ratings/scale", get(handlers::rating_scale))
        .route("/ratings/label", get(handlers::score_label))
        // Consensus scores
        .route("/viewers/:viewer_id/scores", get(handlers::list_scores))
        .route(
            "/viewers/:viewer_id/recalculate",
            post(handlers::recalculate_viewer),
        )
        .route(
            "/viewers/:viewer_id/items/:item_id/recalculate",
            post(handlers::recalculate_item),
        )
}
