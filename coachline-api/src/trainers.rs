use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use coachline_core::TrainerScore;
use coachline_scoring::ReviewRequest;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trainers/{id}/score", get(get_score))
        .route("/v1/trainers/{id}/score/recompute", post(recompute))
        .route("/v1/trainers/{id}/reviews", post(submit_review))
}

async fn get_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrainerScore>, AppError> {
    Ok(Json(state.scorer.current_score(id).await?))
}

async fn recompute(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TrainerScore>, AppError> {
    if !actor.is_admin() {
        return Err(AppError::AuthorizationError(
            "Only admins can force a recompute".to_string(),
        ));
    }
    Ok(Json(state.scorer.compute_composite(id).await?))
}

async fn submit_review(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<TrainerScore>), AppError> {
    let score = state.scorer.submit_review(id, Some(actor.id), req).await?;
    Ok((StatusCode::CREATED, Json(score)))
}
