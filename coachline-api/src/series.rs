use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use coachline_booking::{
    CancelReport, ConflictPreview, CreateSeriesRequest, GenerationReport, PreviewRequest,
    SeriesCreation,
};
use coachline_core::RecurringSeries;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct GenerateRequest {
    window: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CancelRequest {
    future_only: Option<bool>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/series", post(create_series))
        .route("/v1/series/preview", post(preview))
        .route("/v1/series/{id}/generate", post(generate))
        .route("/v1/series/{id}/pause", post(pause))
        .route("/v1/series/{id}/cancel", post(cancel))
}

async fn create_series(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateSeriesRequest>,
) -> Result<(StatusCode, Json<SeriesCreation>), AppError> {
    actor.ensure_any_of(&[Some(req.parent_id)])?;
    let created = state.engine.create_series(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn preview(
    State(state): State<AppState>,
    _actor: Actor,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<ConflictPreview>, AppError> {
    Ok(Json(state.engine.conflict_preview(req).await?))
}

async fn generate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    req: Option<Json<GenerateRequest>>,
) -> Result<Json<GenerationReport>, AppError> {
    let series = state.engine.get(id).await?;
    actor.ensure_any_of(&[Some(series.parent_id), Some(series.trainer_id)])?;

    let window = req
        .and_then(|Json(r)| r.window)
        .unwrap_or(state.engine.default_window());
    Ok(Json(state.engine.generate_upcoming(id, window).await?))
}

async fn pause(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<RecurringSeries>, AppError> {
    Ok(Json(state.engine.pause(id, Some(actor.id).filter(|_| !actor.is_admin())).await?))
}

async fn cancel(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    req: Option<Json<CancelRequest>>,
) -> Result<Json<CancelReport>, AppError> {
    let future_only = req.and_then(|Json(r)| r.future_only).unwrap_or(true);
    let acting = Some(actor.id).filter(|_| !actor.is_admin());
    Ok(Json(state.engine.cancel(id, future_only, acting).await?))
}
