use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use coachline_booking::{BookingReceipt, CreateBookingRequest};
use coachline_core::Booking;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/status", post(update_status))
        .route("/v1/bookings/{id}/confirm/parent", post(confirm_parent))
        .route("/v1/bookings/{id}/confirm/trainer", post(confirm_trainer))
}

async fn create_booking(
    State(state): State<AppState>,
    actor: Actor,
    Json(mut req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    // Parents book for themselves; admins and the SMS bot may book for anyone.
    if !actor.is_admin() {
        match req.parent_id {
            None => req.parent_id = Some(actor.id),
            Some(parent_id) if parent_id != actor.id => {
                return Err(AppError::AuthorizationError(
                    "Cannot book on behalf of another parent".to_string(),
                ))
            }
            Some(_) => {}
        }
    }

    let receipt = state.lifecycle.create(req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_booking(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.lifecycle.get(id).await?;
    actor.ensure_any_of(&[booking.parent_id, Some(booking.trainer_id)])?;
    Ok(Json(booking))
}

async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.lifecycle.get(id).await?;
    actor.ensure_any_of(&[booking.parent_id, Some(booking.trainer_id)])?;

    let booking = state
        .lifecycle
        .update_status_str(id, &req.status, Some(actor.id))
        .await?;
    info!("Booking {} set to {} by {}", booking.booking_number, booking.status, actor.id);
    Ok(Json(booking))
}

async fn confirm_parent(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.lifecycle.confirm_by_parent(id, actor.id).await?))
}

async fn confirm_trainer(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.lifecycle.confirm_by_trainer(id, actor.id).await?))
}
