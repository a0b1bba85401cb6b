use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use parkspot_booking::{ReservationHistory, ReserveRequest};
use parkspot_core::{OwnerId, Reservation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::customer_auth_middleware, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub lot_id: String,
    pub floor_id: String,
    pub slot_id: String,
    pub start: DateTime<Utc>,
    pub duration_hours: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub view: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReservationsView {
    All(Vec<Reservation>),
    History(ReservationHistory),
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route("/reservations/{id}", get(get_reservation).delete(cancel_reservation))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware))
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_reservation(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state
        .service
        .reserve(ReserveRequest {
            lot_id: req.lot_id,
            floor_id: req.floor_id,
            slot_id: req.slot_id,
            owner,
            start: req.start,
            duration_hours: req.duration_hours,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Newest first, or `?view=history` for the upcoming/past split.
async fn list_reservations(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ReservationsView>, AppError> {
    match query.view.as_deref() {
        None | Some("all") => Ok(Json(ReservationsView::All(
            state.service.list_reservations(&owner).await?,
        ))),
        Some("history") => Ok(Json(ReservationsView::History(state.service.history(&owner).await?))),
        Some(other) => Err(AppError::ValidationError(format!("Unknown view '{}'", other))),
    }
}

async fn get_reservation(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.service.get_reservation(id, &owner).await?))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.service.cancel(id, &owner).await?))
}
