use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use parkspot_booking::SlotAvailability;
use parkspot_catalog::Quote;
use parkspot_core::{Floor, ParkingLot, SlotRef, TimeWindow, VehicleCategory};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LotSearchQuery {
    pub q: Option<String>,
}

/// Listing card: lot facts plus how many slots are free right now.
#[derive(Debug, Serialize)]
pub struct LotCard {
    pub id: String,
    pub name: String,
    pub location: String,
    pub price_per_hour: i64,
    pub currency: String,
    pub floors: usize,
    pub vehicle_categories: Vec<VehicleCategory>,
    pub available_slots: usize,
    pub total_slots: usize,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start: Option<DateTime<Utc>>,
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FloorAvailabilityResponse {
    pub lot_id: String,
    pub floor_id: String,
    pub window: TimeWindow,
    pub available: Vec<String>,
    pub slots: Vec<SlotAvailability>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub lot: String,
    pub floor: String,
    pub slot: String,
    pub hours: u32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lots", get(list_lots))
        .route("/lots/{lot_id}", get(get_lot))
        .route("/lots/{lot_id}/floors/{floor_id}", get(get_floor))
        .route("/lots/{lot_id}/floors/{floor_id}/availability", get(floor_availability))
        .route("/quote", get(quote))
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_lots(
    State(state): State<AppState>,
    Query(query): Query<LotSearchQuery>,
) -> Result<Json<Vec<LotCard>>, AppError> {
    let service = &state.service;
    let registry = service.registry();
    let lots: Vec<&ParkingLot> = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => registry.search(q),
        _ => registry.list_lots().iter().collect(),
    };

    let window = TimeWindow::starting_at(service.now(), state.business_rules.summary_window_hours)?;

    let mut cards = Vec::with_capacity(lots.len());
    for lot in lots {
        let summary = service.availability().lot_summary(&lot.id, &window).await?;
        cards.push(LotCard {
            id: lot.id.clone(),
            name: lot.name.clone(),
            location: lot.location.clone(),
            price_per_hour: lot.price_per_hour,
            currency: lot.currency.clone(),
            floors: lot.floors.len(),
            vehicle_categories: lot.vehicle_categories(),
            available_slots: summary.available,
            total_slots: summary.total,
        });
    }

    Ok(Json(cards))
}

async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
) -> Result<Json<ParkingLot>, AppError> {
    let lot = state.service.registry().get_lot(&lot_id)?;
    Ok(Json(lot.clone()))
}

async fn get_floor(
    State(state): State<AppState>,
    Path((lot_id, floor_id)): Path<(String, String)>,
) -> Result<Json<Floor>, AppError> {
    let floor = state.service.registry().get_floor(&lot_id, &floor_id)?;
    Ok(Json(floor.clone()))
}

/// Slot grid for a floor. Defaults to a one hour window starting now.
async fn floor_availability(
    State(state): State<AppState>,
    Path((lot_id, floor_id)): Path<(String, String)>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<FloorAvailabilityResponse>, AppError> {
    let service = &state.service;
    let start = query.start.unwrap_or_else(|| service.now());
    let window = TimeWindow::starting_at(start, query.hours.unwrap_or(1))?;

    let slots = service.availability().floor_grid(&lot_id, &floor_id, &window).await?;
    let available = slots
        .iter()
        .filter(|cell| cell.available)
        .map(|cell| cell.slot.id.clone())
        .collect();

    Ok(Json(FloorAvailabilityResponse {
        lot_id,
        floor_id,
        window,
        available,
        slots,
    }))
}

async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, AppError> {
    let slot = SlotRef::new(query.lot, query.floor, query.slot);
    let quote = state.service.quote(&slot, query.hours)?;
    Ok(Json(quote))
}
