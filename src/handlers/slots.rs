use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Slot;
use crate::services::{availability, slots, today};
use crate::state::AppState;

use super::check_auth;

#[derive(Serialize)]
pub struct SlotResponse {
    id: String,
    dealer_id: i64,
    date: String,
    start_time: String,
    end_time: String,
    max_capacity: i64,
    status: String,
    available_vehicle_ids: Vec<i64>,
    current_booking_count: i64,
    remaining_capacity: i64,
    is_full: bool,
    created_at: String,
}

impl From<Slot> for SlotResponse {
    fn from(s: Slot) -> Self {
        Self {
            is_full: s.is_full(),
            remaining_capacity: s.remaining_capacity(),
            id: s.id,
            dealer_id: s.dealer_id,
            date: s.date.format("%Y-%m-%d").to_string(),
            start_time: s.start_time,
            end_time: s.end_time,
            max_capacity: s.max_capacity,
            status: s.status,
            available_vehicle_ids: s.available_vehicle_ids,
            current_booking_count: s.current_booking_count,
            created_at: s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<NaiveDate>,
}

// GET /api/dealers/:dealer_id/slots
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(dealer_id): Path<i64>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let date = query.date.unwrap_or_else(today);
    let slots = {
        let db = state.conn()?;
        availability::list_slots(&db, dealer_id, date)?
    };
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

// GET /api/dealers/:dealer_id/slots/available
pub async fn list_available_slots(
    State(state): State<Arc<AppState>>,
    Path(dealer_id): Path<i64>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let date = query.date.unwrap_or_else(today);
    let slots = {
        let db = state.conn()?;
        availability::list_available_slots(&db, dealer_id, date)?
    };
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

// GET /api/slots/:slot_id
#[derive(Serialize)]
pub struct SlotDetailResponse {
    #[serde(flatten)]
    slot: SlotResponse,
    bookable: bool,
}

pub async fn get_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<Json<SlotDetailResponse>, AppError> {
    let (slot, bookable) = {
        let db = state.conn()?;
        let slot = availability::get_slot_by_id(&db, &slot_id)?
            .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))?;
        (slot, availability::is_bookable(&db, &slot_id)?)
    };

    Ok(Json(SlotDetailResponse {
        slot: slot.into(),
        bookable,
    }))
}

// POST /api/dealers/:dealer_id/slots
#[derive(Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub max_capacity: i64,
    #[serde(default)]
    pub vehicle_ids: Vec<i64>,
}

pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(dealer_id): Path<i64>,
    Json(body): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<SlotResponse>), AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let slot = {
        let db = state.conn()?;
        slots::create_slot(
            &db,
            slots::NewSlot {
                dealer_id,
                date: body.date,
                start_time: body.start_time,
                end_time: body.end_time,
                max_capacity: body.max_capacity,
                vehicle_ids: body.vehicle_ids,
            },
        )?
    };

    Ok((StatusCode::CREATED, Json(slot.into())))
}

// DELETE /api/dealers/:dealer_id/slots/:slot_id
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((dealer_id, slot_id)): Path<(i64, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    {
        let db = state.conn()?;
        slots::delete_dealer_slot(&db, dealer_id, &slot_id)?;
    }

    Ok(Json(serde_json::json!({"ok": true})))
}
