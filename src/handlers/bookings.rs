use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::booking::{self, DirectBooking};
use crate::services::now;
use crate::state::AppState;

use super::check_auth;

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    dealer_id: i64,
    customer_id: i64,
    vehicle_id: i64,
    schedule_time: String,
    slot_id: Option<String>,
    status: String,
    note: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            dealer_id: b.dealer_id,
            customer_id: b.customer_id,
            vehicle_id: b.vehicle_id,
            schedule_time: b.schedule_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            slot_id: b.slot_id,
            status: b.status.as_str().to_string(),
            note: b.note,
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn to_responses(bookings: Vec<Booking>) -> Vec<BookingResponse> {
    bookings.into_iter().map(BookingResponse::from).collect()
}

fn parse_status(raw: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(raw).ok_or_else(|| AppError::Validation(format!("unknown status: {raw}")))
}

// POST /api/slots/:slot_id/bookings
#[derive(Deserialize)]
pub struct BookSlotRequest {
    pub customer_id: i64,
    pub vehicle_id: i64,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn book_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Json(body): Json<BookSlotRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = {
        let db = state.conn()?;
        booking::book_slot(&db, &slot_id, body.customer_id, body.vehicle_id, body.note)?
    };
    Ok((StatusCode::CREATED, Json(booking.into())))
}

// POST /api/bookings
pub async fn book_direct(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DirectBooking>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = {
        let db = state.conn()?;
        booking::book_direct(&db, body)?
    };
    Ok((StatusCode::CREATED, Json(booking.into())))
}

// POST /api/dealers/:dealer_id/bookings
#[derive(Deserialize)]
pub struct StaffBookingRequest {
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub schedule_time: NaiveDateTime,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn staff_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(dealer_id): Path<i64>,
    Json(body): Json<StaffBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let request = DirectBooking {
        dealer_id,
        customer_id: body.customer_id,
        vehicle_id: body.vehicle_id,
        schedule_time: body.schedule_time,
        note: body.note,
    };
    let booking = {
        let db = state.conn()?;
        booking::book_direct_by_staff(&db, request)?
    };
    Ok((StatusCode::CREATED, Json(booking.into())))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = {
        let db = state.conn()?;
        booking::get_booking(&db, &id)?
    };
    Ok(Json(booking.into()))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;
    let status = parse_status(&body.status)?;

    let booking = {
        let db = state.conn()?;
        booking::update_booking_status(&db, &id, status)?
    };
    Ok(Json(booking.into()))
}

// GET /api/slots/:slot_id/bookings
pub async fn slot_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slot_id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let bookings = {
        let db = state.conn()?;
        if queries::get_slot_by_id(&db, &slot_id)?.is_none() {
            return Err(AppError::NotFound(format!("slot {slot_id}")));
        }
        booking::get_bookings_by_slot_id(&db, &slot_id)?
    };
    Ok(Json(to_responses(bookings)))
}

// GET /api/customers/:customer_id/bookings
#[derive(Serialize)]
pub struct CustomerBookingsResponse {
    has_active_booking: bool,
    bookings: Vec<BookingResponse>,
}

pub async fn customer_bookings(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
) -> Result<Json<CustomerBookingsResponse>, AppError> {
    let (has_active_booking, bookings) = {
        let db = state.conn()?;
        (
            booking::has_active_booking(&db, customer_id)?,
            queries::get_bookings_by_customer(&db, customer_id)?,
        )
    };
    Ok(Json(CustomerBookingsResponse {
        has_active_booking,
        bookings: to_responses(bookings),
    }))
}

// GET /api/dealers/:dealer_id/bookings
#[derive(Deserialize)]
pub struct DealerBookingsQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    /// Confirmed bookings still ahead of now; overrides `date` and `status`.
    #[serde(default)]
    pub upcoming: bool,
}

pub async fn dealer_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(dealer_id): Path<i64>,
    Query(query): Query<DealerBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;
    let status = query.status.as_deref().map(parse_status).transpose()?;

    let bookings = {
        let db = state.conn()?;
        if query.upcoming {
            let upcoming = queries::get_upcoming_bookings(&db, dealer_id, &now())?;
            return Ok(Json(to_responses(upcoming)));
        }
        match (query.date, status) {
            (Some(date), status) => {
                let mut day = queries::get_bookings_by_dealer_and_date(&db, dealer_id, &date)?;
                if let Some(status) = status {
                    day.retain(|b| b.status == status);
                }
                day
            }
            (None, Some(status)) => queries::get_bookings_by_status(&db, status, Some(dealer_id))?,
            (None, None) => queries::get_bookings_by_dealer(&db, dealer_id)?,
        }
    };
    Ok(Json(to_responses(bookings)))
}
