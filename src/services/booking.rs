use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, Conflict};
use crate::models::{Booking, BookingStatus, Slot};

use super::{now, today};

/// Reserve `vehicle_id` in a slot for a customer.
///
/// Checks run in a fixed order and the first failure wins:
/// active booking, slot exists, slot full, slot expired, vehicle offered,
/// vehicle already booked. Checks and insert share one IMMEDIATE transaction,
/// so concurrent callers cannot both pass the capacity check.
pub fn book_slot(
    conn: &Connection,
    slot_id: &str,
    customer_id: i64,
    vehicle_id: i64,
    note: Option<String>,
) -> Result<Booking, AppError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let result = check_slot_booking(&tx, slot_id, customer_id, vehicle_id).and_then(|slot| {
        let booking = new_slot_booking(&slot, customer_id, vehicle_id, note);
        insert_booking(&tx, &booking)?;
        Ok(booking)
    });

    let booking = match result {
        Ok(booking) => booking,
        Err(e) => {
            if let Some(reason) = e.conflict() {
                tracing::warn!(slot_id, customer_id, vehicle_id, %reason, "slot booking rejected");
            }
            return Err(e);
        }
    };
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        slot_id,
        customer_id,
        vehicle_id,
        "slot booked"
    );
    Ok(booking)
}

fn check_slot_booking(
    conn: &Connection,
    slot_id: &str,
    customer_id: i64,
    vehicle_id: i64,
) -> Result<Slot, AppError> {
    if queries::has_active_booking(conn, customer_id)? {
        return Err(Conflict::ActiveBookingExists.into());
    }

    let slot = queries::get_slot_by_id(conn, slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))?;

    if slot.is_full() {
        return Err(Conflict::SlotFull.into());
    }
    if slot.is_expired(today()) {
        return Err(Conflict::SlotExpired.into());
    }
    if !slot.offers_vehicle(vehicle_id) {
        return Err(Conflict::VehicleNotOffered.into());
    }
    if queries::is_vehicle_booked_in_slot(conn, slot_id, vehicle_id)? {
        return Err(Conflict::VehicleAlreadyBooked.into());
    }

    Ok(slot)
}

fn new_slot_booking(slot: &Slot, customer_id: i64, vehicle_id: i64, note: Option<String>) -> Booking {
    let now = now();
    Booking {
        id: uuid::Uuid::new_v4().to_string(),
        dealer_id: slot.dealer_id,
        customer_id,
        vehicle_id,
        schedule_time: slot.schedule_time(),
        slot_id: Some(slot.id.clone()),
        status: BookingStatus::Requested,
        note: clean_note(note),
        created_at: now,
        updated_at: now,
    }
}

/// Legacy reservation made straight against a dealer and vehicle, with no
/// slot and therefore no capacity checks.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectBooking {
    pub dealer_id: i64,
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub schedule_time: NaiveDateTime,
    #[serde(default)]
    pub note: Option<String>,
}

pub fn book_direct(conn: &Connection, request: DirectBooking) -> Result<Booking, AppError> {
    create_direct_booking(conn, request, BookingStatus::Requested)
}

/// Direct booking entered by dealer staff. It skips the request step and
/// starts out CONFIRMED, but is otherwise held to the same rules.
pub fn book_direct_by_staff(conn: &Connection, request: DirectBooking) -> Result<Booking, AppError> {
    create_direct_booking(conn, request, BookingStatus::Confirmed)
}

fn create_direct_booking(
    conn: &Connection,
    request: DirectBooking,
    status: BookingStatus,
) -> Result<Booking, AppError> {
    let now = now();
    if request.schedule_time <= now {
        return Err(AppError::Validation(
            "schedule time must be in the future".to_string(),
        ));
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    if queries::has_active_booking(&tx, request.customer_id)? {
        tracing::warn!(customer_id = request.customer_id, "direct booking rejected: active booking");
        return Err(Conflict::ActiveBookingExists.into());
    }

    let dealer_ok = queries::get_dealer(&tx, request.dealer_id)?
        .map(|d| d.is_active())
        .unwrap_or(false);
    if !dealer_ok {
        return Err(AppError::Validation(
            "dealer not found or inactive".to_string(),
        ));
    }

    let vehicle_ok = queries::get_vehicle(&tx, request.vehicle_id)?
        .map(|v| v.is_available())
        .unwrap_or(false);
    if !vehicle_ok {
        return Err(AppError::Validation(
            "vehicle not found or unavailable".to_string(),
        ));
    }

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        dealer_id: request.dealer_id,
        customer_id: request.customer_id,
        vehicle_id: request.vehicle_id,
        schedule_time: request.schedule_time,
        slot_id: None,
        status,
        note: clean_note(request.note),
        created_at: now,
        updated_at: now,
    };
    insert_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        dealer_id = booking.dealer_id,
        customer_id = booking.customer_id,
        status = booking.status.as_str(),
        "direct booking created"
    );
    Ok(booking)
}

/// Move a booking along REQUESTED -> CONFIRMED -> DONE, or to CANCELLED from
/// either open state. Anything else is rejected.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    new_status: BookingStatus,
) -> Result<Booking, AppError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking_by_id(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if !booking.status.can_transition_to(new_status) {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            to: new_status,
        });
    }

    let updated_at = now();
    queries::update_booking_status(&tx, id, new_status, &updated_at)?;
    tx.commit()?;

    tracing::info!(
        booking_id = id,
        from = booking.status.as_str(),
        to = new_status.as_str(),
        "booking status changed"
    );

    booking.status = new_status;
    booking.updated_at = updated_at;
    Ok(booking)
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn get_bookings_by_slot_id(conn: &Connection, slot_id: &str) -> Result<Vec<Booking>, AppError> {
    Ok(queries::get_bookings_by_slot_id(conn, slot_id)?)
}

pub fn has_active_booking(conn: &Connection, customer_id: i64) -> Result<bool, AppError> {
    Ok(queries::has_active_booking(conn, customer_id)?)
}

pub fn is_vehicle_booked_in_slot(
    conn: &Connection,
    slot_id: &str,
    vehicle_id: i64,
) -> Result<bool, AppError> {
    Ok(queries::is_vehicle_booked_in_slot(conn, slot_id, vehicle_id)?)
}

/// Insert, translating a unique-index hit into the invariant it protects.
fn insert_booking(conn: &Connection, booking: &Booking) -> Result<(), AppError> {
    queries::insert_booking(conn, booking).map_err(|e| match constraint_conflict(&e) {
        Some(conflict) => AppError::Conflict(conflict),
        None => AppError::Internal(e),
    })
}

fn constraint_conflict(err: &anyhow::Error) -> Option<Conflict> {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, Some(msg)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            if msg.contains("bookings.customer_id") {
                Some(Conflict::ActiveBookingExists)
            } else if msg.contains("bookings.slot_id") {
                Some(Conflict::VehicleAlreadyBooked)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
