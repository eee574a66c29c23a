use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::queries;
use crate::errors::{AppError, Conflict};
use crate::models::slot::{SLOT_STATUS_AVAILABLE, SLOT_TIME_FORMAT};
use crate::models::Slot;

use super::{now, today};

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub dealer_id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub max_capacity: i64,
    pub vehicle_ids: Vec<i64>,
}

pub fn create_slot(conn: &Connection, new: NewSlot) -> Result<Slot, AppError> {
    let start_time = new.start_time.trim();
    let end_time = new.end_time.trim();
    if start_time.is_empty() || end_time.is_empty() {
        return Err(validation("slot must have start and end time"));
    }
    if new.max_capacity <= 0 {
        return Err(validation("max capacity must be greater than 0"));
    }
    if new.vehicle_ids.is_empty() {
        return Err(validation("at least one vehicle must be offered"));
    }
    if new.date < today() {
        return Err(validation("cannot create a slot in the past"));
    }

    let start = parse_clock(start_time)?;
    let end = parse_clock(end_time)?;
    if start >= end {
        return Err(validation("start time must be before end time"));
    }

    let dealer_ok = queries::get_dealer(conn, new.dealer_id)?
        .map(|d| d.is_active())
        .unwrap_or(false);
    if !dealer_ok {
        return Err(validation("dealer not found or inactive"));
    }

    let mut vehicle_ids = new.vehicle_ids;
    vehicle_ids.sort_unstable();
    vehicle_ids.dedup();

    let slot = Slot {
        id: uuid::Uuid::new_v4().to_string(),
        dealer_id: new.dealer_id,
        date: new.date,
        start_time: start.format(SLOT_TIME_FORMAT).to_string(),
        end_time: end.format(SLOT_TIME_FORMAT).to_string(),
        max_capacity: new.max_capacity,
        status: SLOT_STATUS_AVAILABLE.to_string(),
        available_vehicle_ids: vehicle_ids,
        created_at: now(),
        current_booking_count: 0,
    };
    queries::insert_slot(conn, &slot)?;

    tracing::info!(
        slot_id = %slot.id,
        dealer_id = slot.dealer_id,
        date = %slot.date,
        start = %slot.start_time,
        end = %slot.end_time,
        "slot created"
    );
    Ok(slot)
}

/// Delete a slot that has no non-cancelled bookings. Cancelled bookings
/// survive with their slot link cleared.
pub fn delete_slot(conn: &Connection, id: &str) -> Result<(), AppError> {
    delete_slot_checked(conn, id, None)
}

/// As [`delete_slot`], but only when the slot belongs to `dealer_id`.
pub fn delete_dealer_slot(conn: &Connection, dealer_id: i64, id: &str) -> Result<(), AppError> {
    delete_slot_checked(conn, id, Some(dealer_id))
}

fn delete_slot_checked(conn: &Connection, id: &str, owner: Option<i64>) -> Result<(), AppError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let slot = queries::get_slot_by_id(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {id}")))?;

    if owner.is_some_and(|dealer_id| dealer_id != slot.dealer_id) {
        return Err(AppError::Forbidden);
    }

    let bookings = queries::count_active_slot_bookings(&tx, id)?;
    if bookings > 0 {
        tracing::warn!(slot_id = id, bookings, "slot deletion rejected");
        return Err(Conflict::SlotHasBookings.into());
    }

    queries::delete_slot(&tx, id)?;
    tx.commit()?;

    tracing::info!(slot_id = id, dealer_id = slot.dealer_id, "slot deleted");
    Ok(())
}

fn parse_clock(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, SLOT_TIME_FORMAT)
        .map_err(|_| validation(&format!("invalid time '{s}', expected HH:MM")))
}

fn validation(msg: &str) -> AppError {
    AppError::Validation(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, Dealer};
    use crate::services::availability::{get_slot_by_id, list_slots};
    use crate::services::booking::{book_slot, get_booking, update_booking_status};
    use crate::test_support::setup_db;
    use chrono::Duration;

    fn new_slot() -> NewSlot {
        NewSlot {
            dealer_id: 1,
            date: today(),
            start_time: "07:00".to_string(),
            end_time: "09:00".to_string(),
            max_capacity: 2,
            vehicle_ids: vec![11, 10, 11],
        }
    }

    fn validation_message(result: Result<Slot, AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_slot() {
        let conn = setup_db();
        let slot = create_slot(&conn, new_slot()).unwrap();
        assert_eq!(slot.status, "AVAILABLE");
        assert_eq!(slot.available_vehicle_ids, vec![10, 11]);
        assert_eq!(slot.current_booking_count, 0);

        let stored = get_slot_by_id(&conn, &slot.id).unwrap().unwrap();
        assert_eq!(stored.date, today());
        assert_eq!(stored.start_time, "07:00");
        assert_eq!(stored.max_capacity, 2);
        assert_eq!(stored.available_vehicle_ids, vec![10, 11]);
    }

    #[test]
    fn test_create_slot_normalizes_clock() {
        let conn = setup_db();
        let slot = create_slot(
            &conn,
            NewSlot {
                start_time: "7:05".to_string(),
                ..new_slot()
            },
        )
        .unwrap();
        assert_eq!(slot.start_time, "07:05");
    }

    #[test]
    fn test_create_slot_validation() {
        let conn = setup_db();

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                end_time: " ".to_string(),
                ..new_slot()
            },
        ));
        assert!(msg.contains("start and end"));

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                max_capacity: 0,
                ..new_slot()
            },
        ));
        assert!(msg.contains("capacity"));

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                vehicle_ids: vec![],
                ..new_slot()
            },
        ));
        assert!(msg.contains("vehicle"));

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                date: today() - Duration::days(1),
                ..new_slot()
            },
        ));
        assert!(msg.contains("past"));

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                start_time: "seven".to_string(),
                ..new_slot()
            },
        ));
        assert!(msg.contains("HH:MM"));

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                start_time: "10:00".to_string(),
                end_time: "09:00".to_string(),
                ..new_slot()
            },
        ));
        assert!(msg.contains("before"));

        assert!(list_slots(&conn, 1, today()).unwrap().is_empty());
    }

    #[test]
    fn test_create_slot_requires_active_dealer() {
        let conn = setup_db();

        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                dealer_id: 99,
                ..new_slot()
            },
        ));
        assert!(msg.contains("dealer"));

        queries::save_dealer(
            &conn,
            &Dealer {
                id: 2,
                name: "Closed Motors".to_string(),
                address: String::new(),
                status: "INACTIVE".to_string(),
            },
        )
        .unwrap();
        let msg = validation_message(create_slot(
            &conn,
            NewSlot {
                dealer_id: 2,
                ..new_slot()
            },
        ));
        assert!(msg.contains("dealer"));
        assert!(list_slots(&conn, 2, today()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_empty_slot() {
        let conn = setup_db();
        let slot = create_slot(&conn, new_slot()).unwrap();
        delete_slot(&conn, &slot.id).unwrap();
        assert!(get_slot_by_id(&conn, &slot.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_slot() {
        let conn = setup_db();
        assert!(matches!(delete_slot(&conn, "missing"), Err(AppError::NotFound(_))));
        assert!(queries::delete_slot(&conn, "missing").is_err());
    }

    #[test]
    fn test_delete_requires_all_bookings_cancelled() {
        let conn = setup_db();
        let slot = create_slot(&conn, new_slot()).unwrap();
        let b1 = book_slot(&conn, &slot.id, 100, 10, None).unwrap();
        let b3 = book_slot(&conn, &slot.id, 101, 11, None).unwrap();

        let err = delete_slot(&conn, &slot.id).unwrap_err();
        assert_eq!(err.conflict(), Some(Conflict::SlotHasBookings));

        update_booking_status(&conn, &b1.id, BookingStatus::Cancelled).unwrap();
        let err = delete_slot(&conn, &slot.id).unwrap_err();
        assert_eq!(err.conflict(), Some(Conflict::SlotHasBookings));
        assert!(get_slot_by_id(&conn, &slot.id).unwrap().is_some());
        assert_eq!(get_booking(&conn, &b3.id).unwrap().status, BookingStatus::Requested);

        update_booking_status(&conn, &b3.id, BookingStatus::Cancelled).unwrap();
        delete_slot(&conn, &slot.id).unwrap();
        assert!(get_slot_by_id(&conn, &slot.id).unwrap().is_none());

        // Cancelled history stays, detached from the deleted slot.
        let kept = get_booking(&conn, &b1.id).unwrap();
        assert_eq!(kept.status, BookingStatus::Cancelled);
        assert!(kept.slot_id.is_none());
    }

    #[test]
    fn test_done_booking_blocks_delete() {
        let conn = setup_db();
        let slot = create_slot(&conn, new_slot()).unwrap();
        let b = book_slot(&conn, &slot.id, 100, 10, None).unwrap();
        update_booking_status(&conn, &b.id, BookingStatus::Confirmed).unwrap();
        update_booking_status(&conn, &b.id, BookingStatus::Done).unwrap();

        let err = delete_slot(&conn, &slot.id).unwrap_err();
        assert_eq!(err.conflict(), Some(Conflict::SlotHasBookings));
    }

    #[test]
    fn test_delete_dealer_slot_checks_owner() {
        let conn = setup_db();
        let slot = create_slot(&conn, new_slot()).unwrap();

        assert!(matches!(
            delete_dealer_slot(&conn, 2, &slot.id),
            Err(AppError::Forbidden)
        ));
        delete_dealer_slot(&conn, 1, &slot.id).unwrap();
    }
}
