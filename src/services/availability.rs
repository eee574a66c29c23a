use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Slot;

use super::today;

/// Every slot of the dealer on `date`, ordered by start time, with the live
/// booking count filled in.
pub fn list_slots(
    conn: &Connection,
    dealer_id: i64,
    date: chrono::NaiveDate,
) -> Result<Vec<Slot>, AppError> {
    Ok(queries::get_slots_by_dealer_and_date(conn, dealer_id, &date)?)
}

/// Slots a customer may look at: nothing for past days, every slot (full ones
/// included) for today and later. Callers use `Slot::is_full` to grey out
/// full slots instead of hiding them.
pub fn list_available_slots(
    conn: &Connection,
    dealer_id: i64,
    date: chrono::NaiveDate,
) -> Result<Vec<Slot>, AppError> {
    if date < today() {
        return Ok(vec![]);
    }
    list_slots(conn, dealer_id, date)
}

pub fn get_slot_by_id(conn: &Connection, slot_id: &str) -> Result<Option<Slot>, AppError> {
    Ok(queries::get_slot_by_id(conn, slot_id)?)
}

pub fn is_bookable(conn: &Connection, slot_id: &str) -> Result<bool, AppError> {
    let bookable = match queries::get_slot_by_id(conn, slot_id)? {
        Some(slot) => !slot.is_expired(today()) && !slot.is_full(),
        None => false,
    };
    Ok(bookable)
}
