use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus, Dealer, Slot, Vehicle};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SLOT_COLUMNS: &str = "s.id, s.dealer_id, s.date, s.start_time, s.end_time, s.max_capacity, s.status, \
     s.available_vehicle_ids, s.created_at, \
     (SELECT COUNT(*) FROM bookings b WHERE b.slot_id = s.id AND b.status != 'CANCELLED')";

const BOOKING_COLUMNS: &str = "id, dealer_id, customer_id, vehicle_id, schedule_time, slot_id, status, note, created_at, updated_at";

fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

// ── Slots ──

pub fn insert_slot(conn: &Connection, slot: &Slot) -> anyhow::Result<()> {
    let vehicle_ids = serde_json::to_string(&slot.available_vehicle_ids)?;

    conn.execute(
        "INSERT INTO slots (id, dealer_id, date, start_time, end_time, max_capacity, status, available_vehicle_ids, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            slot.id,
            slot.dealer_id,
            fmt_date(&slot.date),
            slot.start_time,
            slot.end_time,
            slot.max_capacity,
            slot.status,
            vehicle_ids,
            fmt_datetime(&slot.created_at),
        ],
    )
    .context("failed to insert slot")?;
    Ok(())
}

pub fn get_slot_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Slot>> {
    let sql = format!("SELECT {SLOT_COLUMNS} FROM slots s WHERE s.id = ?1");
    let slot = conn
        .query_row(&sql, params![id], |row| Ok(parse_slot_row(row)))
        .optional()?;

    slot.transpose()
}

/// All slots of a dealer on one calendar day, earliest start first.
pub fn get_slots_by_dealer_and_date(
    conn: &Connection,
    dealer_id: i64,
    date: &NaiveDate,
) -> anyhow::Result<Vec<Slot>> {
    let sql = format!(
        "SELECT {SLOT_COLUMNS} FROM slots s WHERE s.dealer_id = ?1 AND s.date = ?2 ORDER BY s.start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![dealer_id, fmt_date(date)], |row| {
        Ok(parse_slot_row(row))
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn count_active_slot_bookings(conn: &Connection, slot_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE slot_id = ?1 AND status != 'CANCELLED'",
        params![slot_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn delete_slot(conn: &Connection, id: &str) -> anyhow::Result<()> {
    let count = conn
        .execute("DELETE FROM slots WHERE id = ?1", params![id])
        .context("failed to delete slot")?;
    anyhow::ensure!(count == 1, "slot {id} was not deleted ({count} rows)");
    Ok(())
}

fn parse_slot_row(row: &rusqlite::Row) -> anyhow::Result<Slot> {
    let date_str: String = row.get(2)?;
    let vehicle_ids_json: String = row.get(7)?;
    let created_at_str: String = row.get(8)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .with_context(|| format!("bad slot date: {date_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FORMAT)
        .with_context(|| format!("bad slot created_at: {created_at_str}"))?;
    let available_vehicle_ids: Vec<i64> =
        serde_json::from_str(&vehicle_ids_json).context("bad slot vehicle list")?;

    Ok(Slot {
        id: row.get(0)?,
        dealer_id: row.get(1)?,
        date,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        max_capacity: row.get(5)?,
        status: row.get(6)?,
        available_vehicle_ids,
        created_at,
        current_booking_count: row.get(9)?,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, dealer_id, customer_id, vehicle_id, schedule_time, slot_id, status, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.dealer_id,
            booking.customer_id,
            booking.vehicle_id,
            fmt_datetime(&booking.schedule_time),
            booking.slot_id,
            booking.status.as_str(),
            booking.note,
            fmt_datetime(&booking.created_at),
            fmt_datetime(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let booking = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;

    booking.transpose()
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    updated_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_datetime(updated_at), id],
    )?;
    anyhow::ensure!(count == 1, "booking {id} was not updated ({count} rows)");
    Ok(())
}

/// True if the customer holds any booking that is neither DONE nor CANCELLED.
pub fn has_active_booking(conn: &Connection, customer_id: i64) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE customer_id = ?1 AND status NOT IN ('DONE', 'CANCELLED')",
        params![customer_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn is_vehicle_booked_in_slot(
    conn: &Connection,
    slot_id: &str,
    vehicle_id: i64,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE slot_id = ?1 AND vehicle_id = ?2 AND status != 'CANCELLED'",
        params![slot_id, vehicle_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_bookings_by_slot_id(conn: &Connection, slot_id: &str) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE slot_id = ?1 ORDER BY created_at ASC"),
        params![slot_id],
    )
}

pub fn get_bookings_by_customer(conn: &Connection, customer_id: i64) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1 ORDER BY schedule_time DESC"
        ),
        params![customer_id],
    )
}

pub fn get_bookings_by_dealer(conn: &Connection, dealer_id: i64) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE dealer_id = ?1 ORDER BY schedule_time DESC"
        ),
        params![dealer_id],
    )
}

pub fn get_bookings_by_dealer_and_date(
    conn: &Connection,
    dealer_id: i64,
    date: &NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let start = date.and_hms_opt(0, 0, 0).context("invalid day start")?;
    let end = start + chrono::Duration::days(1);

    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE dealer_id = ?1 AND schedule_time >= ?2 AND schedule_time < ?3
             ORDER BY schedule_time ASC"
        ),
        params![dealer_id, fmt_datetime(&start), fmt_datetime(&end)],
    )
}

pub fn get_bookings_by_status(
    conn: &Connection,
    status: BookingStatus,
    dealer_id: Option<i64>,
) -> anyhow::Result<Vec<Booking>> {
    match dealer_id {
        Some(dealer_id) => query_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = ?1 AND dealer_id = ?2 ORDER BY schedule_time DESC"
            ),
            params![status.as_str(), dealer_id],
        ),
        None => query_bookings(
            conn,
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY schedule_time DESC"),
            params![status.as_str()],
        ),
    }
}

/// CONFIRMED bookings of a dealer scheduled after `after`, soonest first.
pub fn get_upcoming_bookings(
    conn: &Connection,
    dealer_id: i64,
    after: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE dealer_id = ?1 AND status = 'CONFIRMED' AND schedule_time > ?2
             ORDER BY schedule_time ASC"
        ),
        params![dealer_id, fmt_datetime(after)],
    )
}

fn query_bookings(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let schedule_time_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let schedule_time = NaiveDateTime::parse_from_str(&schedule_time_str, DATETIME_FORMAT)
        .with_context(|| format!("bad booking schedule_time: {schedule_time_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FORMAT)
        .with_context(|| format!("bad booking created_at: {created_at_str}"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, DATETIME_FORMAT)
        .with_context(|| format!("bad booking updated_at: {updated_at_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        dealer_id: row.get(1)?,
        customer_id: row.get(2)?,
        vehicle_id: row.get(3)?,
        schedule_time,
        slot_id: row.get(5)?,
        status,
        note: row.get(7)?,
        created_at,
        updated_at,
    })
}

// ── Directories ──

pub fn get_dealer(conn: &Connection, id: i64) -> anyhow::Result<Option<Dealer>> {
    let dealer = conn
        .query_row(
            "SELECT id, name, address, status FROM dealers WHERE id = ?1",
            params![id],
            |row| {
                Ok(Dealer {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    address: row.get(2)?,
                    status: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(dealer)
}

pub fn save_dealer(conn: &Connection, dealer: &Dealer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO dealers (id, name, address, status) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           address = excluded.address,
           status = excluded.status",
        params![dealer.id, dealer.name, dealer.address, dealer.status],
    )?;
    Ok(())
}

pub fn get_vehicle(conn: &Connection, id: i64) -> anyhow::Result<Option<Vehicle>> {
    let vehicle = conn
        .query_row(
            "SELECT id, model_name, variant_name, status FROM vehicles WHERE id = ?1",
            params![id],
            |row| {
                Ok(Vehicle {
                    id: row.get(0)?,
                    model_name: row.get(1)?,
                    variant_name: row.get(2)?,
                    status: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(vehicle)
}

pub fn save_vehicle(conn: &Connection, vehicle: &Vehicle) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO vehicles (id, model_name, variant_name, status) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           model_name = excluded.model_name,
           variant_name = excluded.variant_name,
           status = excluded.status",
        params![vehicle.id, vehicle.model_name, vehicle.variant_name, vehicle.status],
    )?;
    Ok(())
}
