use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub const SLOT_STATUS_AVAILABLE: &str = "AVAILABLE";

/// Clock format for slot start and end times, e.g. "07:00".
pub const SLOT_TIME_FORMAT: &str = "%H:%M";

/// A dealer-defined bookable window. `current_booking_count` is derived from
/// the bookings table on every read and is never persisted.
#[derive(Debug, Clone)]
pub struct Slot {
    pub id: String,
    pub dealer_id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub max_capacity: i64,
    pub status: String,
    pub available_vehicle_ids: Vec<i64>,
    pub created_at: NaiveDateTime,
    pub current_booking_count: i64,
}

impl Slot {
    pub fn is_full(&self) -> bool {
        self.current_booking_count >= self.max_capacity
    }

    pub fn remaining_capacity(&self) -> i64 {
        (self.max_capacity - self.current_booking_count).max(0)
    }

    /// Expiry is by calendar day: a slot dated today is still current.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    /// An empty vehicle list places no restriction.
    pub fn offers_vehicle(&self, vehicle_id: i64) -> bool {
        self.available_vehicle_ids.is_empty() || self.available_vehicle_ids.contains(&vehicle_id)
    }

    /// Slot date at its start time; used as the schedule time of bookings.
    pub fn schedule_time(&self) -> NaiveDateTime {
        let start = NaiveTime::parse_from_str(&self.start_time, SLOT_TIME_FORMAT)
            .unwrap_or(NaiveTime::MIN);
        self.date.and_time(start)
    }
}
