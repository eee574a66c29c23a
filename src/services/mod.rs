pub mod availability;
pub mod booking;
pub mod slots;

use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Calendar day used for expiry checks.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
