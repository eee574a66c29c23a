pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use rusqlite::Connection;

    use crate::db::{self, queries};
    use crate::models::slot::SLOT_STATUS_AVAILABLE;
    use crate::models::{Dealer, Slot};

    /// In-memory store with active dealers 1 and 2.
    pub fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        for id in [1, 2] {
            queries::save_dealer(
                &conn,
                &Dealer {
                    id,
                    name: format!("Dealer {id}"),
                    address: String::new(),
                    status: "ACTIVE".to_string(),
                },
            )
            .unwrap();
        }
        conn
    }

    /// Store a slot on any day, bypassing the no-past-dates rule.
    pub fn insert_slot_on(
        conn: &Connection,
        dealer_id: i64,
        date: NaiveDate,
        max_capacity: i64,
        vehicle_ids: Vec<i64>,
    ) -> Slot {
        let slot = Slot {
            id: uuid::Uuid::new_v4().to_string(),
            dealer_id,
            date,
            start_time: "07:00".to_string(),
            end_time: "09:00".to_string(),
            max_capacity,
            status: SLOT_STATUS_AVAILABLE.to_string(),
            available_vehicle_ids: vehicle_ids,
            created_at: crate::services::now(),
            current_booking_count: 0,
        };
        queries::insert_slot(conn, &slot).unwrap();
        slot
    }
}
