use anyhow::Context;
use rusqlite::Connection;

/// Schema steps in apply order. Names are recorded in `_migrations` so each
/// step runs once per database.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_directories.sql",
        "CREATE TABLE dealers (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'ACTIVE'
        );
        CREATE TABLE vehicles (
            id INTEGER PRIMARY KEY,
            model_name TEXT NOT NULL,
            variant_name TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'AVAILABLE'
        );",
    ),
    (
        "002_slots.sql",
        "CREATE TABLE slots (
            id TEXT PRIMARY KEY,
            dealer_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            max_capacity INTEGER NOT NULL CHECK (max_capacity > 0),
            status TEXT NOT NULL DEFAULT 'AVAILABLE',
            available_vehicle_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
        CREATE INDEX idx_slots_dealer_date ON slots(dealer_id, date);",
    ),
    (
        "003_bookings.sql",
        "CREATE TABLE bookings (
            id TEXT PRIMARY KEY,
            dealer_id INTEGER NOT NULL,
            customer_id INTEGER NOT NULL,
            vehicle_id INTEGER NOT NULL,
            schedule_time TEXT NOT NULL,
            slot_id TEXT REFERENCES slots(id) ON DELETE SET NULL,
            status TEXT NOT NULL DEFAULT 'REQUESTED',
            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX idx_bookings_slot ON bookings(slot_id);
        CREATE INDEX idx_bookings_dealer ON bookings(dealer_id, schedule_time);
        CREATE UNIQUE INDEX uq_bookings_slot_vehicle
            ON bookings(slot_id, vehicle_id)
            WHERE slot_id IS NOT NULL AND status != 'CANCELLED';
        CREATE UNIQUE INDEX uq_bookings_active_customer
            ON bookings(customer_id)
            WHERE status IN ('REQUESTED', 'CONFIRMED');",
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }
}
