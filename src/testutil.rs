//! Shared test fixtures. Staff rows are inserted with throwaway hashes
//! so tests skip the expensive PBKDF2 work in [`crate::auth`].

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db;
use crate::models::enums::StaffRole;
use crate::models::Staff;

/// Fixed reference instant: Monday 2026-03-02, 09:00 local.
pub static NOW: LazyLock<NaiveDateTime> = LazyLock::new(|| {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
});

pub fn seed_staff(conn: &Connection, role: StaffRole) -> Uuid {
    let id = Uuid::new_v4();
    let staff = Staff {
        id,
        name: format!("Test {}", role.as_str()),
        email: format!("{}-{id}@matibabu.example", role.as_str()),
        password_hash: "0".repeat(64),
        password_salt: "0".repeat(32),
        role,
    };
    db::insert_staff(conn, &staff).unwrap();
    id
}
