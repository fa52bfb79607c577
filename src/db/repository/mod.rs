//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per entity cluster. All public functions are
//! re-exported here.

mod appointment;
mod diagnosis;
mod dispense;
mod inventory;
mod invoice;
mod lab;
mod patient;
mod payment;
mod prescription;
mod referral;
mod session;
mod staff;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub use appointment::*;
pub use diagnosis::*;
pub use dispense::*;
pub use inventory::*;
pub use invoice::*;
pub use lab::*;
pub use patient::*;
pub use payment::*;
pub use prescription::*;
pub use referral::*;
pub use session::*;
pub use staff::*;

pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {s:?}: {e}")))
}

pub(crate) fn parse_date_opt(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn datetime_parses_both_stored_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2026-03-02 09:00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2026-03-02T09:00:00").unwrap(), expected);
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(matches!(
            parse_datetime("not-a-date"),
            Err(DatabaseError::ConstraintViolation(_))
        ));
        assert!(matches!(
            parse_datetime(""),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn corrupted_timestamp_surfaces_on_read() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO patients (id, first_name, last_name, phone, created_at)
             VALUES (?1, 'Jane', 'Doe', '+256700000000', 'garbage')",
            [id.to_string()],
        )
        .unwrap();

        let result = super::get_patient(&conn, &id);
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
    }
}
