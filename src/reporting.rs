//! Dashboard report series. Monthly series are always twelve rows,
//! zero-filled; the weekly appointment series lives in [`crate::scheduling`].

use rusqlite::Connection;
use serde::Serialize;

use crate::clinical::GroupCount;
use crate::db;
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub month: u32,
    pub total: i64,
}

pub fn registrations_by_month(conn: &Connection, year: i32) -> Result<Vec<MonthCount>, ServiceError> {
    let counts = db::count_registrations_by_month(conn, year)?;
    Ok((1..=12)
        .map(|month| {
            let total = counts
                .iter()
                .find(|(m, _)| *m == month)
                .map(|(_, t)| *t)
                .unwrap_or(0);
            MonthCount { month, total }
        })
        .collect())
}

/// Test request counts grouped by type. An empty database yields an
/// empty series, not placeholder data.
pub fn test_type_distribution(conn: &Connection) -> Result<Vec<GroupCount>, ServiceError> {
    Ok(db::count_tests_by_type(conn)?
        .into_iter()
        .map(|(label, total)| GroupCount { label, total })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::enums::{Gender, StaffRole};
    use crate::registry::{self, NewPatient};
    use crate::testutil::{seed_staff, NOW};

    #[test]
    fn registrations_zero_filled_across_year() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        for i in 0..2 {
            registry::create_patient(
                &conn,
                &receptionist,
                &NewPatient {
                    first_name: format!("Patient{i}"),
                    last_name: "Test".into(),
                    phone: format!("+25670000000{i}"),
                    email: None,
                    date_of_birth: None,
                    gender: Some(Gender::Other),
                    blood_group: None,
                    address: None,
                    doctor_id: None,
                },
                *NOW,
            )
            .unwrap();
        }

        let months = registrations_by_month(&conn, 2026).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[2], MonthCount { month: 3, total: 2 });
        assert!(months.iter().filter(|m| m.month != 3).all(|m| m.total == 0));

        let other_year = registrations_by_month(&conn, 2025).unwrap();
        assert!(other_year.iter().all(|m| m.total == 0));
    }

    #[test]
    fn empty_distribution_stays_empty() {
        let conn = open_memory_database().unwrap();
        assert!(test_type_distribution(&conn).unwrap().is_empty());
    }
}
