use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_date_opt, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::Gender;
use crate::models::Patient;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, phone, email, date_of_birth, gender,
     blood_group, address, doctor_id, created_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, phone, email, date_of_birth,
         gender, blood_group, address, doctor_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.phone,
            patient.email,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.gender.map(|g| g.as_str()),
            patient.blood_group,
            patient.address,
            patient.doctor_id.map(|id| id.to_string()),
            fmt_datetime(&patient.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], |row| Ok(patient_row(row)));
    match result {
        Ok(row) => Ok(Some(patient_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, phone = ?4, email = ?5,
         date_of_birth = ?6, gender = ?7, blood_group = ?8, address = ?9, doctor_id = ?10
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.phone,
            patient.email,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.gender.map(|g| g.as_str()),
            patient.blood_group,
            patient.address,
            patient.doctor_id.map(|id| id.to_string()),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

/// Hard delete. Dependent records go with it via ON DELETE CASCADE.
pub fn delete_patient_cascade(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patients WHERE id = ?1",
        params![id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Case-insensitive substring search over name, email, phone.
/// `None` returns all patients, newest first.
pub fn search_patients(
    conn: &Connection,
    query: Option<&str>,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut patients = Vec::new();

    match query {
        Some(q) if !q.trim().is_empty() => {
            let pattern = format!("%{}%", q.trim());
            let mut stmt = conn.prepare(&format!(
                "SELECT {PATIENT_COLUMNS} FROM patients
                 WHERE LOWER(first_name || ' ' || last_name) LIKE LOWER(?1)
                    OR LOWER(COALESCE(email, '')) LIKE LOWER(?1)
                    OR phone LIKE ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![pattern], |row| Ok(patient_row(row)))?;
            for row in rows {
                patients.push(patient_from_row(row??)?);
            }
        }
        _ => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map([], |row| Ok(patient_row(row)))?;
            for row in rows {
                patients.push(patient_from_row(row??)?);
            }
        }
    }

    Ok(patients)
}

/// Registration counts per calendar month of the given year (1..=12 keys
/// are sparse; absent months have no row).
pub fn count_registrations_by_month(
    conn: &Connection,
    year: i32,
) -> Result<Vec<(u32, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%m', created_at) AS INTEGER), COUNT(*)
         FROM patients
         WHERE strftime('%Y', created_at) = ?1
         GROUP BY strftime('%m', created_at)",
    )?;

    let rows = stmt.query_map(params![year.to_string()], |row| {
        Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)?))
    })?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    phone: String,
    email: Option<String>,
    date_of_birth: Option<String>,
    gender: Option<String>,
    blood_group: Option<String>,
    address: Option<String>,
    doctor_id: Option<String>,
    created_at: String,
}

fn patient_row(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        date_of_birth: row.get(5)?,
        gender: row.get(6)?,
        blood_group: row.get(7)?,
        address: row.get(8)?,
        doctor_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
        email: row.email,
        date_of_birth: parse_date_opt(row.date_of_birth),
        gender: match row.gender {
            Some(g) => Some(Gender::from_str(&g)?),
            None => None,
        },
        blood_group: row.blood_group,
        address: row.address,
        doctor_id: row.doctor_id.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: parse_datetime(&row.created_at)?,
    })
}
