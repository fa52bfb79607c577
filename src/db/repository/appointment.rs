use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentPayment, AppointmentStatus};
use crate::models::filters::AppointmentFilter;
use crate::models::Appointment;

const APPOINTMENT_COLUMNS: &str =
    "a.id, a.patient_id, a.doctor_id, a.scheduled_at, a.notes, a.status, a.payment_status, a.created_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, scheduled_at, notes,
         status, payment_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            fmt_datetime(&appt.scheduled_at),
            appt.notes,
            appt.status.as_str(),
            appt.payment_status.as_str(),
            fmt_datetime(&appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(appointment_row(row)));
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET scheduled_at = ?2, notes = ?3, status = ?4, payment_status = ?5
         WHERE id = ?1",
        params![
            appt.id.to_string(),
            fmt_datetime(&appt.scheduled_at),
            appt.notes,
            appt.status.as_str(),
            appt.payment_status.as_str(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: appt.id.to_string(),
        });
    }
    Ok(())
}

/// Filter by patient/doctor name substring and/or exact status,
/// soonest first.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         JOIN patients p ON p.id = a.patient_id
         JOIN staff s ON s.id = a.doctor_id
         WHERE 1=1"
    );
    let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(q) = filter.search.as_deref().filter(|q| !q.trim().is_empty()) {
        bindings.push(Box::new(format!("%{}%", q.trim())));
        let n = bindings.len();
        sql.push_str(&format!(
            " AND (LOWER(p.first_name || ' ' || p.last_name) LIKE LOWER(?{n})
                OR LOWER(s.name) LIKE LOWER(?{n}))"
        ));
    }
    if let Some(status) = filter.status {
        bindings.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND a.status = ?{}", bindings.len()));
    }
    if let Some(patient_id) = filter.patient_id {
        bindings.push(Box::new(patient_id.to_string()));
        sql.push_str(&format!(" AND a.patient_id = ?{}", bindings.len()));
    }
    if let Some(doctor_id) = filter.doctor_id {
        bindings.push(Box::new(doctor_id.to_string()));
        sql.push_str(&format!(" AND a.doctor_id = ?{}", bindings.len()));
    }
    sql.push_str(" ORDER BY a.scheduled_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        bindings.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(params_ref.as_slice(), |row| Ok(appointment_row(row)))?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row??)?);
    }
    Ok(appointments)
}

pub fn list_appointments_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         WHERE a.patient_id = ?1 ORDER BY a.scheduled_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(appointment_row(row))
    })?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row??)?);
    }
    Ok(appointments)
}

pub fn get_latest_appointment(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         WHERE a.patient_id = ?1 ORDER BY a.scheduled_at DESC LIMIT 1"
    ))?;
    let result = stmt.query_row(params![patient_id.to_string()], |row| {
        Ok(appointment_row(row))
    });
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Per-day (scheduled_total, completed) counts within [from, to] inclusive.
/// Days with no appointments have no row.
pub fn count_appointments_per_day(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(NaiveDate, i64, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT date(scheduled_at),
                COUNT(*),
                SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END)
         FROM appointments
         WHERE date(scheduled_at) BETWEEN ?1 AND ?2
         GROUP BY date(scheduled_at)",
    )?;
    let rows = stmt.query_map(params![from.to_string(), to.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut counts = Vec::new();
    for row in rows {
        let (day, total, completed) = row?;
        let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        counts.push((day, total, completed));
    }
    Ok(counts)
}

pub fn count_unpaid_appointments(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE patient_id = ?1 AND payment_status = 'unpaid' AND status != 'cancelled'",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Flip all of a patient's unpaid appointments to paid. Returns rows changed.
pub fn mark_appointments_paid(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET payment_status = 'paid'
         WHERE patient_id = ?1 AND payment_status = 'unpaid' AND status != 'cancelled'",
        params![patient_id.to_string()],
    )?;
    Ok(changed)
}

struct AppointmentRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    scheduled_at: String,
    notes: Option<String>,
    status: String,
    payment_status: String,
    created_at: String,
}

fn appointment_row(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        scheduled_at: row.get(3)?,
        notes: row.get(4)?,
        status: row.get(5)?,
        payment_status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        scheduled_at: parse_datetime(&row.scheduled_at)?,
        notes: row.notes,
        status: AppointmentStatus::from_str(&row.status)?,
        payment_status: AppointmentPayment::from_str(&row.payment_status)?,
        created_at: parse_datetime(&row.created_at)?,
    })
}
