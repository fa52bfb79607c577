use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Diagnosis;

pub fn insert_diagnosis(conn: &Connection, diagnosis: &Diagnosis) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO diagnoses (id, patient_id, doctor_id, summary, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            diagnosis.id.to_string(),
            diagnosis.patient_id.to_string(),
            diagnosis.doctor_id.to_string(),
            diagnosis.summary,
            diagnosis.detail,
            fmt_datetime(&diagnosis.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_diagnosis(conn: &Connection, id: &Uuid) -> Result<Option<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, summary, detail, created_at
         FROM diagnoses WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(diagnosis_row(row)));
    match result {
        Ok(row) => Ok(Some(diagnosis_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_diagnoses_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, summary, detail, created_at
         FROM diagnoses WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(diagnosis_row(row))
    })?;

    let mut diagnoses = Vec::new();
    for row in rows {
        diagnoses.push(diagnosis_from_row(row??)?);
    }
    Ok(diagnoses)
}

struct DiagnosisRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    summary: String,
    detail: Option<String>,
    created_at: String,
}

fn diagnosis_row(row: &rusqlite::Row<'_>) -> Result<DiagnosisRow, rusqlite::Error> {
    Ok(DiagnosisRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        summary: row.get(3)?,
        detail: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn diagnosis_from_row(row: DiagnosisRow) -> Result<Diagnosis, DatabaseError> {
    Ok(Diagnosis {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        summary: row.summary,
        detail: row.detail,
        created_at: parse_datetime(&row.created_at)?,
    })
}
