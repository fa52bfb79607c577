use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Prescription, PrescriptionMedication};

pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, patient_id, diagnosis_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            rx.id.to_string(),
            rx.patient_id.to_string(),
            rx.diagnosis_id.to_string(),
            fmt_datetime(&rx.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_prescription(conn: &Connection, id: &Uuid) -> Result<Option<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, diagnosis_id, created_at FROM prescriptions WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(prescription_row(row)));
    match result {
        Ok(row) => Ok(Some(prescription_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_prescriptions_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, diagnosis_id, created_at FROM prescriptions
         WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(prescription_row(row))
    })?;

    let mut prescriptions = Vec::new();
    for row in rows {
        prescriptions.push(prescription_from_row(row??)?);
    }
    Ok(prescriptions)
}

pub fn insert_prescription_medication(
    conn: &Connection,
    line: &PrescriptionMedication,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescription_medications (id, prescription_id, inventory_item_id,
         medication_name, dosage, frequency, duration, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            line.id.to_string(),
            line.prescription_id.to_string(),
            line.inventory_item_id.map(|id| id.to_string()),
            line.medication_name,
            line.dosage,
            line.frequency,
            line.duration,
            line.notes,
        ],
    )?;
    Ok(())
}

pub fn get_prescription_medication(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<PrescriptionMedication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_id, inventory_item_id, medication_name, dosage,
         frequency, duration, notes
         FROM prescription_medications WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(line_row(row)));
    match result {
        Ok(row) => Ok(Some(line_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_medications_for_prescription(
    conn: &Connection,
    prescription_id: &Uuid,
) -> Result<Vec<PrescriptionMedication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_id, inventory_item_id, medication_name, dosage,
         frequency, duration, notes
         FROM prescription_medications WHERE prescription_id = ?1",
    )?;
    let rows = stmt.query_map(params![prescription_id.to_string()], |row| {
        Ok(line_row(row))
    })?;

    let mut lines = Vec::new();
    for row in rows {
        lines.push(line_from_row(row??)?);
    }
    Ok(lines)
}

/// Dispense counts per prescription line, the read model for the
/// derived dispensed/pending status. A line is dispensed iff count > 0.
pub fn dispense_counts_for_prescription(
    conn: &Connection,
    prescription_id: &Uuid,
) -> Result<Vec<(Uuid, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pm.id, COUNT(md.id)
         FROM prescription_medications pm
         LEFT JOIN medication_dispenses md ON md.prescription_medication_id = pm.id
         WHERE pm.prescription_id = ?1
         GROUP BY pm.id",
    )?;
    let rows = stmt.query_map(params![prescription_id.to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = Vec::new();
    for row in rows {
        let (id, count) = row?;
        counts.push((parse_uuid(&id)?, count));
    }
    Ok(counts)
}

struct PrescriptionRow {
    id: String,
    patient_id: String,
    diagnosis_id: String,
    created_at: String,
}

fn prescription_row(row: &rusqlite::Row<'_>) -> Result<PrescriptionRow, rusqlite::Error> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        diagnosis_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn prescription_from_row(row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    Ok(Prescription {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        diagnosis_id: parse_uuid(&row.diagnosis_id)?,
        created_at: parse_datetime(&row.created_at)?,
    })
}

struct LineRow {
    id: String,
    prescription_id: String,
    inventory_item_id: Option<String>,
    medication_name: String,
    dosage: String,
    frequency: String,
    duration: Option<String>,
    notes: Option<String>,
}

fn line_row(row: &rusqlite::Row<'_>) -> Result<LineRow, rusqlite::Error> {
    Ok(LineRow {
        id: row.get(0)?,
        prescription_id: row.get(1)?,
        inventory_item_id: row.get(2)?,
        medication_name: row.get(3)?,
        dosage: row.get(4)?,
        frequency: row.get(5)?,
        duration: row.get(6)?,
        notes: row.get(7)?,
    })
}

fn line_from_row(row: LineRow) -> Result<PrescriptionMedication, DatabaseError> {
    Ok(PrescriptionMedication {
        id: parse_uuid(&row.id)?,
        prescription_id: parse_uuid(&row.prescription_id)?,
        inventory_item_id: row.inventory_item_id.and_then(|s| Uuid::parse_str(&s).ok()),
        medication_name: row.medication_name,
        dosage: row.dosage,
        frequency: row.frequency,
        duration: row.duration,
        notes: row.notes,
    })
}
