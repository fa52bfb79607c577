use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_date_opt, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::MedicationDispense;

const DISPENSE_COLUMNS: &str = "id, prescription_medication_id, patient_id, pharmacist_id,
     quantity, picked_up, pickup_date, billed, created_at";

pub fn insert_dispense(conn: &Connection, dispense: &MedicationDispense) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medication_dispenses (id, prescription_medication_id, patient_id,
         pharmacist_id, quantity, picked_up, pickup_date, billed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            dispense.id.to_string(),
            dispense.prescription_medication_id.to_string(),
            dispense.patient_id.to_string(),
            dispense.pharmacist_id.to_string(),
            dispense.quantity,
            dispense.picked_up as i32,
            dispense.pickup_date.map(|d| d.to_string()),
            dispense.billed as i32,
            fmt_datetime(&dispense.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_dispense(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicationDispense>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DISPENSE_COLUMNS} FROM medication_dispenses WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(dispense_row(row)));
    match result {
        Ok(row) => Ok(Some(dispense_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_dispenses_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicationDispense>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DISPENSE_COLUMNS} FROM medication_dispenses
         WHERE patient_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| Ok(dispense_row(row)))?;

    let mut dispenses = Vec::new();
    for row in rows {
        dispenses.push(dispense_from_row(row??)?);
    }
    Ok(dispenses)
}

pub fn set_dispense_picked_up(
    conn: &Connection,
    id: &Uuid,
    pickup_date: NaiveDate,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medication_dispenses SET picked_up = 1, pickup_date = ?2 WHERE id = ?1",
        params![id.to_string(), pickup_date.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicationDispense".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Unbilled dispense charges for a patient: (quantity, unit_price,
/// medication name) per dispense, priced via the prescription line's
/// inventory reference. Lines without one contribute nothing.
pub fn unbilled_dispense_charges(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<(i64, i64, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT md.quantity, mi.unit_price, mi.name
         FROM medication_dispenses md
         JOIN prescription_medications pm ON pm.id = md.prescription_medication_id
         JOIN medication_inventory mi ON mi.id = pm.inventory_item_id
         WHERE md.patient_id = ?1 AND md.billed = 0",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut charges = Vec::new();
    for row in rows {
        charges.push(row?);
    }
    Ok(charges)
}

pub fn mark_dispenses_billed(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE medication_dispenses SET billed = 1 WHERE patient_id = ?1 AND billed = 0",
        params![patient_id.to_string()],
    )?;
    Ok(changed)
}

struct DispenseRow {
    id: String,
    prescription_medication_id: String,
    patient_id: String,
    pharmacist_id: String,
    quantity: i64,
    picked_up: i32,
    pickup_date: Option<String>,
    billed: i32,
    created_at: String,
}

fn dispense_row(row: &rusqlite::Row<'_>) -> Result<DispenseRow, rusqlite::Error> {
    Ok(DispenseRow {
        id: row.get(0)?,
        prescription_medication_id: row.get(1)?,
        patient_id: row.get(2)?,
        pharmacist_id: row.get(3)?,
        quantity: row.get(4)?,
        picked_up: row.get(5)?,
        pickup_date: row.get(6)?,
        billed: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn dispense_from_row(row: DispenseRow) -> Result<MedicationDispense, DatabaseError> {
    Ok(MedicationDispense {
        id: parse_uuid(&row.id)?,
        prescription_medication_id: parse_uuid(&row.prescription_medication_id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        pharmacist_id: parse_uuid(&row.pharmacist_id)?,
        quantity: row.quantity,
        picked_up: row.picked_up != 0,
        pickup_date: parse_date_opt(row.pickup_date),
        billed: row.billed != 0,
        created_at: parse_datetime(&row.created_at)?,
    })
}
