//! Pharmacy: prescriptions, stock-guarded dispensing, and the medication
//! inventory.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::StaffRole;
use crate::models::filters::InventoryFilter;
use crate::models::{MedicationDispense, MedicationInventory, Prescription, PrescriptionMedication};
use crate::registry::{self, PrescriptionView};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescriptionLine {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
    /// Stock item this line draws from, resolved at prescribing time.
    pub inventory_item_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescription {
    pub patient_id: Uuid,
    pub diagnosis_id: Uuid,
    pub medications: Vec<NewPrescriptionLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispenseRequest {
    pub prescription_medication_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedication {
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
}

/// Prescription plus lines in one transaction; every referenced stock
/// item must exist.
pub fn create_prescription(
    conn: &mut Connection,
    staff_id: &Uuid,
    new: &NewPrescription,
    now: NaiveDateTime,
) -> Result<PrescriptionView, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Doctor])?;

    if new.medications.is_empty() {
        return Err(ServiceError::Validation(
            "A prescription needs at least one medication".into(),
        ));
    }
    db::get_patient(conn, &new.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", new.patient_id))?;
    db::get_diagnosis(conn, &new.diagnosis_id)?
        .ok_or_else(|| ServiceError::not_found("Diagnosis", new.diagnosis_id))?;

    let tx = conn.transaction().map_err(crate::db::DatabaseError::Sqlite)?;

    let prescription = Prescription {
        id: Uuid::new_v4(),
        patient_id: new.patient_id,
        diagnosis_id: new.diagnosis_id,
        created_at: now,
    };
    db::insert_prescription(&tx, &prescription)?;

    for line in &new.medications {
        if line.medication_name.trim().is_empty() {
            return Err(ServiceError::Validation("Medication name is required".into()));
        }
        if let Some(item_id) = line.inventory_item_id {
            db::get_medication(&tx, &item_id)?
                .ok_or_else(|| ServiceError::not_found("MedicationInventory", item_id))?;
        }
        db::insert_prescription_medication(
            &tx,
            &PrescriptionMedication {
                id: Uuid::new_v4(),
                prescription_id: prescription.id,
                inventory_item_id: line.inventory_item_id,
                medication_name: line.medication_name.trim().to_string(),
                dosage: line.dosage.clone(),
                frequency: line.frequency.clone(),
                duration: line.duration.clone(),
                notes: line.notes.clone(),
            },
        )?;
    }

    tx.commit().map_err(crate::db::DatabaseError::Sqlite)?;
    tracing::info!(prescription_id = %prescription.id, "Prescription issued");
    registry::prescription_view(conn, prescription)
}

pub fn get_prescription(conn: &Connection, id: &Uuid) -> Result<PrescriptionView, ServiceError> {
    let prescription =
        db::get_prescription(conn, id)?.ok_or_else(|| ServiceError::not_found("Prescription", id))?;
    registry::prescription_view(conn, prescription)
}

pub fn list_prescriptions(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PrescriptionView>, ServiceError> {
    let mut views = Vec::new();
    for rx in db::list_prescriptions_by_patient(conn, patient_id)? {
        views.push(registry::prescription_view(conn, rx)?);
    }
    Ok(views)
}

/// Dispense against a prescription line. The guarded decrement and the
/// dispense insert commit together, so stock never goes negative and a
/// failed dispense leaves quantity untouched.
pub fn dispense_medication(
    conn: &mut Connection,
    staff_id: &Uuid,
    req: &DispenseRequest,
    now: NaiveDateTime,
) -> Result<MedicationDispense, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Pharmacist])?;

    if req.quantity <= 0 {
        return Err(ServiceError::Validation(
            "Dispense quantity must be positive".into(),
        ));
    }

    let tx = conn.transaction().map_err(crate::db::DatabaseError::Sqlite)?;

    let line = db::get_prescription_medication(&tx, &req.prescription_medication_id)?
        .ok_or_else(|| {
            ServiceError::not_found("PrescriptionMedication", req.prescription_medication_id)
        })?;
    let item_id = line.inventory_item_id.ok_or_else(|| {
        ServiceError::Validation(format!(
            "Prescription line '{}' has no inventory reference",
            line.medication_name
        ))
    })?;
    let item = db::get_medication(&tx, &item_id)?
        .ok_or_else(|| ServiceError::not_found("MedicationInventory", item_id))?;

    if !db::decrement_inventory(&tx, &item_id, req.quantity)? {
        return Err(ServiceError::InsufficientInventory {
            requested: req.quantity,
            available: item.quantity,
        });
    }

    let prescription = db::get_prescription(&tx, &line.prescription_id)?
        .ok_or_else(|| ServiceError::not_found("Prescription", line.prescription_id))?;
    let dispense = MedicationDispense {
        id: Uuid::new_v4(),
        prescription_medication_id: line.id,
        patient_id: prescription.patient_id,
        pharmacist_id: *staff_id,
        quantity: req.quantity,
        picked_up: false,
        pickup_date: None,
        billed: false,
        created_at: now,
    };
    db::insert_dispense(&tx, &dispense)?;

    tx.commit().map_err(crate::db::DatabaseError::Sqlite)?;
    tracing::info!(
        dispense_id = %dispense.id,
        medication = line.medication_name,
        quantity = req.quantity,
        "Medication dispensed"
    );
    Ok(dispense)
}

pub fn mark_picked_up(
    conn: &Connection,
    staff_id: &Uuid,
    dispense_id: &Uuid,
    date: NaiveDate,
) -> Result<MedicationDispense, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Pharmacist])?;
    db::set_dispense_picked_up(conn, dispense_id, date)?;
    db::get_dispense(conn, dispense_id)?
        .ok_or_else(|| ServiceError::not_found("MedicationDispense", dispense_id))
}

// ── Inventory ────────────────────────────────────────────────

pub fn create_medication(
    conn: &Connection,
    staff_id: &Uuid,
    new: &NewMedication,
) -> Result<MedicationInventory, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Pharmacist])?;

    if new.name.trim().is_empty() {
        return Err(ServiceError::Validation("Medication name is required".into()));
    }
    if new.quantity < 0 || new.unit_price < 0 {
        return Err(ServiceError::Validation(
            "Quantity and unit price cannot be negative".into(),
        ));
    }

    let item = MedicationInventory {
        id: Uuid::new_v4(),
        name: new.name.trim().to_string(),
        category: new.category.clone(),
        quantity: new.quantity,
        unit_price: new.unit_price,
        expiry_date: new.expiry_date,
    };
    db::insert_medication(conn, &item)?;
    Ok(item)
}

pub fn update_medication(
    conn: &Connection,
    staff_id: &Uuid,
    id: &Uuid,
    changes: &MedicationChanges,
) -> Result<MedicationInventory, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Pharmacist])?;

    let mut item = db::get_medication(conn, id)?
        .ok_or_else(|| ServiceError::not_found("MedicationInventory", id))?;

    if let Some(name) = &changes.name {
        item.name = name.trim().to_string();
    }
    if let Some(category) = &changes.category {
        item.category = Some(category.clone());
    }
    if let Some(quantity) = changes.quantity {
        if quantity < 0 {
            return Err(ServiceError::Validation("Quantity cannot be negative".into()));
        }
        item.quantity = quantity;
    }
    if let Some(unit_price) = changes.unit_price {
        item.unit_price = unit_price;
    }
    if let Some(expiry_date) = changes.expiry_date {
        item.expiry_date = Some(expiry_date);
    }

    db::update_medication(conn, &item)?;
    Ok(item)
}

pub fn delete_medication(conn: &Connection, staff_id: &Uuid, id: &Uuid) -> Result<(), ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Pharmacist])?;
    db::delete_medication(conn, id)?;
    Ok(())
}

pub fn list_medications(
    conn: &Connection,
    filter: &InventoryFilter,
) -> Result<Vec<MedicationInventory>, ServiceError> {
    Ok(db::list_medications(conn, filter)?)
}

pub fn low_stock(conn: &Connection, config: &Config) -> Result<Vec<MedicationInventory>, ServiceError> {
    Ok(db::list_low_stock(conn, config.low_stock_threshold)?)
}
