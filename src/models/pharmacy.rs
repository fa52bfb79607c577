use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationInventory {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    /// Integer shillings per unit.
    pub unit_price: i64,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationDispense {
    pub id: Uuid,
    pub prescription_medication_id: Uuid,
    pub patient_id: Uuid,
    pub pharmacist_id: Uuid,
    pub quantity: i64,
    pub picked_up: bool,
    pub pickup_date: Option<NaiveDate>,
    pub billed: bool,
    pub created_at: NaiveDateTime,
}
