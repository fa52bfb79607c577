use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub diagnosis_id: Uuid,
    pub created_at: NaiveDateTime,
}

/// One prescribed medication line. `inventory_item_id` is resolved when
/// the doctor prescribes; lines without it cannot be dispensed from stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionMedication {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub inventory_item_id: Option<Uuid>,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
}
