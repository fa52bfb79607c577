use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A doctor's clinical note for a patient visit. `summary` and `detail`
/// are separate columns; nothing is packed into delimited strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub summary: String,
    pub detail: Option<String>,
    pub created_at: NaiveDateTime,
}
