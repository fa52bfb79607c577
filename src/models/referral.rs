use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReferralStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub referring_doctor_id: Uuid,
    pub specialist_id: Uuid,
    pub reason: String,
    pub notes: Option<String>,
    pub status: ReferralStatus,
    pub created_at: NaiveDateTime,
}
