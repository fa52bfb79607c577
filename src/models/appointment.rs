use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentPayment, AppointmentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: AppointmentPayment,
    pub created_at: NaiveDateTime,
}
