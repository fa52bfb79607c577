use uuid::Uuid;

use super::enums::{AppointmentStatus, ReferralStatus, StaffRole};

#[derive(Debug, Default)]
pub struct PatientFilter {
    /// Case-insensitive substring over name, email, phone.
    pub search: Option<String>,
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    /// Case-insensitive substring over patient or doctor name.
    pub search: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Default)]
pub struct InventoryFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default)]
pub struct ReferralFilter {
    pub patient_id: Option<Uuid>,
    pub specialist_id: Option<Uuid>,
    pub status: Option<ReferralStatus>,
}

#[derive(Debug, Default)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
}
