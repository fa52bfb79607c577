use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::StaffRole;

/// A staff account. Password material never leaves the db layer.
#[derive(Debug, Clone)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: StaffRole,
}

/// Public projection of a staff member, safe to serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
}

impl From<&Staff> for StaffSummary {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            email: s.email.clone(),
            role: s.role,
        }
    }
}
