use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::enums::StaffRole;

/// Errors surfaced by the service layer. Each variant maps to a
/// machine-readable API code; callers never parse message strings.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i64, available: i64 },

    #[error("Operation requires one of roles: {required:?}")]
    Unauthorized { required: Vec<StaffRole> },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(err))
    }
}
