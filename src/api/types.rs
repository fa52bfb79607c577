//! Shared types for the API layer.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::Config;
use crate::db;
use crate::models::enums::StaffRole;

/// Shared context for all API routes and middleware. Each handler opens
/// its own SQLite connection; WAL keeps concurrent readers happy.
#[derive(Clone)]
pub struct ApiContext {
    pub db_path: Arc<PathBuf>,
    pub config: Arc<Config>,
}

impl ApiContext {
    pub fn new(config: Config) -> Self {
        Self {
            db_path: Arc::new(config.database_path.clone()),
            config: Arc::new(config),
        }
    }

    pub fn open_db(&self) -> Result<Connection, ApiError> {
        db::open_database(&self.db_path).map_err(|e| ApiError::Internal(e.to_string()))
    }
}

/// Authenticated staff context, injected into request extensions by the
/// auth middleware after token validation.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub staff_id: Uuid,
    pub name: String,
    pub role: StaffRole,
}
