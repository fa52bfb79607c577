//! Matibabu: hospital and laboratory management backend.
//!
//! Service modules own the domain rules (registry, scheduling, clinical,
//! pharmacy, billing, referrals, reporting, printing); the `api` module
//! exposes them over HTTP. All state lives in SQLite.

pub mod api;
pub mod auth;
pub mod billing;
pub mod clinical;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pharmacy;
pub mod printing;
pub mod referrals;
pub mod registry;
pub mod reporting;
pub mod scheduling;

#[cfg(test)]
pub(crate) mod testutil;

use tracing_subscriber::EnvFilter;

use crate::api::router::api_router;
use crate::config::Config;
use crate::error::ServiceError;

/// Initialize tracing, prepare the database, and serve the API until
/// the process is stopped.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env();
    if let Some(dir) = config.database_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    // Open once at startup so migrations run before the first request.
    let conn = db::open_database(&config.database_path)?;
    let tables = db::count_tables(&conn)?;
    tracing::info!(path = %config.database_path.display(), tables, "Database ready");
    drop(conn);

    ensure_admin_account(&config)?;

    let bind_addr = config.bind_addr.clone();
    let app = api_router(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// First-run bootstrap: without at least one admin account nobody can
/// log in to create the rest of the staff.
fn ensure_admin_account(config: &Config) -> Result<(), ServiceError> {
    let conn = db::open_database(&config.database_path)?;
    let admins = auth::list_staff(
        &conn,
        &models::filters::StaffFilter {
            role: Some(models::enums::StaffRole::Admin),
        },
    )?;
    if !admins.is_empty() {
        return Ok(());
    }

    let password = std::env::var("MATIBABU_ADMIN_PASSWORD").unwrap_or_else(|_| {
        let generated = auth::generate_token();
        tracing::warn!("No MATIBABU_ADMIN_PASSWORD set; generated admin password: {generated}");
        generated
    });
    auth::create_staff(
        &conn,
        &auth::NewStaff {
            name: "Administrator".into(),
            email: "admin@matibabu.example".into(),
            password,
            role: models::enums::StaffRole::Admin,
        },
    )?;
    tracing::info!("Bootstrap admin account created (admin@matibabu.example)");
    Ok(())
}
