//! Staff account endpoints. Account creation is admin-only.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::auth::{self, NewStaff};
use crate::models::enums::StaffRole;
use crate::models::filters::StaffFilter;
use crate::models::StaffSummary;

#[derive(Deserialize)]
pub struct StaffListQuery {
    pub role: Option<String>,
}

/// `GET /api/staff`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<StaffListQuery>,
) -> Result<Json<Vec<StaffSummary>>, ApiError> {
    let role = query
        .role
        .as_deref()
        .map(StaffRole::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let conn = ctx.open_db()?;
    let members = auth::list_staff(&conn, &StaffFilter { role })?;
    Ok(Json(members))
}

#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: StaffRole,
}

/// `POST /api/staff`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<CreateStaffRequest>,
) -> Result<Json<StaffSummary>, ApiError> {
    let conn = ctx.open_db()?;
    auth::authorize(&conn, &staff.staff_id, &[StaffRole::Admin])?;
    let created = auth::create_staff(
        &conn,
        &NewStaff {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role,
        },
    )?;
    Ok(Json(created))
}
