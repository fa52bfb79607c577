//! Patient registry endpoints.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::registry::{self, NewPatient, PatientChanges, PatientDetail, PatientSummary};

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub q: Option<String>,
}

/// `GET /api/patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<PatientSummary>>, ApiError> {
    let conn = ctx.open_db()?;
    let patients = registry::list_patients(&conn, query.q.as_deref())?;
    Ok(Json(patients))
}

/// `GET /api/patients/:id` returns the full aggregate.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatientDetail>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(registry::get_patient(&conn, &id)?))
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewPatient>,
) -> Result<Json<crate::models::Patient>, ApiError> {
    let conn = ctx.open_db()?;
    let patient = registry::create_patient(&conn, &staff.staff_id, &req, now())?;
    Ok(Json(patient))
}

/// `PUT /api/patients/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatientChanges>,
) -> Result<Json<crate::models::Patient>, ApiError> {
    let conn = ctx.open_db()?;
    let patient = registry::update_patient(&conn, &staff.staff_id, &id, &req)?;
    Ok(Json(patient))
}

/// `DELETE /api/patients/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.open_db()?;
    registry::delete_patient(&conn, &staff.staff_id, &id)?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
