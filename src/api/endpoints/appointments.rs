//! Appointment scheduling endpoints.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::models::enums::AppointmentStatus;
use crate::models::filters::AppointmentFilter;
use crate::models::Appointment;
use crate::scheduling::{self, AppointmentChanges, DayStats, NewAppointment};

#[derive(Deserialize)]
pub struct AppointmentListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(AppointmentStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let conn = ctx.open_db()?;
    let appointments = scheduling::list_appointments(
        &conn,
        &AppointmentFilter {
            search: query.q,
            status,
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
        },
    )?;
    Ok(Json(appointments))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(scheduling::get_appointment(&conn, &id)?))
}

/// `POST /api/appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewAppointment>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.open_db()?;
    let appointment = scheduling::create_appointment(&conn, &staff.staff_id, &req, now())?;
    Ok(Json(appointment))
}

/// `PUT /api/appointments/:id`: reschedule, annotate, or move status
/// along the forward graph.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AppointmentChanges>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.open_db()?;
    let appointment = scheduling::update_appointment(&conn, &staff.staff_id, &id, &req)?;
    Ok(Json(appointment))
}

/// `GET /api/appointments/stats/weekly`
pub async fn weekly_stats(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<Vec<DayStats>>, ApiError> {
    let conn = ctx.open_db()?;
    let stats = scheduling::weekly_appointment_stats(&conn, now().date())?;
    Ok(Json(stats))
}
