//! Diagnosis and lab workflow endpoints.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::clinical::{self, DiagnosisWithTests, LabStats, NewDiagnosis, NewTestResult};
use crate::models::enums::TestRequestStatus;
use crate::models::{TestRequest, TestResult};

/// `POST /api/diagnoses`
pub async fn create_diagnosis(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewDiagnosis>,
) -> Result<Json<DiagnosisWithTests>, ApiError> {
    let mut conn = ctx.open_db()?;
    let created = clinical::create_diagnosis(&mut conn, &staff.staff_id, &req, now())?;
    Ok(Json(created))
}

/// `GET /api/diagnoses/:id`
pub async fn diagnosis_detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<DiagnosisWithTests>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(clinical::get_diagnosis(&conn, &id)?))
}

#[derive(Deserialize)]
pub struct TestRequestListQuery {
    pub status: String,
}

/// `GET /api/test-requests?status=requested`
pub async fn list_test_requests(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<TestRequestListQuery>,
) -> Result<Json<Vec<TestRequest>>, ApiError> {
    let status = TestRequestStatus::from_str(&query.status)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let conn = ctx.open_db()?;
    Ok(Json(clinical::list_test_requests(&conn, status)?))
}

#[derive(Deserialize)]
pub struct TestRequestStatusUpdate {
    pub status: TestRequestStatus,
}

/// `PUT /api/test-requests/:id/status`
pub async fn update_test_request(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<TestRequestStatusUpdate>,
) -> Result<Json<TestRequest>, ApiError> {
    let conn = ctx.open_db()?;
    let request = clinical::update_test_request(&conn, &staff.staff_id, &id, req.status)?;
    Ok(Json(request))
}

/// `POST /api/test-requests/result`
pub async fn record_result(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewTestResult>,
) -> Result<Json<TestResult>, ApiError> {
    let mut conn = ctx.open_db()?;
    let result = clinical::record_test_result(&mut conn, &staff.staff_id, &req, now())?;
    Ok(Json(result))
}

/// `GET /api/lab/stats`
pub async fn lab_stats(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<LabStats>, ApiError> {
    let conn = ctx.open_db()?;
    let stats = clinical::test_stats(&conn, &ctx.config, now().date())?;
    Ok(Json(stats))
}
