//! Specialist referral endpoints.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::models::enums::ReferralStatus;
use crate::models::filters::ReferralFilter;
use crate::models::Referral;
use crate::referrals::{self, NewReferral};

#[derive(Deserialize)]
pub struct ReferralListQuery {
    pub patient_id: Option<Uuid>,
    pub specialist_id: Option<Uuid>,
    pub status: Option<String>,
}

/// `GET /api/referrals`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<ReferralListQuery>,
) -> Result<Json<Vec<Referral>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(ReferralStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let conn = ctx.open_db()?;
    let referrals = referrals::list_referrals(
        &conn,
        &ReferralFilter {
            patient_id: query.patient_id,
            specialist_id: query.specialist_id,
            status,
        },
    )?;
    Ok(Json(referrals))
}

/// `POST /api/referrals`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewReferral>,
) -> Result<Json<Referral>, ApiError> {
    let conn = ctx.open_db()?;
    let referral = referrals::create_referral(&conn, &staff.staff_id, &req, now())?;
    Ok(Json(referral))
}

/// `GET /api/referrals/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Referral>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(referrals::get_referral(&conn, &id)?))
}

#[derive(Deserialize)]
pub struct ReferralStatusUpdate {
    pub status: ReferralStatus,
}

/// `PUT /api/referrals/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReferralStatusUpdate>,
) -> Result<Json<Referral>, ApiError> {
    let conn = ctx.open_db()?;
    let referral = referrals::update_referral_status(&conn, &staff.staff_id, &id, req.status)?;
    Ok(Json(referral))
}
