//! Dashboard report endpoints.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::clinical::GroupCount;
use crate::reporting::{self, MonthCount};

#[derive(Deserialize)]
pub struct YearQuery {
    pub year: i32,
}

/// `GET /api/reports/registrations?year=2026`
pub async fn registrations(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<YearQuery>,
) -> Result<Json<Vec<MonthCount>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(reporting::registrations_by_month(&conn, query.year)?))
}

/// `GET /api/reports/test-distribution`
pub async fn test_distribution(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<Vec<GroupCount>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(reporting::test_type_distribution(&conn)?))
}
