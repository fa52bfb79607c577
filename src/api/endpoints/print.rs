//! Print payload endpoints. The client renders these flat shapes.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::printing::{self, LabReport, PrescriptionSheet, ReceiptData};

/// `GET /api/print/receipt/:id` where `id` is a payment id.
pub async fn receipt(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceiptData>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(printing::receipt_data(&conn, &ctx.config, &id)?))
}

/// `GET /api/print/prescription/:id`
pub async fn prescription(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<PrescriptionSheet>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(printing::prescription_sheet(&conn, &ctx.config, &id)?))
}

/// `GET /api/print/lab-report/:id` where `id` is a test result id.
pub async fn lab_report(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<LabReport>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(printing::lab_report(&conn, &ctx.config, &id)?))
}
