//! Invoicing and payment endpoints.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::billing::{self, InvoiceWithItems, MonthTotal, PaymentRequest, PaymentStats};
use crate::models::{Invoice, Payment};

#[derive(Deserialize)]
pub struct GenerateInvoiceRequest {
    pub patient_id: Uuid,
}

/// `POST /api/billing/invoices`
pub async fn generate_invoice(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<GenerateInvoiceRequest>,
) -> Result<Json<InvoiceWithItems>, ApiError> {
    let mut conn = ctx.open_db()?;
    let invoice =
        billing::generate_invoice(&mut conn, &staff.staff_id, &ctx.config, &req.patient_id, now())?;
    Ok(Json(invoice))
}

/// `GET /api/billing/invoices/:id`
pub async fn invoice_detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceWithItems>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(billing::get_invoice(&conn, &id)?))
}

#[derive(Deserialize)]
pub struct PatientQuery {
    pub patient_id: Uuid,
}

/// `GET /api/billing/invoices?patient_id=...`
pub async fn list_invoices(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(billing::list_invoices(&conn, &query.patient_id)?))
}

/// `POST /api/billing/payments`
pub async fn process_payment(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Payment>, ApiError> {
    let mut conn = ctx.open_db()?;
    let payment = billing::process_payment(&mut conn, &staff.staff_id, &req, now())?;
    Ok(Json(payment))
}

/// `GET /api/billing/payments?patient_id=...`
pub async fn list_payments(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(billing::list_payments(&conn, &query.patient_id)?))
}

/// `POST /api/billing/payments/:id/refund`
pub async fn refund_payment(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ApiError> {
    let conn = ctx.open_db()?;
    let payment = billing::refund_payment(&conn, &staff.staff_id, &id)?;
    Ok(Json(payment))
}

/// `GET /api/billing/payments/stats`
pub async fn payment_stats(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<PaymentStats>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(billing::payment_stats(&conn, now())?))
}

#[derive(Deserialize)]
pub struct RevenueQuery {
    pub year: i32,
}

/// `GET /api/billing/revenue?year=2026`
pub async fn revenue_by_month(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<Vec<MonthTotal>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(billing::revenue_by_month(&conn, query.year)?))
}
