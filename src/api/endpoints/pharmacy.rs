//! Prescription, dispensing, and inventory endpoints.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::models::filters::InventoryFilter;
use crate::models::{MedicationDispense, MedicationInventory};
use crate::pharmacy::{
    self, DispenseRequest, MedicationChanges, NewMedication, NewPrescription,
};
use crate::registry::PrescriptionView;

/// `POST /api/prescriptions`
pub async fn create_prescription(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewPrescription>,
) -> Result<Json<PrescriptionView>, ApiError> {
    let mut conn = ctx.open_db()?;
    let view = pharmacy::create_prescription(&mut conn, &staff.staff_id, &req, now())?;
    Ok(Json(view))
}

/// `GET /api/prescriptions/:id`
pub async fn prescription_detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<PrescriptionView>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(pharmacy::get_prescription(&conn, &id)?))
}

#[derive(Deserialize)]
pub struct PrescriptionListQuery {
    pub patient_id: Uuid,
}

/// `GET /api/prescriptions?patient_id=...`
pub async fn list_prescriptions(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<PrescriptionListQuery>,
) -> Result<Json<Vec<PrescriptionView>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(pharmacy::list_prescriptions(&conn, &query.patient_id)?))
}

/// `POST /api/pharmacy/dispense`
pub async fn dispense(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<DispenseRequest>,
) -> Result<Json<MedicationDispense>, ApiError> {
    let mut conn = ctx.open_db()?;
    let dispense = pharmacy::dispense_medication(&mut conn, &staff.staff_id, &req, now())?;
    Ok(Json(dispense))
}

/// `PUT /api/pharmacy/dispense/:id/pickup`
pub async fn mark_picked_up(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicationDispense>, ApiError> {
    let conn = ctx.open_db()?;
    let dispense = pharmacy::mark_picked_up(&conn, &staff.staff_id, &id, now().date())?;
    Ok(Json(dispense))
}

#[derive(Deserialize)]
pub struct InventoryListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

/// `GET /api/pharmacy/inventory`
pub async fn list_inventory(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(query): Query<InventoryListQuery>,
) -> Result<Json<Vec<MedicationInventory>>, ApiError> {
    let conn = ctx.open_db()?;
    let items = pharmacy::list_medications(
        &conn,
        &InventoryFilter {
            search: query.q,
            category: query.category,
        },
    )?;
    Ok(Json(items))
}

/// `GET /api/pharmacy/inventory/low-stock`
pub async fn low_stock(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<Vec<MedicationInventory>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(pharmacy::low_stock(&conn, &ctx.config)?))
}

/// `POST /api/pharmacy/inventory`
pub async fn create_inventory(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(req): Json<NewMedication>,
) -> Result<Json<MedicationInventory>, ApiError> {
    let conn = ctx.open_db()?;
    let item = pharmacy::create_medication(&conn, &staff.staff_id, &req)?;
    Ok(Json(item))
}

/// `PUT /api/pharmacy/inventory/:id`
pub async fn update_inventory(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<MedicationChanges>,
) -> Result<Json<MedicationInventory>, ApiError> {
    let conn = ctx.open_db()?;
    let item = pharmacy::update_medication(&conn, &staff.staff_id, &id, &req)?;
    Ok(Json(item))
}

/// `DELETE /api/pharmacy/inventory/:id`
pub async fn delete_inventory(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.open_db()?;
    pharmacy::delete_medication(&conn, &staff.staff_id, &id)?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
