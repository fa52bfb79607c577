//! Pre-shaped flat payloads for the print templates: receipts,
//! prescription sheets, and lab reports. Rendering happens client-side;
//! this module only assembles the data.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::{PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationBlock {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl OrganizationBlock {
    fn from_config(config: &Config) -> Self {
        Self {
            name: config.organization.name.clone(),
            address: config.organization.address.clone(),
            phone: config.organization.phone.clone(),
            email: config.organization.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptData {
    pub organization: OrganizationBlock,
    pub receipt_number: String,
    pub patient_name: String,
    pub cashier_name: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
    pub paid_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionSheetLine {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionSheet {
    pub organization: OrganizationBlock,
    pub patient_name: String,
    pub diagnosis_summary: String,
    pub doctor_name: String,
    pub issued_at: NaiveDateTime,
    pub lines: Vec<PrescriptionSheetLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabReport {
    pub organization: OrganizationBlock,
    pub patient_name: String,
    pub test_type: String,
    pub result: String,
    pub report_url: Option<String>,
    pub technician_name: String,
    pub recorded_at: NaiveDateTime,
}

pub fn receipt_data(
    conn: &Connection,
    config: &Config,
    payment_id: &Uuid,
) -> Result<ReceiptData, ServiceError> {
    let payment = db::get_payment(conn, payment_id)?
        .ok_or_else(|| ServiceError::not_found("Payment", payment_id))?;
    let patient = db::get_patient(conn, &payment.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", payment.patient_id))?;
    let cashier = db::get_staff(conn, &payment.cashier_id)?
        .ok_or_else(|| ServiceError::not_found("Staff", payment.cashier_id))?;
    let invoice_number = match payment.invoice_id {
        Some(invoice_id) => db::get_invoice(conn, &invoice_id)?.map(|i| i.invoice_number),
        None => None,
    };

    Ok(ReceiptData {
        organization: OrganizationBlock::from_config(config),
        receipt_number: payment.receipt_number,
        patient_name: patient.full_name(),
        cashier_name: cashier.name,
        amount: payment.amount,
        method: payment.method,
        status: payment.status,
        description: payment.description,
        invoice_number,
        paid_at: payment.created_at,
    })
}

pub fn prescription_sheet(
    conn: &Connection,
    config: &Config,
    prescription_id: &Uuid,
) -> Result<PrescriptionSheet, ServiceError> {
    let prescription = db::get_prescription(conn, prescription_id)?
        .ok_or_else(|| ServiceError::not_found("Prescription", prescription_id))?;
    let patient = db::get_patient(conn, &prescription.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", prescription.patient_id))?;
    let diagnosis = db::get_diagnosis(conn, &prescription.diagnosis_id)?
        .ok_or_else(|| ServiceError::not_found("Diagnosis", prescription.diagnosis_id))?;
    let doctor = db::get_staff(conn, &diagnosis.doctor_id)?
        .ok_or_else(|| ServiceError::not_found("Staff", diagnosis.doctor_id))?;

    let lines = db::list_medications_for_prescription(conn, prescription_id)?
        .into_iter()
        .map(|line| PrescriptionSheetLine {
            medication_name: line.medication_name,
            dosage: line.dosage,
            frequency: line.frequency,
            duration: line.duration,
            notes: line.notes,
        })
        .collect();

    Ok(PrescriptionSheet {
        organization: OrganizationBlock::from_config(config),
        patient_name: patient.full_name(),
        diagnosis_summary: diagnosis.summary,
        doctor_name: doctor.name,
        issued_at: prescription.created_at,
        lines,
    })
}

pub fn lab_report(
    conn: &Connection,
    config: &Config,
    result_id: &Uuid,
) -> Result<LabReport, ServiceError> {
    let result = db::get_test_result(conn, result_id)?
        .ok_or_else(|| ServiceError::not_found("TestResult", result_id))?;
    let request = db::get_test_request(conn, &result.test_request_id)?
        .ok_or_else(|| ServiceError::not_found("TestRequest", result.test_request_id))?;
    let patient = db::get_patient(conn, &result.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", result.patient_id))?;
    let technician = db::get_staff(conn, &result.technician_id)?
        .ok_or_else(|| ServiceError::not_found("Staff", result.technician_id))?;

    Ok(LabReport {
        organization: OrganizationBlock::from_config(config),
        patient_name: patient.full_name(),
        test_type: request.test_type,
        result: result.result,
        report_url: result.report_url,
        technician_name: technician.name,
        recorded_at: result.created_at,
    })
}
