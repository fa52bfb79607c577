//! Clinical workflow: diagnoses, the lab test request lifecycle, result
//! finalization, and the lab dashboard stats.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::{StaffRole, TestRequestStatus};
use crate::models::{Diagnosis, TestRequest, TestResult};
use crate::scheduling::week_start;

const LAB_ROLES: &[StaffRole] = &[StaffRole::LabTechnician, StaffRole::Doctor];

#[derive(Debug, Clone, Deserialize)]
pub struct NewDiagnosis {
    pub patient_id: Uuid,
    pub summary: String,
    pub detail: Option<String>,
    /// Lab tests ordered alongside the diagnosis, by test type name.
    #[serde(default)]
    pub test_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisWithTests {
    #[serde(flatten)]
    pub diagnosis: Diagnosis,
    pub test_requests: Vec<TestRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTestResult {
    pub test_request_id: Uuid,
    pub result: String,
    pub report_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupCount {
    pub label: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabStats {
    pub by_type: Vec<GroupCount>,
    pub by_status: Vec<GroupCount>,
    pub pending: i64,
    pub completed_today: i64,
    pub week_total: i64,
    /// ceil(pending × configured urgent ratio).
    pub urgent: i64,
}

/// Record a diagnosis and its ordered tests atomically. The acting staff
/// member is the diagnosing doctor.
pub fn create_diagnosis(
    conn: &mut Connection,
    staff_id: &Uuid,
    new: &NewDiagnosis,
    now: NaiveDateTime,
) -> Result<DiagnosisWithTests, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Doctor])?;

    if new.summary.trim().is_empty() {
        return Err(ServiceError::Validation("Diagnosis summary is required".into()));
    }
    db::get_patient(conn, &new.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", new.patient_id))?;

    let tx = conn.transaction().map_err(crate::db::DatabaseError::Sqlite)?;

    let diagnosis = Diagnosis {
        id: Uuid::new_v4(),
        patient_id: new.patient_id,
        doctor_id: *staff_id,
        summary: new.summary.trim().to_string(),
        detail: new.detail.clone(),
        created_at: now,
    };
    db::insert_diagnosis(&tx, &diagnosis)?;

    let mut test_requests = Vec::with_capacity(new.test_types.len());
    for test_type in &new.test_types {
        if test_type.trim().is_empty() {
            return Err(ServiceError::Validation("Test type cannot be empty".into()));
        }
        let request = TestRequest {
            id: Uuid::new_v4(),
            diagnosis_id: diagnosis.id,
            test_type: test_type.trim().to_string(),
            status: TestRequestStatus::Requested,
            billed: false,
            created_at: now,
        };
        db::insert_test_request(&tx, &request)?;
        test_requests.push(request);
    }

    tx.commit().map_err(crate::db::DatabaseError::Sqlite)?;
    tracing::info!(
        diagnosis_id = %diagnosis.id,
        tests = test_requests.len(),
        "Diagnosis recorded"
    );
    Ok(DiagnosisWithTests {
        diagnosis,
        test_requests,
    })
}

pub fn get_diagnosis(conn: &Connection, id: &Uuid) -> Result<DiagnosisWithTests, ServiceError> {
    let diagnosis =
        db::get_diagnosis(conn, id)?.ok_or_else(|| ServiceError::not_found("Diagnosis", id))?;
    let test_requests = db::list_test_requests_by_diagnosis(conn, id)?;
    Ok(DiagnosisWithTests {
        diagnosis,
        test_requests,
    })
}

pub fn get_test_request(conn: &Connection, id: &Uuid) -> Result<TestRequest, ServiceError> {
    db::get_test_request(conn, id)?.ok_or_else(|| ServiceError::not_found("TestRequest", id))
}

pub fn list_test_requests(
    conn: &Connection,
    status: TestRequestStatus,
) -> Result<Vec<TestRequest>, ServiceError> {
    Ok(db::list_test_requests_by_status(conn, status)?)
}

/// Move a test request along its lifecycle. Completion happens only
/// through [`record_test_result`].
pub fn update_test_request(
    conn: &Connection,
    staff_id: &Uuid,
    id: &Uuid,
    status: TestRequestStatus,
) -> Result<TestRequest, ServiceError> {
    auth::authorize(conn, staff_id, LAB_ROLES)?;

    let mut request =
        db::get_test_request(conn, id)?.ok_or_else(|| ServiceError::not_found("TestRequest", id))?;

    if status == TestRequestStatus::Completed {
        return Err(ServiceError::Validation(
            "Completion requires recording a test result".into(),
        ));
    }
    if !request.status.can_transition_to(status) {
        return Err(ServiceError::InvalidTransition {
            from: request.status.as_str().into(),
            to: status.as_str().into(),
        });
    }
    db::set_test_request_status(conn, id, status)?;
    request.status = status;
    Ok(request)
}

/// Finalize a test: flip the request to completed and store the result
/// in one transaction. A second call for the same request fails and
/// leaves the single existing row untouched.
pub fn record_test_result(
    conn: &mut Connection,
    staff_id: &Uuid,
    new: &NewTestResult,
    now: NaiveDateTime,
) -> Result<TestResult, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::LabTechnician])?;

    let tx = conn.transaction().map_err(crate::db::DatabaseError::Sqlite)?;

    let request = db::get_test_request(&tx, &new.test_request_id)?
        .ok_or_else(|| ServiceError::not_found("TestRequest", new.test_request_id))?;
    if !matches!(
        request.status,
        TestRequestStatus::Requested | TestRequestStatus::InProgress
    ) {
        return Err(ServiceError::InvalidTransition {
            from: request.status.as_str().into(),
            to: TestRequestStatus::Completed.as_str().into(),
        });
    }

    let diagnosis = db::get_diagnosis(&tx, &request.diagnosis_id)?
        .ok_or_else(|| ServiceError::not_found("Diagnosis", request.diagnosis_id))?;

    db::set_test_request_status(&tx, &request.id, TestRequestStatus::Completed)?;
    let result = TestResult {
        id: Uuid::new_v4(),
        test_request_id: request.id,
        patient_id: diagnosis.patient_id,
        technician_id: *staff_id,
        result: new.result.clone(),
        report_url: new.report_url.clone(),
        created_at: now,
    };
    db::insert_test_result(&tx, &result)?;

    tx.commit().map_err(crate::db::DatabaseError::Sqlite)?;
    tracing::info!(test_request_id = %request.id, "Test result recorded");
    Ok(result)
}

pub fn test_stats(
    conn: &Connection,
    config: &Config,
    today: NaiveDate,
) -> Result<LabStats, ServiceError> {
    let by_type = db::count_tests_by_type(conn)?
        .into_iter()
        .map(|(label, total)| GroupCount { label, total })
        .collect();
    let by_status = db::count_tests_by_status(conn)?
        .into_iter()
        .map(|(label, total)| GroupCount { label, total })
        .collect();
    let pending = db::count_pending_tests(conn)?;
    let completed_today = db::count_results_on(conn, today)?;
    let start = week_start(today);
    let week_total = db::count_requests_between(conn, start, start + Duration::days(6))?;
    let urgent = (pending as f64 * config.urgent_test_ratio).ceil() as i64;

    Ok(LabStats {
        by_type,
        by_status,
        pending,
        completed_today,
        week_total,
        urgent,
    })
}
