use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::TestRequestStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRequest {
    pub id: Uuid,
    pub diagnosis_id: Uuid,
    pub test_type: String,
    pub status: TestRequestStatus,
    pub billed: bool,
    pub created_at: NaiveDateTime,
}

/// Recorded outcome of a completed test request. Exactly one per request
/// (UNIQUE constraint on test_request_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub test_request_id: Uuid,
    pub patient_id: Uuid,
    pub technician_id: Uuid,
    pub result: String,
    pub report_url: Option<String>,
    pub created_at: NaiveDateTime,
}
