use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::TestRequestStatus;
use crate::models::{TestRequest, TestResult};

const REQUEST_COLUMNS: &str = "id, diagnosis_id, test_type, status, billed, created_at";
const RESULT_COLUMNS: &str =
    "id, test_request_id, patient_id, technician_id, result, report_url, created_at";

pub fn insert_test_request(conn: &Connection, request: &TestRequest) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO test_requests (id, diagnosis_id, test_type, status, billed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            request.id.to_string(),
            request.diagnosis_id.to_string(),
            request.test_type,
            request.status.as_str(),
            request.billed as i32,
            fmt_datetime(&request.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_test_request(conn: &Connection, id: &Uuid) -> Result<Option<TestRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM test_requests WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(request_row(row)));
    match result {
        Ok(row) => Ok(Some(request_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_test_request_status(
    conn: &Connection,
    id: &Uuid,
    status: TestRequestStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE test_requests SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "TestRequest".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn list_test_requests_by_diagnosis(
    conn: &Connection,
    diagnosis_id: &Uuid,
) -> Result<Vec<TestRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM test_requests
         WHERE diagnosis_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![diagnosis_id.to_string()], |row| {
        Ok(request_row(row))
    })?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(request_from_row(row??)?);
    }
    Ok(requests)
}

pub fn list_test_requests_by_status(
    conn: &Connection,
    status: TestRequestStatus,
) -> Result<Vec<TestRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM test_requests
         WHERE status = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![status.as_str()], |row| Ok(request_row(row)))?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(request_from_row(row??)?);
    }
    Ok(requests)
}

pub fn insert_test_result(conn: &Connection, result: &TestResult) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO test_results (id, test_request_id, patient_id, technician_id,
         result, report_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            result.id.to_string(),
            result.test_request_id.to_string(),
            result.patient_id.to_string(),
            result.technician_id.to_string(),
            result.result,
            result.report_url,
            fmt_datetime(&result.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_test_result(conn: &Connection, id: &Uuid) -> Result<Option<TestResult>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM test_results WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(result_row(row)));
    match result {
        Ok(row) => Ok(Some(result_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_test_result_by_request(
    conn: &Connection,
    test_request_id: &Uuid,
) -> Result<Option<TestResult>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM test_results WHERE test_request_id = ?1"
    ))?;
    let result = stmt.query_row(params![test_request_id.to_string()], |row| {
        Ok(result_row(row))
    });
    match result {
        Ok(row) => Ok(Some(result_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_test_results_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<TestResult>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM test_results
         WHERE patient_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| Ok(result_row(row)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(result_from_row(row??)?);
    }
    Ok(results)
}

// ── Stats queries ────────────────────────────────────────────

pub fn count_tests_by_type(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    grouped_counts(conn, "SELECT test_type, COUNT(*) FROM test_requests GROUP BY test_type")
}

pub fn count_tests_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    grouped_counts(conn, "SELECT status, COUNT(*) FROM test_requests GROUP BY status")
}

pub fn count_pending_tests(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM test_requests WHERE status IN ('requested', 'in_progress')",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Results recorded on the given calendar day.
pub fn count_results_on(conn: &Connection, day: NaiveDate) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM test_results WHERE date(created_at) = ?1",
        params![day.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_requests_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM test_requests WHERE date(created_at) BETWEEN ?1 AND ?2",
        params![from.to_string(), to.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_unbilled_completed_tests(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM test_requests tr
         JOIN diagnoses d ON d.id = tr.diagnosis_id
         WHERE d.patient_id = ?1 AND tr.status = 'completed' AND tr.billed = 0",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn mark_completed_tests_billed(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE test_requests SET billed = 1
         WHERE status = 'completed' AND billed = 0
           AND diagnosis_id IN (SELECT id FROM diagnoses WHERE patient_id = ?1)",
        params![patient_id.to_string()],
    )?;
    Ok(changed)
}

fn grouped_counts(conn: &Connection, sql: &str) -> Result<Vec<(String, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

struct RequestRow {
    id: String,
    diagnosis_id: String,
    test_type: String,
    status: String,
    billed: i32,
    created_at: String,
}

fn request_row(row: &rusqlite::Row<'_>) -> Result<RequestRow, rusqlite::Error> {
    Ok(RequestRow {
        id: row.get(0)?,
        diagnosis_id: row.get(1)?,
        test_type: row.get(2)?,
        status: row.get(3)?,
        billed: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn request_from_row(row: RequestRow) -> Result<TestRequest, DatabaseError> {
    Ok(TestRequest {
        id: parse_uuid(&row.id)?,
        diagnosis_id: parse_uuid(&row.diagnosis_id)?,
        test_type: row.test_type,
        status: TestRequestStatus::from_str(&row.status)?,
        billed: row.billed != 0,
        created_at: parse_datetime(&row.created_at)?,
    })
}

struct ResultRow {
    id: String,
    test_request_id: String,
    patient_id: String,
    technician_id: String,
    result: String,
    report_url: Option<String>,
    created_at: String,
}

fn result_row(row: &rusqlite::Row<'_>) -> Result<ResultRow, rusqlite::Error> {
    Ok(ResultRow {
        id: row.get(0)?,
        test_request_id: row.get(1)?,
        patient_id: row.get(2)?,
        technician_id: row.get(3)?,
        result: row.get(4)?,
        report_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn result_from_row(row: ResultRow) -> Result<TestResult, DatabaseError> {
    Ok(TestResult {
        id: parse_uuid(&row.id)?,
        test_request_id: parse_uuid(&row.test_request_id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        technician_id: parse_uuid(&row.technician_id)?,
        result: row.result,
        report_url: row.report_url,
        created_at: parse_datetime(&row.created_at)?,
    })
}
