use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{PaymentMethod, PaymentStatus};
use crate::models::Payment;

const PAYMENT_COLUMNS: &str = "id, receipt_number, patient_id, cashier_id, invoice_id,
     amount, method, status, description, created_at";

pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO payments (id, receipt_number, patient_id, cashier_id, invoice_id,
         amount, method, status, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            payment.id.to_string(),
            payment.receipt_number,
            payment.patient_id.to_string(),
            payment.cashier_id.to_string(),
            payment.invoice_id.map(|id| id.to_string()),
            payment.amount,
            payment.method.as_str(),
            payment.status.as_str(),
            payment.description,
            fmt_datetime(&payment.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_payment(conn: &Connection, id: &Uuid) -> Result<Option<Payment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(payment_row(row)));
    match result {
        Ok(row) => Ok(Some(payment_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_payments_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Payment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments
         WHERE patient_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| Ok(payment_row(row)))?;

    let mut payments = Vec::new();
    for row in rows {
        payments.push(payment_from_row(row??)?);
    }
    Ok(payments)
}

pub fn set_payment_status(
    conn: &Connection,
    id: &Uuid,
    status: PaymentStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE payments SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Payment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// ── Revenue queries (completed payments only) ────────────────

pub fn sum_completed_payments(conn: &Connection) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'completed'",
        [],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of completed payments with date(created_at) in [from, to] inclusive.
pub fn sum_completed_payments_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payments
         WHERE status = 'completed' AND date(created_at) BETWEEN ?1 AND ?2",
        params![from.to_string(), to.to_string()],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn sum_completed_by_method(
    conn: &Connection,
) -> Result<Vec<(String, i64, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT method, COUNT(*), COALESCE(SUM(amount), 0)
         FROM payments WHERE status = 'completed' GROUP BY method",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut breakdown = Vec::new();
    for row in rows {
        breakdown.push(row?);
    }
    Ok(breakdown)
}

/// Completed revenue per calendar month of the given year. Sparse,
/// months with no payments have no row.
pub fn sum_completed_by_month(
    conn: &Connection,
    year: i32,
) -> Result<Vec<(u32, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%m', created_at) AS INTEGER), COALESCE(SUM(amount), 0)
         FROM payments
         WHERE status = 'completed' AND strftime('%Y', created_at) = ?1
         GROUP BY strftime('%m', created_at)",
    )?;
    let rows = stmt.query_map(params![year.to_string()], |row| {
        Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)?))
    })?;

    let mut sums = Vec::new();
    for row in rows {
        sums.push(row?);
    }
    Ok(sums)
}

struct PaymentRow {
    id: String,
    receipt_number: String,
    patient_id: String,
    cashier_id: String,
    invoice_id: Option<String>,
    amount: i64,
    method: String,
    status: String,
    description: Option<String>,
    created_at: String,
}

fn payment_row(row: &rusqlite::Row<'_>) -> Result<PaymentRow, rusqlite::Error> {
    Ok(PaymentRow {
        id: row.get(0)?,
        receipt_number: row.get(1)?,
        patient_id: row.get(2)?,
        cashier_id: row.get(3)?,
        invoice_id: row.get(4)?,
        amount: row.get(5)?,
        method: row.get(6)?,
        status: row.get(7)?,
        description: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, DatabaseError> {
    Ok(Payment {
        id: parse_uuid(&row.id)?,
        receipt_number: row.receipt_number,
        patient_id: parse_uuid(&row.patient_id)?,
        cashier_id: parse_uuid(&row.cashier_id)?,
        invoice_id: row.invoice_id.and_then(|s| Uuid::parse_str(&s).ok()),
        amount: row.amount,
        method: PaymentMethod::from_str(&row.method)?,
        status: PaymentStatus::from_str(&row.status)?,
        description: row.description,
        created_at: parse_datetime(&row.created_at)?,
    })
}
