use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::InvoiceStatus;
use crate::models::{Invoice, InvoiceItem};

pub fn insert_invoice(conn: &Connection, invoice: &Invoice) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO invoices (id, invoice_number, patient_id, amount, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            invoice.id.to_string(),
            invoice.invoice_number,
            invoice.patient_id.to_string(),
            invoice.amount,
            invoice.status.as_str(),
            fmt_datetime(&invoice.created_at),
        ],
    )?;
    Ok(())
}

pub fn insert_invoice_item(conn: &Connection, item: &InvoiceItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO invoice_items (id, invoice_id, description, amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            item.id.to_string(),
            item.invoice_id.to_string(),
            item.description,
            item.amount,
        ],
    )?;
    Ok(())
}

pub fn get_invoice(conn: &Connection, id: &Uuid) -> Result<Option<Invoice>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_number, patient_id, amount, status, created_at
         FROM invoices WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(invoice_row(row)));
    match result {
        Ok(row) => Ok(Some(invoice_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_invoices_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Invoice>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_number, patient_id, amount, status, created_at
         FROM invoices WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| Ok(invoice_row(row)))?;

    let mut invoices = Vec::new();
    for row in rows {
        invoices.push(invoice_from_row(row??)?);
    }
    Ok(invoices)
}

pub fn list_invoice_items(
    conn: &Connection,
    invoice_id: &Uuid,
) -> Result<Vec<InvoiceItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_id, description, amount FROM invoice_items WHERE invoice_id = ?1",
    )?;
    let rows = stmt.query_map(params![invoice_id.to_string()], |row| {
        Ok(ItemRow {
            id: row.get(0)?,
            invoice_id: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
        })
    })?;

    let mut items = Vec::new();
    for row in rows {
        let r = row?;
        items.push(InvoiceItem {
            id: parse_uuid(&r.id)?,
            invoice_id: parse_uuid(&r.invoice_id)?,
            description: r.description,
            amount: r.amount,
        });
    }
    Ok(items)
}

pub fn set_invoice_paid(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE invoices SET status = 'paid' WHERE id = ?1",
        params![id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Invoice".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct InvoiceRow {
    id: String,
    invoice_number: String,
    patient_id: String,
    amount: i64,
    status: String,
    created_at: String,
}

struct ItemRow {
    id: String,
    invoice_id: String,
    description: String,
    amount: i64,
}

fn invoice_row(row: &rusqlite::Row<'_>) -> Result<InvoiceRow, rusqlite::Error> {
    Ok(InvoiceRow {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        patient_id: row.get(2)?,
        amount: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn invoice_from_row(row: InvoiceRow) -> Result<Invoice, DatabaseError> {
    Ok(Invoice {
        id: parse_uuid(&row.id)?,
        invoice_number: row.invoice_number,
        patient_id: parse_uuid(&row.patient_id)?,
        amount: row.amount,
        status: InvoiceStatus::from_str(&row.status)?,
        created_at: parse_datetime(&row.created_at)?,
    })
}
