use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::ReferralStatus;
use crate::models::filters::ReferralFilter;
use crate::models::Referral;

const REFERRAL_COLUMNS: &str = "id, patient_id, referring_doctor_id, specialist_id,
     reason, notes, status, created_at";

pub fn insert_referral(conn: &Connection, referral: &Referral) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO referrals (id, patient_id, referring_doctor_id, specialist_id,
         reason, notes, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            referral.id.to_string(),
            referral.patient_id.to_string(),
            referral.referring_doctor_id.to_string(),
            referral.specialist_id.to_string(),
            referral.reason,
            referral.notes,
            referral.status.as_str(),
            fmt_datetime(&referral.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_referral(conn: &Connection, id: &Uuid) -> Result<Option<Referral>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(referral_row(row)));
    match result {
        Ok(row) => Ok(Some(referral_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_referral_status(
    conn: &Connection,
    id: &Uuid,
    status: ReferralStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE referrals SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Referral".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn list_referrals(
    conn: &Connection,
    filter: &ReferralFilter,
) -> Result<Vec<Referral>, DatabaseError> {
    let mut sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE 1=1");
    let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(patient_id) = filter.patient_id {
        bindings.push(Box::new(patient_id.to_string()));
        sql.push_str(&format!(" AND patient_id = ?{}", bindings.len()));
    }
    if let Some(specialist_id) = filter.specialist_id {
        bindings.push(Box::new(specialist_id.to_string()));
        sql.push_str(&format!(" AND specialist_id = ?{}", bindings.len()));
    }
    if let Some(status) = filter.status {
        bindings.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", bindings.len()));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        bindings.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(params_ref.as_slice(), |row| Ok(referral_row(row)))?;

    let mut referrals = Vec::new();
    for row in rows {
        referrals.push(referral_from_row(row??)?);
    }
    Ok(referrals)
}

struct ReferralRow {
    id: String,
    patient_id: String,
    referring_doctor_id: String,
    specialist_id: String,
    reason: String,
    notes: Option<String>,
    status: String,
    created_at: String,
}

fn referral_row(row: &rusqlite::Row<'_>) -> Result<ReferralRow, rusqlite::Error> {
    Ok(ReferralRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        referring_doctor_id: row.get(2)?,
        specialist_id: row.get(3)?,
        reason: row.get(4)?,
        notes: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn referral_from_row(row: ReferralRow) -> Result<Referral, DatabaseError> {
    Ok(Referral {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        referring_doctor_id: parse_uuid(&row.referring_doctor_id)?,
        specialist_id: parse_uuid(&row.specialist_id)?,
        reason: row.reason,
        notes: row.notes,
        status: ReferralStatus::from_str(&row.status)?,
        created_at: parse_datetime(&row.created_at)?,
    })
}
