use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::fmt_datetime;
use crate::db::DatabaseError;
use crate::models::Staff;

/// Sessions store SHA-256 hashes of bearer tokens, never the tokens.
pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    staff_id: &Uuid,
    created_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, staff_id, created_at) VALUES (?1, ?2, ?3)",
        params![token_hash, staff_id.to_string(), fmt_datetime(created_at)],
    )?;
    Ok(())
}

/// Resolve a token hash to the owning staff member, if the session exists.
pub fn get_session_staff(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<Staff>, DatabaseError> {
    let result = conn.query_row(
        "SELECT staff_id FROM sessions WHERE token_hash = ?1",
        params![token_hash],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(staff_id) => {
            let id = super::parse_uuid(&staff_id)?;
            super::get_staff(conn, &id)
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![token_hash],
    )?;
    Ok(())
}
