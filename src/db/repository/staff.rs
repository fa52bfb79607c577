use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::StaffRole;
use crate::models::filters::StaffFilter;
use crate::models::Staff;

const STAFF_COLUMNS: &str = "id, name, email, password_hash, password_salt, role";

pub fn insert_staff(conn: &Connection, staff: &Staff) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff (id, name, email, password_hash, password_salt, role)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            staff.id.to_string(),
            staff.name,
            staff.email,
            staff.password_hash,
            staff.password_salt,
            staff.role.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_staff(conn: &Connection, id: &Uuid) -> Result<Option<Staff>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(staff_row(row)));
    match result {
        Ok(row) => Ok(Some(staff_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_staff_by_email(conn: &Connection, email: &str) -> Result<Option<Staff>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STAFF_COLUMNS} FROM staff WHERE LOWER(email) = LOWER(?1)"
    ))?;
    let result = stmt.query_row(params![email], |row| Ok(staff_row(row)));
    match result {
        Ok(row) => Ok(Some(staff_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Role as currently stored, the source of truth for authorization,
/// never the session claim.
pub fn get_staff_role(conn: &Connection, id: &Uuid) -> Result<Option<StaffRole>, DatabaseError> {
    let result = conn.query_row(
        "SELECT role FROM staff WHERE id = ?1",
        params![id.to_string()],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(role) => Ok(Some(StaffRole::from_str(&role)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_staff(conn: &Connection, filter: &StaffFilter) -> Result<Vec<Staff>, DatabaseError> {
    let mut members = Vec::new();
    match filter.role {
        Some(role) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STAFF_COLUMNS} FROM staff WHERE role = ?1 ORDER BY name"
            ))?;
            let rows = stmt.query_map(params![role.as_str()], |row| Ok(staff_row(row)))?;
            for row in rows {
                members.push(staff_from_row(row??)?);
            }
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY name"))?;
            let rows = stmt.query_map([], |row| Ok(staff_row(row)))?;
            for row in rows {
                members.push(staff_from_row(row??)?);
            }
        }
    }
    Ok(members)
}

struct StaffRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    password_salt: String,
    role: String,
}

fn staff_row(row: &rusqlite::Row<'_>) -> Result<StaffRow, rusqlite::Error> {
    Ok(StaffRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        password_salt: row.get(4)?,
        role: row.get(5)?,
    })
}

fn staff_from_row(row: StaffRow) -> Result<Staff, DatabaseError> {
    Ok(Staff {
        id: parse_uuid(&row.id)?,
        name: row.name,
        email: row.email,
        password_hash: row.password_hash,
        password_salt: row.password_salt,
        role: StaffRole::from_str(&row.role)?,
    })
}
