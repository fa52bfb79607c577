use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date_opt, parse_uuid};
use crate::db::DatabaseError;
use crate::models::filters::InventoryFilter;
use crate::models::MedicationInventory;

const INVENTORY_COLUMNS: &str = "id, name, category, quantity, unit_price, expiry_date";

pub fn insert_medication(
    conn: &Connection,
    item: &MedicationInventory,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medication_inventory (id, name, category, quantity, unit_price, expiry_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            item.id.to_string(),
            item.name,
            item.category,
            item.quantity,
            item.unit_price,
            item.expiry_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_medication(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicationInventory>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM medication_inventory WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], |row| Ok(inventory_row(row)));
    match result {
        Ok(row) => Ok(Some(inventory_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_medication(
    conn: &Connection,
    item: &MedicationInventory,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medication_inventory
         SET name = ?2, category = ?3, quantity = ?4, unit_price = ?5, expiry_date = ?6
         WHERE id = ?1",
        params![
            item.id.to_string(),
            item.name,
            item.category,
            item.quantity,
            item.unit_price,
            item.expiry_date.map(|d| d.to_string()),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicationInventory".into(),
            id: item.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_medication(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM medication_inventory WHERE id = ?1",
        params![id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicationInventory".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn list_medications(
    conn: &Connection,
    filter: &InventoryFilter,
) -> Result<Vec<MedicationInventory>, DatabaseError> {
    let mut sql = format!("SELECT {INVENTORY_COLUMNS} FROM medication_inventory WHERE 1=1");
    let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(q) = filter.search.as_deref().filter(|q| !q.trim().is_empty()) {
        bindings.push(Box::new(format!("%{}%", q.trim())));
        sql.push_str(&format!(
            " AND LOWER(name) LIKE LOWER(?{})",
            bindings.len()
        ));
    }
    if let Some(category) = filter.category.as_deref() {
        bindings.push(Box::new(category.to_string()));
        sql.push_str(&format!(" AND category = ?{}", bindings.len()));
    }
    sql.push_str(" ORDER BY name");

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        bindings.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(params_ref.as_slice(), |row| Ok(inventory_row(row)))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(inventory_from_row(row??)?);
    }
    Ok(items)
}

pub fn list_low_stock(
    conn: &Connection,
    threshold: i64,
) -> Result<Vec<MedicationInventory>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM medication_inventory
         WHERE quantity < ?1 ORDER BY quantity ASC"
    ))?;
    let rows = stmt.query_map(params![threshold], |row| Ok(inventory_row(row)))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(inventory_from_row(row??)?);
    }
    Ok(items)
}

/// Guarded decrement: only succeeds when enough stock remains, so two
/// racing dispenses can never drive quantity below zero. Returns `false`
/// when stock was insufficient (no row updated).
pub fn decrement_inventory(
    conn: &Connection,
    id: &Uuid,
    quantity: i64,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE medication_inventory SET quantity = quantity - ?2
         WHERE id = ?1 AND quantity >= ?2",
        params![id.to_string(), quantity],
    )?;
    Ok(updated == 1)
}

struct InventoryRow {
    id: String,
    name: String,
    category: Option<String>,
    quantity: i64,
    unit_price: i64,
    expiry_date: Option<String>,
}

fn inventory_row(row: &rusqlite::Row<'_>) -> Result<InventoryRow, rusqlite::Error> {
    Ok(InventoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        quantity: row.get(3)?,
        unit_price: row.get(4)?,
        expiry_date: row.get(5)?,
    })
}

fn inventory_from_row(row: InventoryRow) -> Result<MedicationInventory, DatabaseError> {
    Ok(MedicationInventory {
        id: parse_uuid(&row.id)?,
        name: row.name,
        category: row.category,
        quantity: row.quantity,
        unit_price: row.unit_price,
        expiry_date: parse_date_opt(row.expiry_date),
    })
}
