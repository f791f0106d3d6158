//! Storage locations (a tree) and product quantities held at each location.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::products::ensure_live_product;
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, Changes, Conditions, FromRow};
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Separator between location names in a full path.
pub const PATH_SEPARATOR: &str = " > ";

const INSERT_LOCATION: &str = "INSERT INTO ItemLocations
    (location_id, location_name, parent_location_id, location_type, description, visual_coordinates, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)";
const SELECT_LOCATION_BY_ID: &str = "SELECT * FROM ItemLocations WHERE location_id = ?1";
const SELECT_LOCATIONS: &str = "SELECT * FROM ItemLocations";
const SELECT_CHILDREN: &str = "SELECT * FROM ItemLocations WHERE parent_location_id = ?1 ORDER BY location_name";
const SELECT_PARENT: &str = "SELECT location_name, parent_location_id FROM ItemLocations WHERE location_id = ?1";
const HAS_CHILDREN: &str = "SELECT 1 FROM ItemLocations WHERE parent_location_id = ?1 LIMIT 1";

const INSERT_STOCK: &str = "INSERT INTO ProductStorageLocations
    (product_storage_location_id, product_id, location_id, quantity, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)";
const SELECT_STOCK_BY_ID: &str = "SELECT * FROM ProductStorageLocations WHERE product_storage_location_id = ?1";
const SELECT_STOCK_FOR_PRODUCT: &str = "SELECT * FROM ProductStorageLocations WHERE product_id = ?1 ORDER BY created_at";
const SELECT_STOCK_FOR_LOCATION: &str = "SELECT * FROM ProductStorageLocations WHERE location_id = ?1 ORDER BY product_id";

const LOCATION_COLUMNS: &[&str] = &["location_name", "parent_location_id", "location_type", "description", "visual_coordinates"];
const STOCK_COLUMNS: &[&str] = &["quantity", "notes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLocation {
    pub location_id: String,
    pub location_name: String,
    pub parent_location_id: Option<String>,
    pub location_type: Option<String>,
    pub description: Option<String>,
    /// Opaque JSON text, returned as stored.
    pub visual_coordinates: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for ItemLocation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ItemLocation {
            location_id: row.get("location_id")?,
            location_name: row.get("location_name")?,
            parent_location_id: row.get("parent_location_id")?,
            location_type: row.get("location_type")?,
            description: row.get("description")?,
            visual_coordinates: row.get("visual_coordinates")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewItemLocation {
    pub location_name: String,
    pub parent_location_id: Option<String>,
    pub location_type: Option<String>,
    pub description: Option<String>,
    pub visual_coordinates: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub product_storage_location_id: String,
    pub product_id: i64,
    pub location_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for StorageLocation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StorageLocation {
            product_storage_location_id: row.get("product_storage_location_id")?,
            product_id: row.get("product_id")?,
            location_id: row.get("location_id")?,
            quantity: row.get("quantity")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn ensure_location(conn: &Connection, location_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM ItemLocations WHERE location_id = ?1", [location_id])? {
        return Err(DbError::not_found("ItemLocation", location_id));
    }
    Ok(())
}

/// Names from `location_id` up to the root, leaf first. Stops at the last
/// resolvable node, and on a revisited node.
fn ancestry(conn: &Connection, location_id: &str) -> DbResult<Vec<(String, String)>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(location_id.to_string());

    while let Some(id) = current.take() {
        if !seen.insert(id.clone()) {
            break;
        }
        let row: Option<(String, Option<String>)> =
            conn.query_row(SELECT_PARENT, [&id], |row| Ok((row.get(0)?, row.get(1)?))).optional()?;
        let Some((name, parent)) = row else {
            break;
        };
        chain.push((id, name));
        current = parent;
    }
    Ok(chain)
}

fn join_path(chain: &[(String, String)]) -> String {
    chain.iter().rev().map(|(_, name)| name.as_str()).collect::<Vec<_>>().join(PATH_SEPARATOR)
}

pub struct ItemLocations<'a> {
    session: Session<'a>,
}

impl<'a> ItemLocations<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, location: &NewItemLocation) -> DbResult<String> {
        require_text("location_name", &location.location_name)?;
        let location_id = new_id();
        self.session.run(|conn| {
            if let Some(parent_id) = location.parent_location_id.as_deref() {
                ensure_location(conn, parent_id)?;
            }
            conn.execute(
                INSERT_LOCATION,
                params![
                    location_id,
                    location.location_name.trim(),
                    location.parent_location_id,
                    location.location_type,
                    location.description,
                    location.visual_coordinates,
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("ItemLocation"))?;
            Ok(location_id.clone())
        })
    }

    pub fn get(&self, location_id: &str) -> DbResult<Option<ItemLocation>> {
        self.session.run(|conn| fetch_one(conn, SELECT_LOCATION_BY_ID, [location_id]))
    }

    /// `parent`: `Some(None)` lists roots, `Some(Some(id))` the children of `id`.
    pub fn list(&self, parent: Option<Option<&str>>, location_type: Option<&str>) -> DbResult<Vec<ItemLocation>> {
        let mut conditions = Conditions::new();
        match parent {
            None => {}
            Some(None) => {
                conditions.push_raw("parent_location_id IS NULL");
            }
            Some(Some(parent_id)) => {
                conditions.push("parent_location_id = ?", parent_id.to_string());
            }
        }
        conditions.push_opt("location_type = ?", location_type.map(str::to_string));
        self.session.run(|conn| conditions.query(conn, SELECT_LOCATIONS, " ORDER BY location_name"))
    }

    pub fn children(&self, location_id: &str) -> DbResult<Vec<ItemLocation>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CHILDREN, [location_id]))
    }

    /// Location names from the root down to `location_id`, joined by `" > "`.
    /// `None` when the location itself does not exist.
    pub fn get_full_location_path_str(&self, location_id: &str) -> DbResult<Option<String>> {
        self.session.run(|conn| {
            let chain = ancestry(conn, location_id)?;
            if chain.is_empty() {
                return Ok(None);
            }
            Ok(Some(join_path(&chain)))
        })
    }

    /// Re-parenting under the location itself or one of its descendants is refused.
    pub fn update(&self, location_id: &str, changes: &Changes) -> DbResult<usize> {
        if let Some(name) = changes.get("location_name") {
            require_text("location_name", name.as_str().unwrap_or_default())?;
        }
        self.session.run(|conn| {
            if let Some(parent_id) = changes.get("parent_location_id").and_then(|v| v.as_str()) {
                ensure_location(conn, parent_id)?;
                if ancestry(conn, parent_id)?.iter().any(|(id, _)| id == location_id) {
                    msg_debug!(Message::LocationCycleRejected(location_id.to_string()));
                    return Err(DbError::conflict(
                        "ItemLocation",
                        format!("moving {} under {} would create a cycle", location_id, parent_id),
                    ));
                }
            }
            let affected = update_row(
                conn,
                "ItemLocations",
                "location_id",
                SqlValue::Text(location_id.to_string()),
                LOCATION_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("ItemLocation"))?;
            found(affected, "ItemLocation", location_id)
        })
    }

    /// Refused while child locations exist; stock rows at the location go with it.
    pub fn delete(&self, location_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            if exists(conn, HAS_CHILDREN, [location_id])? {
                msg_debug!(Message::LocationHasChildren(location_id.to_string()));
                return Err(DbError::conflict("ItemLocation", format!("location {} still has child locations", location_id)));
            }
            hard_delete(conn, "ItemLocations", "location_id", SqlValue::Text(location_id.to_string()), "ItemLocation")
        })
    }
}

pub struct ProductStorageLocations<'a> {
    session: Session<'a>,
}

impl<'a> ProductStorageLocations<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, product_id: i64, location_id: &str, quantity: i64, notes: Option<&str>) -> DbResult<String> {
        if quantity < 0 {
            return Err(DbError::validation("quantity", "must not be negative"));
        }
        let stock_id = new_id();
        self.session.run(|conn| {
            ensure_live_product(conn, product_id)?;
            ensure_location(conn, location_id)?;
            conn.execute(INSERT_STOCK, params![stock_id, product_id, location_id, quantity, notes, now_iso()])
                .map_err(|e| DbError::from(e).for_entity("ProductStorageLocation"))?;
            Ok(stock_id.clone())
        })
    }

    pub fn get(&self, stock_id: &str) -> DbResult<Option<StorageLocation>> {
        self.session.run(|conn| fetch_one(conn, SELECT_STOCK_BY_ID, [stock_id]))
    }

    pub fn list_for_product(&self, product_id: i64) -> DbResult<Vec<StorageLocation>> {
        self.session.run(|conn| fetch_all(conn, SELECT_STOCK_FOR_PRODUCT, [product_id]))
    }

    pub fn list_for_location(&self, location_id: &str) -> DbResult<Vec<StorageLocation>> {
        self.session.run(|conn| fetch_all(conn, SELECT_STOCK_FOR_LOCATION, [location_id]))
    }

    pub fn update(&self, stock_id: &str, changes: &Changes) -> DbResult<usize> {
        if changes.get("quantity").and_then(|v| v.as_i64()).is_some_and(|q| q < 0) {
            return Err(DbError::validation("quantity", "must not be negative"));
        }
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "ProductStorageLocations",
                "product_storage_location_id",
                SqlValue::Text(stock_id.to_string()),
                STOCK_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "ProductStorageLocation", stock_id)
        })
    }

    pub fn delete(&self, stock_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "ProductStorageLocations",
                "product_storage_location_id",
                SqlValue::Text(stock_id.to_string()),
                "ProductStorageLocation",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_reads_root_first() {
        let chain = vec![
            ("s".to_string(), "Shelf A1".to_string()),
            ("r".to_string(), "Row 3".to_string()),
            ("a".to_string(), "Area".to_string()),
        ];
        assert_eq!(join_path(&chain), "Area > Row 3 > Shelf A1");
        assert_eq!(join_path(&chain[..1]), "Shelf A1");
    }
}
