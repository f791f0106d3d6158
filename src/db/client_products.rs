//! Products attached to a client, optionally scoped to one of its projects.
//!
//! `total_price_calculated` is always derived here from the quantity and the
//! effective unit price (the override when set, else the product's base
//! price at the time of the write). Callers cannot supply it.

use super::clients::ensure_client;
use super::db::Session;
use super::error::{DbError, DbResult};
use super::products::ensure_live_product;
use super::rows::{
    change_f64, fetch_one, filter_changes, found, hard_delete, now_iso, require_non_negative, round2, update_row, Changes, Conditions,
    FromRow,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Reader filter value selecting links that have no project.
pub const NO_PROJECT: &str = "__NONE__";

const INSERT_LINK: &str = "INSERT INTO ClientProjectProducts
    (client_id, project_id, product_id, quantity, unit_price_override, total_price_calculated, serial_number,
     purchase_confirmed_at, added_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_LINKS: &str = "SELECT cpp.*, p.product_name, p.base_unit_price, p.language_code
    FROM ClientProjectProducts cpp
    JOIN Products p ON p.product_id = cpp.product_id";
const SELECT_LINK_BY_ID: &str = "SELECT cpp.*, p.product_name, p.base_unit_price, p.language_code
    FROM ClientProjectProducts cpp
    JOIN Products p ON p.product_id = cpp.product_id
    WHERE cpp.client_project_product_id = ?1";
const SELECT_EXISTING_LINK: &str = "SELECT client_project_product_id FROM ClientProjectProducts
    WHERE client_id = ?1 AND project_id IS ?2 AND product_id = ?3";
const SELECT_BASE_PRICE: &str = "SELECT base_unit_price FROM Products WHERE product_id = ?1";
const SELECT_PROJECT_CLIENT: &str = "SELECT client_id FROM Projects WHERE project_id = ?1 AND is_deleted = 0";

const LINK_COLUMNS: &[&str] = &["quantity", "unit_price_override", "serial_number", "purchase_confirmed_at"];
const LINK_COLUMNS_WITH_TOTAL: &[&str] = &[
    "quantity",
    "unit_price_override",
    "serial_number",
    "purchase_confirmed_at",
    "total_price_calculated",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProduct {
    pub client_project_product_id: i64,
    pub client_id: String,
    pub project_id: Option<String>,
    pub product_id: i64,
    pub quantity: f64,
    pub unit_price_override: Option<f64>,
    pub total_price_calculated: f64,
    pub serial_number: Option<String>,
    pub purchase_confirmed_at: Option<String>,
    pub added_at: String,
    pub updated_at: String,
    pub product_name: String,
    pub base_unit_price: f64,
    pub language_code: String,
}

impl ClientProduct {
    pub fn effective_unit_price(&self) -> f64 {
        self.unit_price_override.unwrap_or(self.base_unit_price)
    }
}

impl FromRow for ClientProduct {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ClientProduct {
            client_project_product_id: row.get("client_project_product_id")?,
            client_id: row.get("client_id")?,
            project_id: row.get("project_id")?,
            product_id: row.get("product_id")?,
            quantity: row.get("quantity")?,
            unit_price_override: row.get("unit_price_override")?,
            total_price_calculated: row.get("total_price_calculated")?,
            serial_number: row.get("serial_number")?,
            purchase_confirmed_at: row.get("purchase_confirmed_at")?,
            added_at: row.get("added_at")?,
            updated_at: row.get("updated_at")?,
            product_name: row.get("product_name")?,
            base_unit_price: row.get("base_unit_price")?,
            language_code: row.get("language_code")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClientProduct {
    pub client_id: String,
    pub project_id: Option<String>,
    pub product_id: i64,
    pub quantity: f64,
    pub unit_price_override: Option<f64>,
    pub serial_number: Option<String>,
    pub purchase_confirmed_at: Option<String>,
}

impl NewClientProduct {
    pub fn new(client_id: impl Into<String>, product_id: i64) -> Self {
        NewClientProduct {
            client_id: client_id.into(),
            project_id: None,
            product_id,
            quantity: 1.0,
            unit_price_override: None,
            serial_number: None,
            purchase_confirmed_at: None,
        }
    }
}

/// Which links of a client a reader returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    Any,
    Project(String),
    Unassigned,
}

impl From<Option<&str>> for ProjectScope {
    fn from(value: Option<&str>) -> Self {
        match value {
            None => ProjectScope::Any,
            Some(NO_PROJECT) => ProjectScope::Unassigned,
            Some(project_id) => ProjectScope::Project(project_id.to_string()),
        }
    }
}

fn total_for(conn: &Connection, product_id: i64, quantity: f64, unit_price_override: Option<f64>) -> DbResult<f64> {
    let unit_price = match unit_price_override {
        Some(price) => price,
        None => conn
            .query_row(SELECT_BASE_PRICE, [product_id], |row| row.get::<_, f64>(0))
            .optional()?
            .ok_or_else(|| DbError::not_found("Product", product_id))?,
    };
    Ok(round2(quantity * unit_price))
}

/// Fails unless the project is live and belongs to `client_id`.
pub(crate) fn ensure_project_of_client(conn: &Connection, project_id: &str, client_id: &str) -> DbResult<()> {
    let owner: Option<String> = conn.query_row(SELECT_PROJECT_CLIENT, [project_id], |row| row.get(0)).optional()?;
    match owner {
        None => Err(DbError::not_found("Project", project_id)),
        Some(owner) if owner != client_id => Err(DbError::validation("project_id", "project belongs to another client")),
        Some(_) => Ok(()),
    }
}

pub struct ClientProjectProducts<'a> {
    session: Session<'a>,
}

impl<'a> ClientProjectProducts<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, link: &NewClientProduct) -> DbResult<i64> {
        require_non_negative("quantity", link.quantity)?;
        if let Some(price) = link.unit_price_override {
            require_non_negative("unit_price_override", price)?;
        }
        let project_id = link.project_id.as_deref().filter(|p| !p.trim().is_empty() && *p != NO_PROJECT);

        self.session.run(|conn| {
            ensure_client(conn, &link.client_id)?;
            ensure_live_product(conn, link.product_id)?;
            if let Some(project_id) = project_id {
                ensure_project_of_client(conn, project_id, &link.client_id)?;
            }
            // NULL project ids are distinct to the unique constraint.
            let existing: Option<i64> = conn
                .query_row(SELECT_EXISTING_LINK, params![link.client_id, project_id, link.product_id], |row| row.get(0))
                .optional()?;
            if let Some(existing_id) = existing {
                return Err(DbError::conflict_with(
                    "ClientProduct",
                    format!("product {} is already linked with id {}", link.product_id, existing_id),
                    existing_id,
                ));
            }

            let total = total_for(conn, link.product_id, link.quantity, link.unit_price_override)?;
            conn.execute(
                INSERT_LINK,
                params![
                    link.client_id,
                    project_id,
                    link.product_id,
                    link.quantity,
                    link.unit_price_override,
                    total,
                    link.serial_number,
                    link.purchase_confirmed_at,
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("ClientProduct"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, link_id: i64) -> DbResult<Option<ClientProduct>> {
        self.session.run(|conn| fetch_one(conn, SELECT_LINK_BY_ID, [link_id]))
    }

    pub fn list_for_client(&self, client_id: &str, scope: ProjectScope) -> DbResult<Vec<ClientProduct>> {
        let mut conditions = Conditions::new();
        conditions.push("cpp.client_id = ?", client_id.to_string());
        match scope {
            ProjectScope::Any => {}
            ProjectScope::Project(project_id) => {
                conditions.push("cpp.project_id = ?", project_id);
            }
            ProjectScope::Unassigned => {
                conditions.push_raw("cpp.project_id IS NULL");
            }
        }
        self.session
            .run(|conn| conditions.query(conn, SELECT_LINKS, " ORDER BY cpp.added_at, cpp.client_project_product_id"))
    }

    pub fn list_for_project(&self, project_id: &str) -> DbResult<Vec<ClientProduct>> {
        let mut conditions = Conditions::new();
        conditions.push("cpp.project_id = ?", project_id.to_string());
        self.session
            .run(|conn| conditions.query(conn, SELECT_LINKS, " ORDER BY cpp.added_at, cpp.client_project_product_id"))
    }

    /// Partial update. The total is recomputed when the quantity or the
    /// override changes and kept as stored otherwise.
    pub fn update(&self, link_id: i64, changes: &Changes) -> DbResult<usize> {
        let quantity = change_f64(changes, "quantity")?;
        if let Some(quantity) = quantity {
            require_non_negative("quantity", quantity)?;
        }
        if changes.get("quantity") == Some(&Value::Null) {
            return Err(DbError::validation("quantity", "must not be null"));
        }
        let override_price = change_f64(changes, "unit_price_override")?;
        if let Some(price) = override_price {
            require_non_negative("unit_price_override", price)?;
        }

        self.session.run(|conn| {
            let current: ClientProduct =
                fetch_one(conn, SELECT_LINK_BY_ID, [link_id])?.ok_or_else(|| DbError::not_found("ClientProduct", link_id))?;

            let mut accepted = filter_changes(changes, LINK_COLUMNS);
            let override_touched = changes.contains_key("unit_price_override");
            if quantity.is_some() || override_touched {
                let quantity = quantity.unwrap_or(current.quantity);
                // A null override clears it and falls back to the base price.
                let unit_price_override = if override_touched { override_price } else { current.unit_price_override };
                let total = total_for(conn, current.product_id, quantity, unit_price_override)?;
                accepted.insert("total_price_calculated".to_string(), json!(total));
            }

            let affected = update_row(
                conn,
                "ClientProjectProducts",
                "client_project_product_id",
                SqlValue::Integer(link_id),
                LINK_COLUMNS_WITH_TOTAL,
                &accepted,
                Some("updated_at"),
            )?;
            found(affected, "ClientProduct", link_id)
        })
    }

    pub fn remove(&self, link_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "ClientProjectProducts",
                "client_project_product_id",
                SqlValue::Integer(link_id),
                "ClientProduct",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_marker_selects_unassigned_links() {
        assert_eq!(ProjectScope::from(None), ProjectScope::Any);
        assert_eq!(ProjectScope::from(Some(NO_PROJECT)), ProjectScope::Unassigned);
        assert_eq!(ProjectScope::from(Some("p1")), ProjectScope::Project("p1".to_string()));
    }
}
