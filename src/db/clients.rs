//! Clients and their notes.
//!
//! Clients are soft-deleted: the row stays, `is_deleted` and `deleted_at` are
//! set, and default readers stop returning it.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    change_f64, exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_non_negative, require_text, soft_delete, update_live_row, update_row,
    user_ref, with_holder, Changes, Conditions, FromRow, Page,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_CLIENT: &str = "INSERT INTO Clients
    (client_id, client_name, company_name, primary_need_description, project_identifier, country_id, city_id,
     default_base_folder_path, status_id, selected_languages, price, notes, category, created_by_user_id,
     is_deleted, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0, ?15, ?15)";
const SELECT_CLIENT_BY_ID: &str = "SELECT * FROM Clients WHERE client_id = ?1";
const SELECT_LIVE_CLIENT_BY_ID: &str = "SELECT * FROM Clients WHERE client_id = ?1 AND is_deleted = 0";
const SELECT_CLIENTS: &str = "SELECT * FROM Clients";
const SELECT_ACTIVE_CLIENTS: &str = "SELECT c.* FROM Clients c
    LEFT JOIN StatusSettings s ON s.status_id = c.status_id
    WHERE c.is_deleted = 0 AND (COALESCE(s.is_archival_status, 0) = 0)";
const SELECT_ACTIVE_CLIENTS_WITH_STATUS: &str = "SELECT c.* FROM Clients c
    JOIN StatusSettings s ON s.status_id = c.status_id
    WHERE c.is_deleted = 0 AND s.is_archival_status = 0";
const COUNT_CLIENTS: &str = "SELECT COUNT(*) FROM Clients WHERE is_deleted = 0";
const COUNT_BY_STATUS: &str = "SELECT c.status_id AS key_id, s.status_name AS label, COUNT(*) AS total
    FROM Clients c LEFT JOIN StatusSettings s ON s.status_id = c.status_id
    WHERE c.is_deleted = 0
    GROUP BY c.status_id, s.status_name
    ORDER BY total DESC, label";
const COUNT_BY_COUNTRY: &str = "SELECT c.country_id AS key_id, co.country_name AS label, COUNT(*) AS total
    FROM Clients c LEFT JOIN Countries co ON co.country_id = c.country_id
    WHERE c.is_deleted = 0
    GROUP BY c.country_id, co.country_name
    ORDER BY total DESC, label";

const INSERT_NOTE: &str = "INSERT INTO ClientNotes (client_id, timestamp, note_text, user_id) VALUES (?1, ?2, ?3, ?4)";
const SELECT_NOTE_BY_ID: &str = "SELECT * FROM ClientNotes WHERE note_id = ?1";
const SELECT_NOTES_BY_CLIENT: &str = "SELECT * FROM ClientNotes WHERE client_id = ?1 ORDER BY timestamp DESC, note_id DESC";

const CLIENT_COLUMNS: &[&str] = &[
    "client_name",
    "company_name",
    "primary_need_description",
    "project_identifier",
    "country_id",
    "city_id",
    "default_base_folder_path",
    "status_id",
    "selected_languages",
    "price",
    "notes",
    "category",
];
const NOTE_COLUMNS: &[&str] = &["note_text"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub client_name: String,
    pub company_name: Option<String>,
    pub primary_need_description: Option<String>,
    pub project_identifier: Option<String>,
    pub country_id: Option<i64>,
    pub city_id: Option<i64>,
    pub default_base_folder_path: Option<String>,
    pub status_id: Option<i64>,
    pub selected_languages: Option<String>,
    pub price: f64,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub created_by_user_id: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Client {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Client {
            client_id: row.get("client_id")?,
            client_name: row.get("client_name")?,
            company_name: row.get("company_name")?,
            primary_need_description: row.get("primary_need_description")?,
            project_identifier: row.get("project_identifier")?,
            country_id: row.get("country_id")?,
            city_id: row.get("city_id")?,
            default_base_folder_path: row.get("default_base_folder_path")?,
            status_id: row.get("status_id")?,
            selected_languages: row.get("selected_languages")?,
            price: row.get("price")?,
            notes: row.get("notes")?,
            category: row.get("category")?,
            created_by_user_id: row.get("created_by_user_id")?,
            is_deleted: row.get("is_deleted")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub client_name: String,
    pub company_name: Option<String>,
    pub primary_need_description: Option<String>,
    pub project_identifier: Option<String>,
    pub country_id: Option<i64>,
    pub city_id: Option<i64>,
    pub default_base_folder_path: Option<String>,
    pub status_id: Option<i64>,
    pub selected_languages: Option<String>,
    pub price: f64,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub created_by_user_id: Option<String>,
}

/// Accepted reader filters for clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientFilter {
    pub status_id: Option<i64>,
    pub country_id: Option<i64>,
    pub city_id: Option<i64>,
    pub category: Option<String>,
    pub created_by_user_id: Option<String>,
    /// Substring match over name, company and project identifier.
    pub search: Option<String>,
    pub include_deleted: bool,
}

/// A group count: the grouping id (if any), its label and the number of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key_id: Option<i64>,
    pub label: Option<String>,
    pub total: i64,
}

impl FromRow for GroupCount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(GroupCount {
            key_id: row.get("key_id")?,
            label: row.get("label")?,
            total: row.get("total")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientNote {
    pub note_id: i64,
    pub client_id: String,
    pub timestamp: String,
    pub note_text: String,
    pub user_id: Option<String>,
}

impl FromRow for ClientNote {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ClientNote {
            note_id: row.get("note_id")?,
            client_id: row.get("client_id")?,
            timestamp: row.get("timestamp")?,
            note_text: row.get("note_text")?,
            user_id: row.get("user_id")?,
        })
    }
}

pub(crate) fn ensure_client(conn: &rusqlite::Connection, client_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Clients WHERE client_id = ?1 AND is_deleted = 0", [client_id])? {
        return Err(DbError::not_found("Client", client_id));
    }
    Ok(())
}

pub struct Clients<'a> {
    session: Session<'a>,
}

impl<'a> Clients<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, client: &NewClient) -> DbResult<String> {
        require_text("client_name", &client.client_name)?;
        require_non_negative("price", client.price)?;

        let client_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_CLIENT,
                params![
                    client_id,
                    client.client_name.trim(),
                    client.company_name,
                    client.primary_need_description,
                    client.project_identifier,
                    client.country_id,
                    client.city_id,
                    client.default_base_folder_path,
                    client.status_id,
                    client.selected_languages,
                    client.price,
                    client.notes,
                    client.category,
                    user_ref(client.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )
            .map_err(|e| match client.default_base_folder_path.as_deref() {
                Some(path) => with_holder(
                    DbError::from(e).for_entity("Client"),
                    conn,
                    "SELECT client_id FROM Clients WHERE default_base_folder_path = ?1",
                    [path],
                ),
                None => DbError::from(e).for_entity("Client"),
            })?;
            Ok(client_id.clone())
        })
    }

    pub fn get(&self, client_id: &str, include_deleted: bool) -> DbResult<Option<Client>> {
        let sql = if include_deleted { SELECT_CLIENT_BY_ID } else { SELECT_LIVE_CLIENT_BY_ID };
        self.session.run(|conn| fetch_one(conn, sql, [client_id]))
    }

    pub fn list(&self, filter: &ClientFilter, page: Page) -> DbResult<Vec<Client>> {
        let mut conditions = Conditions::new();
        if !filter.include_deleted {
            conditions.push_raw("is_deleted = 0");
        }
        conditions
            .push_opt("status_id = ?", filter.status_id)
            .push_opt("country_id = ?", filter.country_id)
            .push_opt("city_id = ?", filter.city_id)
            .push_opt("category = ?", filter.category.clone())
            .push_opt("created_by_user_id = ?", filter.created_by_user_id.clone());
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push(
                "(client_name || ' ' || COALESCE(company_name, '') || ' ' || COALESCE(project_identifier, '')) LIKE ?",
                format!("%{}%", search),
            );
        }

        let tail = format!(" ORDER BY client_name, created_at{}", page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_CLIENTS, &tail))
    }

    /// Clients whose status is not archival. Clients without a status are
    /// included only when asked for.
    pub fn list_active(&self, include_without_status: bool) -> DbResult<Vec<Client>> {
        let sql = if include_without_status {
            SELECT_ACTIVE_CLIENTS
        } else {
            SELECT_ACTIVE_CLIENTS_WITH_STATUS
        };
        let sql = format!("{} ORDER BY c.client_name", sql);
        self.session.run(|conn| fetch_all(conn, &sql, []))
    }

    pub fn count(&self) -> DbResult<i64> {
        self.session.run(|conn| Ok(conn.query_row(COUNT_CLIENTS, [], |row| row.get(0))?))
    }

    pub fn count_by_status(&self) -> DbResult<Vec<GroupCount>> {
        self.session.run(|conn| fetch_all(conn, COUNT_BY_STATUS, []))
    }

    pub fn count_by_country(&self) -> DbResult<Vec<GroupCount>> {
        self.session.run(|conn| fetch_all(conn, COUNT_BY_COUNTRY, []))
    }

    pub fn update(&self, client_id: &str, changes: &Changes) -> DbResult<usize> {
        if let Some(price) = change_f64(changes, "price")? {
            require_non_negative("price", price)?;
        }
        if let Some(name) = changes.get("client_name").and_then(|v| v.as_str()) {
            require_text("client_name", name)?;
        }
        self.session.run(|conn| {
            let affected = update_live_row(
                conn,
                "Clients",
                "client_id",
                SqlValue::Text(client_id.to_string()),
                CLIENT_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("Client"))?;
            found(affected, "Client", client_id)
        })
    }

    /// Soft delete. Notes, projects and documents stay attached.
    pub fn delete(&self, client_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| soft_delete(conn, "Clients", "client_id", SqlValue::Text(client_id.to_string()), "Client", ""))
    }

    /// Removes the row and everything owned by it. Administrative use only.
    pub fn purge(&self, client_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Clients", "client_id", SqlValue::Text(client_id.to_string()), "Client"))
    }
}

pub struct ClientNotes<'a> {
    session: Session<'a>,
}

impl<'a> ClientNotes<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, client_id: &str, note_text: &str, user_id: Option<&str>) -> DbResult<i64> {
        require_text("note_text", note_text)?;
        self.session.run(|conn| {
            ensure_client(conn, client_id)?;
            conn.execute(INSERT_NOTE, params![client_id, now_iso(), note_text, user_ref(user_id)])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, note_id: i64) -> DbResult<Option<ClientNote>> {
        self.session.run(|conn| fetch_one(conn, SELECT_NOTE_BY_ID, [note_id]))
    }

    /// Newest first.
    pub fn list_for_client(&self, client_id: &str) -> DbResult<Vec<ClientNote>> {
        self.session.run(|conn| fetch_all(conn, SELECT_NOTES_BY_CLIENT, [client_id]))
    }

    pub fn update(&self, note_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(conn, "ClientNotes", "note_id", SqlValue::Integer(note_id), NOTE_COLUMNS, changes, None)?;
            found(affected, "ClientNote", note_id)
        })
    }

    pub fn delete(&self, note_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "ClientNotes", "note_id", SqlValue::Integer(note_id), "ClientNote"))
    }
}
