//! Status catalogue shared by clients, projects, tasks and job openings.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{fetch_all, fetch_one, found, hard_delete, require_text, update_row, Changes, Conditions, FromRow};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_STATUS: &str = "INSERT INTO StatusSettings
    (status_name, status_type, color_hex, icon_name, default_duration_days, is_archival_status, is_completion_status, sort_order)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
const SELECT_STATUS_BY_ID: &str = "SELECT * FROM StatusSettings WHERE status_id = ?1";
const SELECT_STATUS_BY_NAME: &str = "SELECT * FROM StatusSettings WHERE status_name = ?1 AND status_type = ?2";
const SELECT_STATUSES: &str = "SELECT * FROM StatusSettings";

const STATUS_COLUMNS: &[&str] = &[
    "status_name",
    "status_type",
    "color_hex",
    "icon_name",
    "default_duration_days",
    "is_archival_status",
    "is_completion_status",
    "sort_order",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub status_id: i64,
    pub status_name: String,
    pub status_type: String,
    pub color_hex: Option<String>,
    pub icon_name: Option<String>,
    pub default_duration_days: Option<i64>,
    pub is_archival_status: bool,
    pub is_completion_status: bool,
    pub sort_order: i64,
}

impl FromRow for Status {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Status {
            status_id: row.get("status_id")?,
            status_name: row.get("status_name")?,
            status_type: row.get("status_type")?,
            color_hex: row.get("color_hex")?,
            icon_name: row.get("icon_name")?,
            default_duration_days: row.get("default_duration_days")?,
            is_archival_status: row.get("is_archival_status")?,
            is_completion_status: row.get("is_completion_status")?,
            sort_order: row.get("sort_order")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStatus {
    pub status_name: String,
    pub status_type: String,
    pub color_hex: Option<String>,
    pub icon_name: Option<String>,
    pub default_duration_days: Option<i64>,
    pub is_archival_status: bool,
    pub is_completion_status: bool,
    pub sort_order: i64,
}

pub struct StatusSettings<'a> {
    session: Session<'a>,
}

impl<'a> StatusSettings<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, status: &NewStatus) -> DbResult<i64> {
        require_text("status_name", &status.status_name)?;
        require_text("status_type", &status.status_type)?;
        self.session.run(|conn| {
            conn.execute(
                INSERT_STATUS,
                params![
                    status.status_name.trim(),
                    status.status_type.trim(),
                    status.color_hex,
                    status.icon_name,
                    status.default_duration_days,
                    status.is_archival_status,
                    status.is_completion_status,
                    status.sort_order
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("Status"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, status_id: i64) -> DbResult<Option<Status>> {
        self.session.run(|conn| fetch_one(conn, SELECT_STATUS_BY_ID, [status_id]))
    }

    pub fn get_by_name(&self, name: &str, status_type: &str) -> DbResult<Option<Status>> {
        self.session.run(|conn| fetch_one(conn, SELECT_STATUS_BY_NAME, params![name, status_type]))
    }

    /// Whole catalogue, or one type of it, in display order.
    pub fn list(&self, status_type: Option<&str>) -> DbResult<Vec<Status>> {
        let mut conditions = Conditions::new();
        conditions.push_opt("status_type = ?", status_type.map(str::to_string));
        self.session
            .run(|conn| conditions.query(conn, SELECT_STATUSES, " ORDER BY status_type, sort_order, status_name"))
    }

    pub fn update(&self, status_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(conn, "StatusSettings", "status_id", SqlValue::Integer(status_id), STATUS_COLUMNS, changes, None)
                .map_err(|e| e.for_entity("Status"))?;
            found(affected, "Status", status_id)
        })
    }

    pub fn delete(&self, status_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "StatusSettings", "status_id", SqlValue::Integer(status_id), "Status"))
    }
}
