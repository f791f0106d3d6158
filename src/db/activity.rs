//! Append-only audit trail of user actions.

use super::db::Session;
use super::error::DbResult;
use super::rows::{now_iso, require_text, user_ref, Conditions, FromRow, Page};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_ACTIVITY: &str = "INSERT INTO ActivityLog
    (user_id, action_type, details, related_entity_type, related_entity_id, related_client_id, ip_address, user_agent, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
const SELECT_ACTIVITY: &str = "SELECT * FROM ActivityLog";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub log_id: i64,
    pub user_id: Option<String>,
    pub action_type: String,
    pub details: Option<String>,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub related_client_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl FromRow for Activity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Activity {
            log_id: row.get("log_id")?,
            user_id: row.get("user_id")?,
            action_type: row.get("action_type")?,
            details: row.get("details")?,
            related_entity_type: row.get("related_entity_type")?,
            related_entity_id: row.get("related_entity_id")?,
            related_client_id: row.get("related_client_id")?,
            ip_address: row.get("ip_address")?,
            user_agent: row.get("user_agent")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub user_id: Option<String>,
    pub action_type: String,
    pub details: Option<String>,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub related_client_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// `since`/`until` bound `created_at`, inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub user_id: Option<String>,
    pub action_type: Option<String>,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub related_client_id: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

pub struct ActivityLog<'a> {
    session: Session<'a>,
}

impl<'a> ActivityLog<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, activity: &NewActivity) -> DbResult<i64> {
        require_text("action_type", &activity.action_type)?;
        self.session.run(|conn| {
            conn.execute(
                INSERT_ACTIVITY,
                params![
                    user_ref(activity.user_id.as_deref()),
                    activity.action_type.trim(),
                    activity.details,
                    activity.related_entity_type,
                    activity.related_entity_id,
                    activity.related_client_id,
                    activity.ip_address,
                    activity.user_agent,
                    now_iso()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest entries first.
    pub fn list(&self, filter: &ActivityFilter, page: Page) -> DbResult<Vec<Activity>> {
        let mut conditions = Conditions::new();
        conditions
            .push_opt("user_id = ?", filter.user_id.clone())
            .push_opt("action_type = ?", filter.action_type.clone())
            .push_opt("related_entity_type = ?", filter.related_entity_type.clone())
            .push_opt("related_entity_id = ?", filter.related_entity_id.clone())
            .push_opt("related_client_id = ?", filter.related_client_id.clone())
            .push_opt("created_at >= ?", filter.since.clone())
            .push_opt("created_at <= ?", filter.until.clone());
        let tail = format!(" ORDER BY created_at DESC, log_id DESC{}", page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_ACTIVITY, &tail))
    }
}
