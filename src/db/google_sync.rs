//! Linked Google accounts and the per-contact synchronisation log.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, Changes, FromRow};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_ACCOUNT: &str = "INSERT INTO UserGoogleAccounts
    (user_google_account_id, user_id, google_account_id, email, refresh_token, access_token, token_expiry, scopes,
     created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_ACCOUNT_BY_ID: &str = "SELECT * FROM UserGoogleAccounts WHERE user_google_account_id = ?1";
const SELECT_ACCOUNT_BY_GOOGLE_ID: &str = "SELECT * FROM UserGoogleAccounts WHERE google_account_id = ?1";
const SELECT_ACCOUNTS_FOR_USER: &str = "SELECT * FROM UserGoogleAccounts WHERE user_id = ?1 ORDER BY email";

const INSERT_SYNC_LOG: &str = "INSERT INTO ContactSyncLog
    (user_google_account_id, local_contact_id, local_contact_type, google_contact_id, etag, sync_status,
     sync_direction, error_message, last_sync_timestamp, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)";
const SELECT_SYNC_LOG_BY_ID: &str = "SELECT * FROM ContactSyncLog WHERE sync_log_id = ?1";
const SELECT_SYNC_LOG_FOR_ACCOUNT: &str = "SELECT * FROM ContactSyncLog WHERE user_google_account_id = ?1
    ORDER BY last_sync_timestamp DESC, sync_log_id DESC";
const SELECT_SYNC_LOG_FOR_CONTACT: &str = "SELECT * FROM ContactSyncLog
    WHERE user_google_account_id = ?1 AND local_contact_id = ?2 AND local_contact_type = ?3";

const ACCOUNT_COLUMNS: &[&str] = &["email", "refresh_token", "access_token", "token_expiry", "scopes"];
const SYNC_LOG_COLUMNS: &[&str] = &[
    "google_contact_id",
    "etag",
    "sync_status",
    "sync_direction",
    "error_message",
    "last_sync_timestamp",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleAccount {
    pub user_google_account_id: String,
    pub user_id: String,
    pub google_account_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub token_expiry: Option<String>,
    pub scopes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for GoogleAccount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(GoogleAccount {
            user_google_account_id: row.get("user_google_account_id")?,
            user_id: row.get("user_id")?,
            google_account_id: row.get("google_account_id")?,
            email: row.get("email")?,
            refresh_token: row.get("refresh_token")?,
            access_token: row.get("access_token")?,
            token_expiry: row.get("token_expiry")?,
            scopes: row.get("scopes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewGoogleAccount {
    pub user_id: String,
    pub google_account_id: String,
    pub email: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub token_expiry: Option<String>,
    pub scopes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub sync_log_id: i64,
    pub user_google_account_id: String,
    pub local_contact_id: String,
    pub local_contact_type: String,
    pub google_contact_id: Option<String>,
    pub etag: Option<String>,
    pub sync_status: String,
    pub sync_direction: Option<String>,
    pub error_message: Option<String>,
    pub last_sync_timestamp: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for SyncLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SyncLogEntry {
            sync_log_id: row.get("sync_log_id")?,
            user_google_account_id: row.get("user_google_account_id")?,
            local_contact_id: row.get("local_contact_id")?,
            local_contact_type: row.get("local_contact_type")?,
            google_contact_id: row.get("google_contact_id")?,
            etag: row.get("etag")?,
            sync_status: row.get("sync_status")?,
            sync_direction: row.get("sync_direction")?,
            error_message: row.get("error_message")?,
            last_sync_timestamp: row.get("last_sync_timestamp")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSyncLogEntry {
    pub user_google_account_id: String,
    pub local_contact_id: String,
    pub local_contact_type: String,
    pub google_contact_id: Option<String>,
    pub etag: Option<String>,
    pub sync_status: String,
    pub sync_direction: Option<String>,
    pub error_message: Option<String>,
    pub last_sync_timestamp: Option<String>,
}

pub struct UserGoogleAccounts<'a> {
    session: Session<'a>,
}

impl<'a> UserGoogleAccounts<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, account: &NewGoogleAccount) -> DbResult<String> {
        require_text("google_account_id", &account.google_account_id)?;
        require_text("email", &account.email)?;
        let account_id = new_id();
        self.session.run(|conn| {
            if !exists(conn, "SELECT 1 FROM Users WHERE user_id = ?1 AND is_deleted = 0", [&account.user_id])? {
                return Err(DbError::not_found("User", &account.user_id));
            }
            conn.execute(
                INSERT_ACCOUNT,
                params![
                    account_id,
                    account.user_id,
                    account.google_account_id.trim(),
                    account.email.trim(),
                    account.refresh_token,
                    account.access_token,
                    account.token_expiry,
                    account.scopes,
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("GoogleAccount"))?;
            Ok(account_id.clone())
        })
    }

    pub fn get(&self, account_id: &str) -> DbResult<Option<GoogleAccount>> {
        self.session.run(|conn| fetch_one(conn, SELECT_ACCOUNT_BY_ID, [account_id]))
    }

    pub fn get_by_google_id(&self, google_account_id: &str) -> DbResult<Option<GoogleAccount>> {
        self.session.run(|conn| fetch_one(conn, SELECT_ACCOUNT_BY_GOOGLE_ID, [google_account_id]))
    }

    pub fn list_for_user(&self, user_id: &str) -> DbResult<Vec<GoogleAccount>> {
        self.session.run(|conn| fetch_all(conn, SELECT_ACCOUNTS_FOR_USER, [user_id]))
    }

    pub fn update(&self, account_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "UserGoogleAccounts",
                "user_google_account_id",
                SqlValue::Text(account_id.to_string()),
                ACCOUNT_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "GoogleAccount", account_id)
        })
    }

    /// Removes the account and its sync log.
    pub fn delete(&self, account_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "UserGoogleAccounts",
                "user_google_account_id",
                SqlValue::Text(account_id.to_string()),
                "GoogleAccount",
            )
        })
    }
}

pub struct ContactSyncLog<'a> {
    session: Session<'a>,
}

impl<'a> ContactSyncLog<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, entry: &NewSyncLogEntry) -> DbResult<i64> {
        require_text("local_contact_id", &entry.local_contact_id)?;
        require_text("local_contact_type", &entry.local_contact_type)?;
        require_text("sync_status", &entry.sync_status)?;
        self.session.run(|conn| {
            if !exists(
                conn,
                "SELECT 1 FROM UserGoogleAccounts WHERE user_google_account_id = ?1",
                [&entry.user_google_account_id],
            )? {
                return Err(DbError::not_found("GoogleAccount", &entry.user_google_account_id));
            }
            conn.execute(
                INSERT_SYNC_LOG,
                params![
                    entry.user_google_account_id,
                    entry.local_contact_id,
                    entry.local_contact_type,
                    entry.google_contact_id,
                    entry.etag,
                    entry.sync_status,
                    entry.sync_direction,
                    entry.error_message,
                    entry.last_sync_timestamp,
                    now_iso()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, sync_log_id: i64) -> DbResult<Option<SyncLogEntry>> {
        self.session.run(|conn| fetch_one(conn, SELECT_SYNC_LOG_BY_ID, [sync_log_id]))
    }

    pub fn get_for_contact(&self, account_id: &str, local_contact_id: &str, local_contact_type: &str) -> DbResult<Option<SyncLogEntry>> {
        self.session.run(|conn| {
            fetch_one(
                conn,
                SELECT_SYNC_LOG_FOR_CONTACT,
                params![account_id, local_contact_id, local_contact_type],
            )
        })
    }

    pub fn list_for_account(&self, account_id: &str) -> DbResult<Vec<SyncLogEntry>> {
        self.session.run(|conn| fetch_all(conn, SELECT_SYNC_LOG_FOR_ACCOUNT, [account_id]))
    }

    pub fn update(&self, sync_log_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "ContactSyncLog",
                "sync_log_id",
                SqlValue::Integer(sync_log_id),
                SYNC_LOG_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "SyncLogEntry", sync_log_id)
        })
    }

    pub fn delete(&self, sync_log_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "ContactSyncLog", "sync_log_id", SqlValue::Integer(sync_log_id), "SyncLogEntry"))
    }
}
