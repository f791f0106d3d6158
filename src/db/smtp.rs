//! Outgoing mail server configurations. One may be the default.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, now_iso, require_text, update_row, Changes, FromRow};
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

const INSERT_SMTP_CONFIG: &str = "INSERT INTO SmtpConfigs
    (config_name, smtp_server, smtp_port, username, password_encrypted, use_tls, is_default, sender_email_address,
     sender_display_name, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?9)";
const SELECT_SMTP_CONFIG_BY_ID: &str = "SELECT * FROM SmtpConfigs WHERE smtp_config_id = ?1";
const SELECT_SMTP_CONFIGS: &str = "SELECT * FROM SmtpConfigs ORDER BY config_name";
const SELECT_DEFAULT_SMTP_CONFIG: &str = "SELECT * FROM SmtpConfigs WHERE is_default = 1";
const CLEAR_DEFAULT_SMTP_CONFIG: &str = "UPDATE SmtpConfigs SET is_default = 0, updated_at = ?1 WHERE is_default = 1 AND smtp_config_id != ?2";
const SET_DEFAULT_SMTP_CONFIG: &str = "UPDATE SmtpConfigs SET is_default = 1, updated_at = ?1 WHERE smtp_config_id = ?2";

const SMTP_COLUMNS: &[&str] = &[
    "config_name",
    "smtp_server",
    "smtp_port",
    "username",
    "password_encrypted",
    "use_tls",
    "sender_email_address",
    "sender_display_name",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub smtp_config_id: i64,
    pub config_name: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    /// Stored as supplied; encryption is the caller's concern.
    #[serde(skip_serializing)]
    pub password_encrypted: Option<String>,
    pub use_tls: bool,
    pub is_default: bool,
    pub sender_email_address: String,
    pub sender_display_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for SmtpConfig {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SmtpConfig {
            smtp_config_id: row.get("smtp_config_id")?,
            config_name: row.get("config_name")?,
            smtp_server: row.get("smtp_server")?,
            smtp_port: row.get("smtp_port")?,
            username: row.get("username")?,
            password_encrypted: row.get("password_encrypted")?,
            use_tls: row.get("use_tls")?,
            is_default: row.get("is_default")?,
            sender_email_address: row.get("sender_email_address")?,
            sender_display_name: row.get("sender_display_name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSmtpConfig {
    pub config_name: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password_encrypted: Option<String>,
    pub use_tls: bool,
    pub is_default: bool,
    pub sender_email_address: String,
    pub sender_display_name: Option<String>,
}

impl Default for NewSmtpConfig {
    fn default() -> Self {
        NewSmtpConfig {
            config_name: String::new(),
            smtp_server: String::new(),
            smtp_port: 587,
            username: None,
            password_encrypted: None,
            use_tls: true,
            is_default: false,
            sender_email_address: String::new(),
            sender_display_name: None,
        }
    }
}

fn make_default(conn: &Connection, smtp_config_id: i64) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM SmtpConfigs WHERE smtp_config_id = ?1", [smtp_config_id])? {
        return Err(DbError::not_found("SmtpConfig", smtp_config_id));
    }
    let now = now_iso();
    conn.execute(CLEAR_DEFAULT_SMTP_CONFIG, params![now, smtp_config_id])?;
    conn.execute(SET_DEFAULT_SMTP_CONFIG, params![now, smtp_config_id])?;
    msg_debug!(Message::DefaultChanged("SmtpConfig", smtp_config_id.to_string()));
    Ok(())
}

pub struct SmtpConfigs<'a> {
    session: Session<'a>,
}

impl<'a> SmtpConfigs<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, config: &NewSmtpConfig) -> DbResult<i64> {
        require_text("config_name", &config.config_name)?;
        require_text("smtp_server", &config.smtp_server)?;
        require_text("sender_email_address", &config.sender_email_address)?;
        if config.smtp_port == 0 {
            return Err(DbError::validation("smtp_port", "must be a valid port"));
        }
        self.session.run(|conn| {
            conn.execute(
                INSERT_SMTP_CONFIG,
                params![
                    config.config_name.trim(),
                    config.smtp_server.trim(),
                    config.smtp_port,
                    config.username,
                    config.password_encrypted,
                    config.use_tls,
                    config.sender_email_address.trim(),
                    config.sender_display_name,
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("SmtpConfig"))?;
            let smtp_config_id = conn.last_insert_rowid();
            if config.is_default {
                make_default(conn, smtp_config_id)?;
            }
            Ok(smtp_config_id)
        })
    }

    pub fn get(&self, smtp_config_id: i64) -> DbResult<Option<SmtpConfig>> {
        self.session.run(|conn| fetch_one(conn, SELECT_SMTP_CONFIG_BY_ID, [smtp_config_id]))
    }

    pub fn list(&self) -> DbResult<Vec<SmtpConfig>> {
        self.session.run(|conn| fetch_all(conn, SELECT_SMTP_CONFIGS, []))
    }

    pub fn get_default(&self) -> DbResult<Option<SmtpConfig>> {
        self.session.run(|conn| fetch_one(conn, SELECT_DEFAULT_SMTP_CONFIG, []))
    }

    pub fn set_default(&self, smtp_config_id: i64) -> DbResult<()> {
        self.session.run(|conn| make_default(conn, smtp_config_id))
    }

    pub fn update(&self, smtp_config_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "SmtpConfigs",
                "smtp_config_id",
                SqlValue::Integer(smtp_config_id),
                SMTP_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("SmtpConfig"))?;
            found(affected, "SmtpConfig", smtp_config_id)
        })
    }

    pub fn delete(&self, smtp_config_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "SmtpConfigs", "smtp_config_id", SqlValue::Integer(smtp_config_id), "SmtpConfig"))
    }
}
