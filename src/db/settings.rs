//! Key/value application settings.

use super::db::Session;
use super::error::DbResult;
use super::rows::{hard_delete, require_text};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

/// Schema version recorded after seeding.
pub const KEY_SEEDED_VERSION: &str = "initial_data_seeded_version";
pub const KEY_DEFAULT_LANGUAGE: &str = "default_app_language";

const SELECT_SETTING: &str = "SELECT setting_value FROM ApplicationSettings WHERE setting_key = ?1";
const SELECT_SETTINGS: &str = "SELECT setting_key, setting_value FROM ApplicationSettings ORDER BY setting_key";
const UPSERT_SETTING: &str = "INSERT INTO ApplicationSettings (setting_key, setting_value) VALUES (?1, ?2)
    ON CONFLICT(setting_key) DO UPDATE SET setting_value = excluded.setting_value";

pub struct ApplicationSettings<'a> {
    session: Session<'a>,
}

impl<'a> ApplicationSettings<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// `None` when the key is absent or stored as NULL.
    pub fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.session.run(|conn| {
            let value: Option<Option<String>> = conn.query_row(SELECT_SETTING, [key], |row| row.get(0)).optional()?;
            Ok(value.flatten())
        })
    }

    pub fn set(&self, key: &str, value: &str) -> DbResult<()> {
        require_text("setting_key", key)?;
        self.session.run(|conn| {
            conn.execute(UPSERT_SETTING, params![key.trim(), value])?;
            Ok(())
        })
    }

    pub fn all(&self) -> DbResult<BTreeMap<String, Option<String>>> {
        self.session.run(|conn| {
            let mut stmt = conn.prepare(SELECT_SETTINGS)?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)))?;
            let mut settings = BTreeMap::new();
            for row in rows {
                let (key, value) = row?;
                settings.insert(key, value);
            }
            Ok(settings)
        })
    }

    pub fn delete(&self, key: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "ApplicationSettings", "setting_key", SqlValue::Text(key.to_string()), "Setting")
        })
    }
}
