//! Error kinds surfaced by every repository.

use rusqlite::ffi;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Integrity,
    Storage,
}

#[derive(Error, Debug)]
pub enum DbError {
    /// Missing or malformed input, or a value outside its vocabulary.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Referenced row does not exist or is soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Duplicate natural key or a refused structural change.
    #[error("{entity} conflict: {detail}")]
    Conflict {
        entity: &'static str,
        detail: String,
        existing_id: Option<String>,
    },

    /// Foreign-key violation not covered by a more specific check.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn conflict(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            detail: detail.into(),
            existing_id: None,
        }
    }

    pub fn conflict_with(entity: &'static str, detail: impl Into<String>, existing_id: impl ToString) -> Self {
        Self::Conflict {
            entity,
            detail: detail.into(),
            existing_id: Some(existing_id.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub fn existing_id(&self) -> Option<&str> {
        match self {
            Self::Conflict { existing_id, .. } => existing_id.as_deref(),
            _ => None,
        }
    }

    /// Rewrites a generic constraint conflict so it names the entity involved.
    pub fn for_entity(self, entity: &'static str) -> Self {
        match self {
            Self::Conflict {
                entity: "Record",
                detail,
                existing_id,
            } => Self::Conflict { entity, detail, existing_id },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, message) = &e {
            let detail = message.clone().unwrap_or_else(|| err.to_string());
            return match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Self::conflict("Record", detail),
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::Integrity(detail),
                ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => Self::validation("constraint", detail),
                _ => Self::Storage(detail),
            };
        }
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id), qty REAL CHECK (qty >= 0));
             INSERT INTO parent (id, name) VALUES (1, 'a');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn unique_violation_is_a_conflict() {
        let err: DbError = conn().execute("INSERT INTO parent (name) VALUES ('a')", []).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err.for_entity("Parent"), DbError::Conflict { entity: "Parent", .. }));
    }

    #[test]
    fn foreign_key_violation_is_integrity() {
        let err: DbError = conn().execute("INSERT INTO child (parent_id) VALUES (99)", []).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn check_and_not_null_are_validation() {
        let conn = conn();
        let check: DbError = conn.execute("INSERT INTO child (parent_id, qty) VALUES (1, -1)", []).unwrap_err().into();
        let not_null: DbError = conn.execute("INSERT INTO parent (name) VALUES (NULL)", []).unwrap_err().into();
        assert_eq!(check.kind(), ErrorKind::Validation);
        assert_eq!(not_null.kind(), ErrorKind::Validation);
    }

    #[test]
    fn other_failures_are_storage() {
        let err: DbError = conn().execute("SELECT * FROM missing_table", []).unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
