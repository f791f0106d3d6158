//! Application users. Only a salt and a hex digest of the password are stored.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{fetch_all, fetch_one, filter_changes, found, new_id, now_iso, require_text, soft_delete, update_live_row, with_holder, Changes, FromRow};
use crate::libs::messages::Message;
use crate::libs::password::{generate_salt, hash_password, verify_password};
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const INSERT_USER: &str = "INSERT INTO Users
    (user_id, username, email, password_hash, salt, full_name, role, is_active, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)";
const SELECT_USER_BY_ID: &str = "SELECT * FROM Users WHERE user_id = ?1";
const SELECT_LIVE_USER_BY_ID: &str = "SELECT * FROM Users WHERE user_id = ?1 AND is_deleted = 0";
const SELECT_USER_BY_USERNAME: &str = "SELECT * FROM Users WHERE username = ?1 AND is_deleted = 0";
const SELECT_USER_BY_EMAIL: &str = "SELECT * FROM Users WHERE email = ?1 AND is_deleted = 0";
const SELECT_USERS: &str = "SELECT * FROM Users WHERE is_deleted = 0 ORDER BY username";
const SELECT_ALL_USERS: &str = "SELECT * FROM Users ORDER BY username";
const UPDATE_LAST_LOGIN: &str = "UPDATE Users SET last_login_at = ?2, updated_at = ?2 WHERE user_id = ?1 AND is_deleted = 0";

/// Columns a caller may change. `password` is accepted too and re-hashed.
const USER_COLUMNS: &[&str] = &["username", "email", "full_name", "role", "is_active"];
const USER_WRITE_COLUMNS: &[&str] = &["username", "email", "full_name", "role", "is_active", "password_hash", "salt"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Role {
    type Err = DbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "member" => Ok(Role::Member),
            other => Err(DbError::validation("role", format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            user_id: row.get("user_id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            salt: row.get("salt")?,
            full_name: row.get("full_name")?,
            role: row.get("role")?,
            is_active: row.get("is_active")?,
            last_login_at: row.get("last_login_at")?,
            is_deleted: row.get("is_deleted")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
}

fn require_email(value: &str) -> DbResult<()> {
    require_text("email", value)?;
    if !value.contains('@') {
        return Err(DbError::validation("email", format!("'{}' is not an email address", value)));
    }
    Ok(())
}

pub struct Users<'a> {
    session: Session<'a>,
}

impl<'a> Users<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, user: &NewUser) -> DbResult<String> {
        require_text("username", &user.username)?;
        require_email(&user.email)?;
        require_text("password", &user.password)?;

        let user_id = new_id();
        let salt = generate_salt();
        let password_hash = hash_password(&user.password, &salt);
        self.session.run(|conn| {
            conn.execute(
                INSERT_USER,
                params![
                    user_id,
                    user.username.trim(),
                    user.email.trim(),
                    password_hash,
                    salt,
                    user.full_name,
                    user.role.to_string(),
                    now_iso()
                ],
            )
            .map_err(|e| {
                let err = DbError::from(e).for_entity("User");
                let err = with_holder(err, conn, "SELECT user_id FROM Users WHERE username = ?1", [user.username.trim()]);
                with_holder(err, conn, "SELECT user_id FROM Users WHERE email = ?1", [user.email.trim()])
            })?;
            Ok(user_id.clone())
        })
    }

    pub fn get(&self, user_id: &str, include_deleted: bool) -> DbResult<Option<User>> {
        let sql = if include_deleted { SELECT_USER_BY_ID } else { SELECT_LIVE_USER_BY_ID };
        self.session.run(|conn| fetch_one(conn, sql, [user_id]))
    }

    pub fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        self.session.run(|conn| fetch_one(conn, SELECT_USER_BY_USERNAME, [username.trim()]))
    }

    pub fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.session.run(|conn| fetch_one(conn, SELECT_USER_BY_EMAIL, [email.trim()]))
    }

    pub fn list(&self, include_deleted: bool) -> DbResult<Vec<User>> {
        let sql = if include_deleted { SELECT_ALL_USERS } else { SELECT_USERS };
        self.session.run(|conn| fetch_all(conn, sql, []))
    }

    /// Partial update. A `password` key is re-hashed under a fresh salt.
    pub fn update(&self, user_id: &str, changes: &Changes) -> DbResult<usize> {
        let mut accepted = filter_changes(changes, USER_COLUMNS);
        if let Some(role) = accepted.get("role").and_then(Value::as_str) {
            let role: Role = role.parse()?;
            accepted.insert("role".into(), Value::String(role.to_string()));
        }
        if let Some(email) = accepted.get("email").and_then(Value::as_str) {
            require_email(email)?;
        }
        if let Some(password) = changes.get("password").and_then(Value::as_str) {
            require_text("password", password)?;
            let salt = generate_salt();
            accepted.insert("password_hash".into(), Value::String(hash_password(password, &salt)));
            accepted.insert("salt".into(), Value::String(salt));
        }

        self.session.run(|conn| {
            let affected = update_live_row(
                conn,
                "Users",
                "user_id",
                SqlValue::Text(user_id.to_string()),
                USER_WRITE_COLUMNS,
                &accepted,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("User"))?;
            found(affected, "User", user_id)
        })
    }

    pub fn update_last_login(&self, user_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            found(conn.execute(UPDATE_LAST_LOGIN, params![user_id, now_iso()])?, "User", user_id)?;
            Ok(())
        })
    }

    /// Soft delete; the account is deactivated as well.
    pub fn delete(&self, user_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| soft_delete(conn, "Users", "user_id", SqlValue::Text(user_id.to_string()), "User", ", is_active = 0"))
    }

    /// Returns the user when the password matches and the account is active.
    pub fn verify_user_password(&self, username: &str, password: &str) -> DbResult<Option<User>> {
        let Some(user) = self.get_by_username(username)? else {
            return Ok(None);
        };
        if !user.is_active || !verify_password(password, &user.salt, &user.password_hash) {
            msg_debug!(Message::PasswordMismatch(username.to_string()));
            return Ok(None);
        }
        Ok(Some(user))
    }
}
