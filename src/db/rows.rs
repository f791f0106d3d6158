//! Row mapping, query building and value helpers shared by the repositories.

use super::error::{DbError, DbResult};
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Params, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Partial update payload: column name to new value. Keys outside a
/// repository's whitelist are dropped.
pub type Changes = Map<String, Value>;

/// Marker used by some callers instead of a real user id. Stored as NULL.
pub const SYSTEM_USER: &str = "SYSTEM_USER";

/// Outcome of a resolve-or-create call: the id, and whether a row was inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<I> {
    pub id: I,
    pub created: bool,
}

impl<I> Resolved<I> {
    pub fn created(id: I) -> Self {
        Self { id, created: true }
    }

    pub fn existing(id: I) -> Self {
        Self { id, created: false }
    }
}

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn fetch_one<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> DbResult<Option<T>> {
    Ok(conn.query_row(sql, params, T::from_row).optional()?)
}

pub fn fetch_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> DbResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, T::from_row)?;

    let mut items = Vec::new();
    for item in rows {
        items.push(item?);
    }
    Ok(items)
}

pub fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> DbResult<bool> {
    Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

/// UTC timestamp, RFC 3339 with microseconds and a trailing `Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Opaque identifier: a v4 UUID as 32 lowercase hex characters.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Accepts `YYYY-MM-DD` or an ISO datetime (with or without `Z`).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalises the `SYSTEM_USER` marker and blank ids to NULL.
pub fn user_ref(user_id: Option<&str>) -> Option<String> {
    match user_id {
        Some(id) if id.trim().is_empty() || id == SYSTEM_USER => None,
        Some(id) => Some(id.to_string()),
        None => None,
    }
}

pub fn require_text(field: &str, value: &str) -> DbResult<()> {
    if value.trim().is_empty() {
        return Err(DbError::validation(field, "must not be empty"));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: f64) -> DbResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DbError::validation(field, "must be a non-negative number"));
    }
    Ok(())
}

pub fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Keeps only whitelisted keys.
pub fn filter_changes(changes: &Changes, allowed: &[&str]) -> Changes {
    changes
        .iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Reads a numeric change, accepting numbers and numeric strings.
pub fn change_f64(changes: &Changes, key: &str) -> DbResult<Option<f64>> {
    match changes.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DbError::validation(key.to_string(), format!("'{}' is not a number", s))),
        Some(other) => Err(DbError::validation(key.to_string(), format!("expected a number, got {}", other))),
    }
}

/// Whitelisted partial update. `stamp` names the column refreshed with the
/// current time, if the table has one. Returns the number of rows touched.
pub fn update_row(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: SqlValue,
    allowed: &[&str],
    changes: &Changes,
    stamp: Option<&str>,
) -> DbResult<usize> {
    update_where(conn, table, key_column, key, allowed, changes, stamp, "")
}

/// [`update_row`] for soft-deleted tables: a deleted row is left untouched
/// and counts as not found.
pub fn update_live_row(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: SqlValue,
    allowed: &[&str],
    changes: &Changes,
    stamp: Option<&str>,
) -> DbResult<usize> {
    update_where(conn, table, key_column, key, allowed, changes, stamp, " AND is_deleted = 0")
}

#[allow(clippy::too_many_arguments)]
fn update_where(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: SqlValue,
    allowed: &[&str],
    changes: &Changes,
    stamp: Option<&str>,
    guard: &str,
) -> DbResult<usize> {
    let changes = filter_changes(changes, allowed);
    if changes.is_empty() {
        return Err(DbError::validation("changes", "no updatable fields supplied"));
    }

    let mut sets: Vec<String> = Vec::with_capacity(changes.len() + 1);
    let mut values: Vec<SqlValue> = Vec::with_capacity(changes.len() + 2);
    for (column, value) in &changes {
        sets.push(format!("{} = ?", column));
        values.push(json_to_sql(value));
    }
    if let Some(column) = stamp {
        sets.push(format!("{} = ?", column));
        values.push(SqlValue::Text(now_iso()));
    }
    values.push(key);

    let sql = format!("UPDATE {} SET {} WHERE {} = ?{}", table, sets.join(", "), key_column, guard);
    Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
}

/// Turns a write that touched no row into NotFound.
pub fn found(affected: usize, entity: &'static str, id: impl ToString) -> DbResult<usize> {
    if affected == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(affected)
}

/// Flags a row deleted. `deleted_at` keeps the first deletion time.
pub fn soft_delete(conn: &Connection, table: &str, key_column: &str, key: SqlValue, entity: &'static str, extra_sets: &str) -> DbResult<()> {
    let now = now_iso();
    let sql = format!(
        "UPDATE {} SET is_deleted = 1, deleted_at = COALESCE(deleted_at, ?1), updated_at = ?1{} WHERE {} = ?2",
        table, extra_sets, key_column
    );
    let affected = conn.execute(&sql, rusqlite::params![now, &key])?;
    if affected == 0 {
        return Err(DbError::not_found(entity, display_key(&key)));
    }
    Ok(())
}

pub fn hard_delete(conn: &Connection, table: &str, key_column: &str, key: SqlValue, entity: &'static str) -> DbResult<()> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", table, key_column);
    let affected = conn.execute(&sql, [&key])?;
    if affected == 0 {
        return Err(DbError::not_found(entity, display_key(&key)));
    }
    Ok(())
}

/// Fills `existing_id` on a bare UNIQUE conflict with the id `lookup`
/// selects. Other errors pass through.
pub fn with_holder<P: Params>(err: DbError, conn: &Connection, lookup: &str, params: P) -> DbError {
    match err {
        DbError::Conflict {
            entity,
            detail,
            existing_id: None,
        } => {
            let holder = conn
                .query_row(lookup, params, |row| row.get::<_, SqlValue>(0))
                .optional()
                .ok()
                .flatten();
            DbError::Conflict {
                entity,
                detail,
                existing_id: holder.as_ref().map(display_key),
            }
        }
        other => other,
    }
}

fn display_key(key: &SqlValue) -> String {
    match key {
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Real(r) => r.to_string(),
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Blob(_) => "<blob>".to_string(),
    }
}

/// Column names of a table, empty when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    let mut columns = Vec::new();
    for column in rows {
        columns.push(column?);
    }
    Ok(columns)
}

pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    exists(conn, "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1", [table])
}

/// Offset/limit pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    /// `LIMIT -1` stands in for "no limit" when only an offset is given.
    pub fn to_sql(&self) -> String {
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!(" LIMIT {}", limit),
            (None, Some(offset)) => format!(" LIMIT -1 OFFSET {}", offset),
            (None, None) => String::new(),
        }
    }
}

/// WHERE-clause builder with positional parameters.
#[derive(Debug, Default)]
pub struct Conditions {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause holding exactly one `?`.
    pub fn push(&mut self, clause: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.clauses.push(clause.to_string());
        self.params.push(value.into());
        self
    }

    pub fn push_opt<V: Into<SqlValue>>(&mut self, clause: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(clause, value);
        }
        self
    }

    pub fn push_raw(&mut self, clause: &str) -> &mut Self {
        self.clauses.push(clause.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn to_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn query<T: FromRow>(&self, conn: &Connection, select: &str, tail: &str) -> DbResult<Vec<T>> {
        let sql = format!("{}{}{}", select, self.to_sql(), tail);
        fetch_all(conn, &sql, params_from_iter(self.params.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_renders_every_combination() {
        assert_eq!(Page::default().to_sql(), "");
        assert_eq!(Page::limit(5).to_sql(), " LIMIT 5");
        assert_eq!(Page::new(Some(5), Some(10)).to_sql(), " LIMIT 5 OFFSET 10");
        assert_eq!(Page::new(None, Some(10)).to_sql(), " LIMIT -1 OFFSET 10");
    }

    #[test]
    fn conditions_join_with_and() {
        let mut conditions = Conditions::new();
        conditions.push("client_id = ?", "c1".to_string()).push_raw("is_deleted = 0").push_opt::<i64>("status_id = ?", None);
        assert_eq!(conditions.to_sql(), " WHERE client_id = ? AND is_deleted = 0");
        assert_eq!(conditions.params().len(), 1);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let changes = json!({"client_name": "A", "hacker": "x"}).as_object().cloned().unwrap();
        let kept = filter_changes(&changes, &["client_name"]);
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key("client_name"));
    }

    #[test]
    fn dates_parse_from_both_representations() {
        let expected = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        assert_eq!(parse_date("2023-04-01"), Some(expected));
        assert_eq!(parse_date("2023-04-01T10:20:30.123456Z"), Some(expected));
        assert_eq!(parse_date("2023-04-01 10:20:30"), Some(expected));
        assert_eq!(parse_date("April 1st"), None);
    }

    #[test]
    fn system_user_marker_becomes_null() {
        assert_eq!(user_ref(Some(SYSTEM_USER)), None);
        assert_eq!(user_ref(Some("  ")), None);
        assert_eq!(user_ref(Some("abc")), Some("abc".to_string()));
    }

    #[test]
    fn numeric_changes_accept_strings() {
        let changes = json!({"quantity": "2.5", "bad": "x", "n": 3}).as_object().cloned().unwrap();
        assert_eq!(change_f64(&changes, "quantity").unwrap(), Some(2.5));
        assert_eq!(change_f64(&changes, "n").unwrap(), Some(3.0));
        assert_eq!(change_f64(&changes, "missing").unwrap(), None);
        assert!(change_f64(&changes, "bad").is_err());
    }

    #[test]
    fn timestamps_end_with_z() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert_eq!(new_id().len(), 32);
    }
}
