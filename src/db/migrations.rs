//! Schema upgrades for database files created by older releases.
//!
//! Fresh databases get the full table shapes from [`super::schema`], so every
//! migration here is written to be a no-op when its change is already in
//! place. Each one is still recorded in the `migrations` history table, which
//! is what [`get_db_version`] and [`needs_migration`] read.
//!
//! Two shapes of upgrade exist:
//!
//! - **Column add**: a missing column is added in place with `ALTER TABLE`.
//! - **Table rebuild**: the table is renamed aside, recreated with the new
//!   shape, rows are copied across with a transform, and the old table is
//!   dropped. The Templates `category` → `category_id` move is the model for
//!   any future breaking change.
//!
//! All pending migrations run in one transaction. Foreign keys are switched
//! off and `legacy_alter_table` on for the duration, so a rename does not
//! rewrite references held by other tables.
//!
//! ```rust,no_run
//! use backoffice::db::migrations::{get_db_version, MigrationManager};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("backoffice.db")?;
//! MigrationManager::new().run_migrations(&mut conn)?;
//! let version = get_db_version(&conn)?;
//! # Ok::<(), backoffice::db::error::DbError>(())
//! ```

use super::db::Session;
use super::error::DbResult;
use super::rows::{exists, fetch_all, now_iso, table_columns, table_exists, FromRow};
use super::schema::{SCHEMA_PRODUCTS, SCHEMA_TEMPLATES};
use super::templates::DEFAULT_TEMPLATE_CATEGORY;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error, msg_info, msg_success};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use serde::Serialize;

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

const LEGACY_TEMPLATES: &str = "Templates_legacy";
const LEGACY_PRODUCTS: &str = "Products_legacy";

#[derive(Debug, Clone)]
struct Migration {
    version: u32,
    name: &'static str,
    up: fn(&Transaction) -> DbResult<()>,
}

/// One row of the `migrations` history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
    pub version: u32,
    pub name: String,
    pub applied_at: String,
}

impl FromRow for MigrationRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MigrationRecord {
            version: row.get("version")?,
            name: row.get("name")?,
            applied_at: row.get("applied_at")?,
        })
    }
}

/// Ordered registry of upgrades.
pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationManager {
    pub fn new() -> Self {
        let mut manager = Self { migrations: Vec::new() };
        manager.register_migrations();
        manager
    }

    fn register_migrations(&mut self) {
        self.add_migration(1, "add_status_settings_icon_and_order", |tx| {
            add_missing_columns(tx, "StatusSettings", &[("icon_name", "TEXT"), ("sort_order", "INTEGER NOT NULL DEFAULT 0")])
        });

        self.add_migration(2, "add_product_weight_and_dimensions", |tx| {
            add_missing_columns(tx, "Products", &[("weight", "REAL"), ("dimensions", "TEXT")])
        });

        // ADD COLUMN cannot carry UNIQUE; the unique index is created with the others.
        self.add_migration(3, "add_product_code", |tx| add_missing_columns(tx, "Products", &[("product_code", "TEXT")]));

        self.add_migration(4, "add_soft_delete_columns", |tx| {
            for table in ["Users", "Clients", "Products", "Projects"] {
                add_missing_columns(tx, table, &[("is_deleted", "INTEGER NOT NULL DEFAULT 0"), ("deleted_at", "TEXT")])?;
            }
            Ok(())
        });

        self.add_migration(5, "add_team_member_profile_fields", |tx| {
            add_missing_columns(
                tx,
                "TeamMembers",
                &[("hire_date", "TEXT"), ("performance", "INTEGER NOT NULL DEFAULT 0"), ("skills", "TEXT")],
            )
        });

        self.add_migration(6, "move_template_category_to_category_id", rebuild_templates_category);

        self.add_migration(7, "scope_product_uniqueness_to_live_rows", rebuild_products_uniqueness);
    }

    fn add_migration(&mut self, version: u32, name: &'static str, up: fn(&Transaction) -> DbResult<()>) {
        self.migrations.push(Migration { version, name, up });
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }

    /// Applies every migration newer than the recorded version.
    ///
    /// Either all pending migrations commit together or none do; a failed
    /// rebuild leaves the original table untouched.
    pub fn run_migrations(&self, conn: &mut Connection) -> DbResult<()> {
        conn.execute(MIGRATIONS_TABLE, [])?;

        let current_version = self.get_current_version(conn)?;
        let pending: Vec<&Migration> = self.migrations.iter().filter(|m| m.version > current_version).collect();

        if pending.is_empty() {
            msg_debug!(Message::DatabaseUpToDate);
            return Ok(());
        }

        msg_info!(Message::MigrationsFound(pending.len()));

        // Both pragmas are no-ops inside a transaction, so they bracket it.
        conn.execute_batch("PRAGMA foreign_keys = OFF; PRAGMA legacy_alter_table = ON;")?;
        let result = Self::apply(conn, &pending);
        conn.execute_batch("PRAGMA legacy_alter_table = OFF; PRAGMA foreign_keys = ON;")?;
        result?;

        msg_success!(Message::AllMigrationsCompleted);
        Ok(())
    }

    fn apply(conn: &mut Connection, pending: &[&Migration]) -> DbResult<()> {
        let tx = conn.transaction()?;

        for migration in pending {
            msg_info!(Message::RunningMigration(migration.version, migration.name.to_string()));

            match (migration.up)(&tx) {
                Ok(()) => {
                    tx.execute(
                        "INSERT INTO migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                        params![migration.version, migration.name, now_iso()],
                    )?;
                    msg_success!(Message::MigrationCompleted(migration.version));
                }
                Err(e) => {
                    msg_error!(Message::MigrationFailed(migration.version, e.to_string()));
                    return Err(e);
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_current_version(&self, conn: &Connection) -> DbResult<u32> {
        if !table_exists(conn, "migrations")? {
            return Ok(0);
        }
        let version: Option<u32> = conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
        Ok(version.unwrap_or(0))
    }

    pub fn is_migration_applied(&self, conn: &Connection, version: u32) -> DbResult<bool> {
        if !table_exists(conn, "migrations")? {
            return Ok(false);
        }
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM migrations WHERE version = ?1", params![version], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn get_migration_history(&self, conn: &Connection) -> DbResult<Vec<MigrationRecord>> {
        if !table_exists(conn, "migrations")? {
            return Ok(Vec::new());
        }
        fetch_all(conn, "SELECT version, name, applied_at FROM migrations ORDER BY version", [])
    }
}

/// Adds each listed column the table lacks. Missing tables are skipped.
fn add_missing_columns(tx: &Transaction, table: &str, columns: &[(&str, &str)]) -> DbResult<()> {
    if !table_exists(tx, table)? {
        return Ok(());
    }
    let existing = table_columns(tx, table)?;

    for (column, definition) in columns {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            continue;
        }
        tx.execute(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition), [])?;
        msg_info!(Message::ColumnAdded(table.to_string(), column.to_string()));
    }
    Ok(())
}

/// Replaces the free-text `Templates.category` with a `category_id` foreign key.
fn rebuild_templates_category(tx: &Transaction) -> DbResult<()> {
    let columns = table_columns(tx, "Templates")?;
    let has = |name: &str| columns.iter().any(|c| c == name);
    if !has("category") || has("category_id") {
        return Ok(());
    }

    msg_info!(Message::TemplatesRebuildStarted);
    match copy_templates_with_category_ids(tx, &columns) {
        Ok(copied) => {
            msg_info!(Message::TemplatesRebuildCompleted(copied));
            Ok(())
        }
        Err(e) => {
            msg_error!(Message::TemplatesRebuildFailed(e.to_string()));
            Err(e)
        }
    }
}

fn copy_templates_with_category_ids(tx: &Transaction, legacy_columns: &[String]) -> DbResult<usize> {
    tx.execute(&format!("ALTER TABLE Templates RENAME TO {}", LEGACY_TEMPLATES), [])?;
    tx.execute(SCHEMA_TEMPLATES, [])?;

    let target_columns = table_columns(tx, "Templates")?;
    let shared: Vec<&str> = legacy_columns
        .iter()
        .map(String::as_str)
        .filter(|c| *c != "category" && target_columns.iter().any(|t| t == c))
        .collect();
    let missing_stamps: Vec<&str> = ["created_at", "updated_at"].into_iter().filter(|c| !shared.contains(c)).collect();

    let select = if shared.is_empty() {
        format!("SELECT category FROM {}", LEGACY_TEMPLATES)
    } else {
        format!("SELECT {}, category FROM {}", shared.join(", "), LEGACY_TEMPLATES)
    };
    let legacy_rows: Vec<(Vec<SqlValue>, Option<String>)> = {
        let mut stmt = tx.prepare(&select)?;
        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(shared.len());
            for index in 0..shared.len() {
                values.push(row.get::<_, SqlValue>(index)?);
            }
            Ok((values, row.get::<_, Option<String>>(shared.len())?))
        })?;
        let collected = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        collected
    };

    let mut insert_columns: Vec<&str> = shared.clone();
    insert_columns.extend(missing_stamps.iter().copied());
    insert_columns.push("category_id");
    let placeholders = vec!["?"; insert_columns.len()].join(", ");
    let insert = format!("INSERT INTO Templates ({}) VALUES ({})", insert_columns.join(", "), placeholders);

    let categories = Session::within(tx).template_categories();
    let now = now_iso();
    let copied = legacy_rows.len();
    for (mut values, category) in legacy_rows {
        let name = category
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_TEMPLATE_CATEGORY);
        let category_id = categories.get_or_add(name, None)?.id;

        values.extend(missing_stamps.iter().map(|_| SqlValue::Text(now.clone())));
        values.push(SqlValue::Integer(category_id));
        tx.execute(&insert, params_from_iter(values.iter()))?;
    }

    tx.execute(&format!("DROP TABLE {}", LEGACY_TEMPLATES), [])?;
    Ok(copied)
}

/// Drops the table-level `UNIQUE (product_name, language_code)` and the
/// plain code index; the partial replacements are created with the other
/// indexes.
fn rebuild_products_uniqueness(tx: &Transaction) -> DbResult<()> {
    if !table_exists(tx, "Products")? {
        return Ok(());
    }
    tx.execute("DROP INDEX IF EXISTS idx_products_code", [])?;

    let inline_unique = exists(
        tx,
        "SELECT 1 FROM sqlite_master WHERE type = 'index' AND tbl_name = 'Products' AND name LIKE 'sqlite_autoindex_Products%'",
        [],
    )?;
    if !inline_unique {
        return Ok(());
    }

    let legacy_columns = table_columns(tx, "Products")?;
    tx.execute(&format!("ALTER TABLE Products RENAME TO {}", LEGACY_PRODUCTS), [])?;
    tx.execute(SCHEMA_PRODUCTS, [])?;

    let target_columns = table_columns(tx, "Products")?;
    let shared: Vec<&str> = legacy_columns
        .iter()
        .map(String::as_str)
        .filter(|c| target_columns.iter().any(|t| t == c))
        .collect();
    let stamps: Vec<&str> = ["created_at", "updated_at"].into_iter().filter(|c| !shared.contains(c)).collect();
    let mut insert_columns = shared.clone();
    insert_columns.extend(stamps.iter().copied());
    let mut select_columns = shared.clone();
    select_columns.extend(stamps.iter().map(|_| "?1"));
    let copied = tx.execute(
        &format!(
            "INSERT INTO Products ({}) SELECT {} FROM {}",
            insert_columns.join(", "),
            select_columns.join(", "),
            LEGACY_PRODUCTS
        ),
        params_from_iter(stamps.first().map(|_| now_iso())),
    )?;
    tx.execute(&format!("DROP TABLE {}", LEGACY_PRODUCTS), [])?;

    msg_info!(Message::ProductsUniquenessRebuilt(copied));
    Ok(())
}

pub fn get_db_version(conn: &Connection) -> DbResult<u32> {
    MigrationManager::new().get_current_version(conn)
}

pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let manager = MigrationManager::new();
    Ok(manager.get_current_version(conn)? < manager.latest_version())
}
