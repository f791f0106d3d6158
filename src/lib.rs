//! # Backoffice - persistence core of a small-business back office
//!
//! An embedded SQLite store for clients, contacts, partners, products,
//! projects, invoicing, recruitment, inventory locations, document templates
//! and the experience journal, with the integrity rules that keep that data
//! consistent.
//!
//! ## Features
//!
//! - **Schema management**: create-if-absent tables, in-place upgrades with a
//!   recorded history, idempotent seeding of reference data
//! - **Repositories**: one type per table, each operation atomic
//! - **Integrity policies**: soft deletes, single-default flags, computed
//!   link totals, canonical equivalency pairs, cycle-free location trees
//! - **Result envelope**: uniform success/error payloads for collaborators
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backoffice::db::db::Db;
//! use backoffice::db::schema::initialize_database;
//! use backoffice::libs::config::AppConfig;
//!
//! let config = AppConfig::with_database("backoffice.db");
//! let db = Db::open(config.resolved_database_path())?;
//! initialize_database(&db, &config)?;
//! let countries = db.session().countries().list()?;
//! # Ok::<(), backoffice::db::error::DbError>(())
//! ```

pub mod commands;
pub mod db;
pub mod libs;
