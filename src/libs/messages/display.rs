//! Display implementation for back-office messages.
//!
//! All message text is defined here so that call sites stay free of string
//! literals and the wording can be reviewed in one place.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = match self {
            // === DATABASE MESSAGES ===
            Message::DatabaseOpened(path) => format!("Opened database at {}", path),
            Message::DatabaseInitialized(path) => format!("Database initialized at {}", path),
            Message::DatabaseVersion(version) => format!("Current database version: {}", version),
            Message::DatabaseUpToDate => "Database schema is up to date".to_string(),
            Message::DatabaseNeedsUpdate => "Database schema needs an upgrade, run `backoffice init`".to_string(),
            Message::SchemaVersionRecorded(version) => format!("Schema version {} recorded", version),
            Message::TransactionRolledBack(reason) => format!("Transaction rolled back: {}", reason),

            // === MIGRATION MESSAGES ===
            Message::MigrationsFound(count) => format!("Found {} pending schema upgrade(s)", count),
            Message::RunningMigration(version, name) => format!("Applying upgrade v{}: {}", version, name),
            Message::MigrationCompleted(version) => format!("Upgrade v{} applied", version),
            Message::MigrationFailed(version, error) => format!("Upgrade v{} failed: {}", version, error),
            Message::AllMigrationsCompleted => "All schema upgrades applied".to_string(),
            Message::MigrationHistory => "Schema upgrade history:".to_string(),
            Message::ColumnAdded(table, column) => format!("Added missing column {}.{}", table, column),
            Message::TemplatesRebuildStarted => "Rebuilding Templates to move text categories into TemplateCategories".to_string(),
            Message::TemplatesRebuildCompleted(rows) => format!("Templates rebuilt, {} row(s) migrated", rows),
            Message::TemplatesRebuildFailed(error) => format!("Templates rebuild failed, old table kept: {}", error),
            Message::ProductsUniquenessRebuilt(rows) => {
                format!("Products rebuilt with live-only name and code uniqueness, {} row(s) copied", rows)
            }

            // === SEED MESSAGES ===
            Message::StatusesSeeded(count) => format!("Seeded {} status setting(s)", count),
            Message::TemplateCategoriesSeeded(count) => format!("Seeded {} template categor(ies)", count),
            Message::AdminUserSeeded(username) => format!("Created default administrator '{}'", username),
            Message::CoverPageTemplatesSeeded(count) => format!("Seeded {} cover page template(s)", count),
            Message::SettingsSeeded => "Application settings seeded".to_string(),

            // === INTEGRITY MESSAGES ===
            Message::ConflictDetected(detail) => format!("Conflict: {}", detail),
            Message::DefaultChanged(entity, id) => format!("{} {} is now the default", entity, id),
            Message::LocationCycleRejected(id) => format!("Location {} cannot become its own ancestor", id),
            Message::LocationHasChildren(id) => format!("Location {} still has child locations", id),
            Message::EquivalencyExists(id) => format!("Equivalency already exists with id {}", id),
            Message::ProgressExists(id) => format!("Candidate progress already exists with id {}", id),
            Message::PasswordMismatch(username) => format!("Password verification failed for '{}'", username),

            // === CONFIGURATION MESSAGES ===
            Message::ConfigLoaded(path) => format!("Configuration loaded from {}", path),
            Message::ConfigFileNotFound => "Configuration file not found, using defaults".to_string(),
            Message::ConfigParseError(error) => format!("Failed to parse configuration: {}", error),
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigNotInstalled => "No configuration installed, falling back to defaults".to_string(),

            // === CLI MESSAGES ===
            Message::StatusCatalogueHeader => "Status catalogue".to_string(),
            Message::NoStatusesFound => "No statuses found".to_string(),
            Message::SettingsHeader => "Application settings".to_string(),
            Message::NoSettingsFound => "No application settings stored".to_string(),
        };
        write!(f, "{}", text)
    }
}
