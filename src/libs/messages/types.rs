/// Every user-facing and diagnostic message emitted by the back-office core.
///
/// Text lives in `display.rs`; call sites only pick a variant and fill in
/// its parameters.
#[derive(Debug, Clone)]
pub enum Message {
    // === DATABASE MESSAGES ===
    DatabaseOpened(String),
    DatabaseInitialized(String),
    DatabaseVersion(u32),
    DatabaseUpToDate,
    DatabaseNeedsUpdate,
    SchemaVersionRecorded(String),
    TransactionRolledBack(String),

    // === MIGRATION MESSAGES ===
    MigrationsFound(usize),
    RunningMigration(u32, String),
    MigrationCompleted(u32),
    MigrationFailed(u32, String),
    AllMigrationsCompleted,
    MigrationHistory,
    ColumnAdded(String, String), // table, column
    TemplatesRebuildStarted,
    TemplatesRebuildCompleted(usize),
    TemplatesRebuildFailed(String),
    ProductsUniquenessRebuilt(usize),

    // === SEED MESSAGES ===
    StatusesSeeded(usize),
    TemplateCategoriesSeeded(usize),
    AdminUserSeeded(String),
    CoverPageTemplatesSeeded(usize),
    SettingsSeeded,

    // === INTEGRITY MESSAGES ===
    ConflictDetected(String),
    DefaultChanged(&'static str, String), // entity, id
    LocationCycleRejected(String),
    LocationHasChildren(String),
    EquivalencyExists(i64),
    ProgressExists(String),
    PasswordMismatch(String),

    // === CONFIGURATION MESSAGES ===
    ConfigLoaded(String),
    ConfigFileNotFound,
    ConfigParseError(String),
    ConfigSaved,
    ConfigNotInstalled,

    // === CLI MESSAGES ===
    StatusCatalogueHeader,
    NoStatusesFound,
    SettingsHeader,
    NoSettingsFound,
}
