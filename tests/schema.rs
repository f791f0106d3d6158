#[cfg(test)]
mod tests {
    use backoffice::db::db::Db;
    use backoffice::db::migrations::{get_db_version, needs_migration, MigrationManager};
    use backoffice::db::products::NewProduct;
    use backoffice::db::rows::table_columns;
    use backoffice::db::schema::initialize_database;
    use backoffice::db::settings::{KEY_DEFAULT_LANGUAGE, KEY_SEEDED_VERSION};
    use backoffice::db::templates::{TemplateFilter, DEFAULT_TEMPLATE_CATEGORY};
    use backoffice::libs::config::AppConfig;
    use rusqlite::Connection;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct SchemaTestContext {
        _temp_dir: TempDir,
        db_path: PathBuf,
        config: AppConfig,
    }

    impl TestContext for SchemaTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let config = AppConfig {
                app_root_dir: temp_dir.path().to_path_buf(),
                ..AppConfig::with_database(db_path.display().to_string())
            };
            SchemaTestContext {
                _temp_dir: temp_dir,
                db_path,
                config,
            }
        }
    }

    impl SchemaTestContext {
        fn initialized(&self) -> Db {
            let db = Db::open(&self.db_path).unwrap();
            initialize_database(&db, &self.config).unwrap();
            db
        }

        fn count(&self, db: &Db, table: &str) -> i64 {
            db.session()
                .run(|conn| Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?))
                .unwrap()
        }
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_fresh_database_is_seeded(ctx: &mut SchemaTestContext) {
        let db = ctx.initialized();
        let session = db.session();

        let client_statuses = session.statuses().list(Some("Client")).unwrap();
        assert!(client_statuses.iter().any(|s| s.status_name == "Archivé" && s.is_archival_status));
        assert!(session.template_categories().get_by_name(DEFAULT_TEMPLATE_CATEGORY).unwrap().is_some());

        let admin = session.users().get_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.role, "admin");

        assert!(session.cover_page_templates().get_default().unwrap().is_some());

        let settings = session.settings();
        assert_eq!(settings.get(KEY_DEFAULT_LANGUAGE).unwrap().as_deref(), Some("fr"));
        let expected = MigrationManager::new().latest_version().to_string();
        assert_eq!(settings.get(KEY_SEEDED_VERSION).unwrap(), Some(expected));
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_initialization_is_idempotent(ctx: &mut SchemaTestContext) {
        let db = ctx.initialized();
        let statuses = ctx.count(&db, "StatusSettings");
        let categories = ctx.count(&db, "TemplateCategories");
        let users = ctx.count(&db, "Users");
        let covers = ctx.count(&db, "CoverPageTemplates");
        let history = ctx.count(&db, "migrations");

        initialize_database(&db, &ctx.config).unwrap();

        assert_eq!(ctx.count(&db, "StatusSettings"), statuses);
        assert_eq!(ctx.count(&db, "TemplateCategories"), categories);
        assert_eq!(ctx.count(&db, "Users"), users);
        assert_eq!(ctx.count(&db, "CoverPageTemplates"), covers);
        assert_eq!(ctx.count(&db, "migrations"), history);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_migration_history_is_recorded_in_order(ctx: &mut SchemaTestContext) {
        let db = ctx.initialized();

        db.with_connection(|conn| {
            let manager = MigrationManager::new();
            let history = manager.get_migration_history(conn)?;
            assert_eq!(history.len() as u32, manager.latest_version());
            for (index, record) in history.iter().enumerate() {
                assert_eq!(record.version as usize, index + 1);
            }
            assert_eq!(get_db_version(conn)?, manager.latest_version());
            assert!(!needs_migration(conn)?);
            assert!(manager.is_migration_applied(conn, 1)?);
            Ok(())
        })
        .unwrap();
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_missing_columns_are_added(ctx: &mut SchemaTestContext) {
        {
            let conn = Connection::open(&ctx.db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE StatusSettings (
                    status_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    status_name TEXT NOT NULL,
                    status_type TEXT NOT NULL,
                    color_hex TEXT,
                    default_duration_days INTEGER,
                    is_archival_status INTEGER NOT NULL DEFAULT 0,
                    is_completion_status INTEGER NOT NULL DEFAULT 0,
                    UNIQUE (status_name, status_type)
                );
                INSERT INTO StatusSettings (status_name, status_type) VALUES ('Legacy', 'Client');",
            )
            .unwrap();
        }

        let db = ctx.initialized();
        let columns = db.with_connection(|conn| table_columns(conn, "StatusSettings")).unwrap();
        assert!(columns.iter().any(|c| c == "icon_name"));
        assert!(columns.iter().any(|c| c == "sort_order"));

        let legacy = db.session().statuses().get_by_name("Legacy", "Client").unwrap().unwrap();
        assert_eq!(legacy.sort_order, 0);
        assert_eq!(legacy.icon_name, None);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_legacy_template_categories_are_rebuilt(ctx: &mut SchemaTestContext) {
        {
            let conn = Connection::open(&ctx.db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE Templates (
                    template_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    template_name TEXT NOT NULL,
                    template_type TEXT NOT NULL,
                    language_code TEXT NOT NULL DEFAULT 'fr',
                    category TEXT
                );
                INSERT INTO Templates (template_name, template_type, category) VALUES ('Quote', 'document_excel', 'Sales');
                INSERT INTO Templates (template_name, template_type, category) VALUES ('Letter', 'document_word', NULL);",
            )
            .unwrap();
        }

        let db = ctx.initialized();
        let session = db.session();

        let columns = db.with_connection(|conn| table_columns(conn, "Templates")).unwrap();
        assert!(columns.iter().any(|c| c == "category_id"));
        assert!(!columns.iter().any(|c| c == "category"));

        let sales = session.template_categories().get_by_name("Sales").unwrap().unwrap();
        let general = session.template_categories().get_by_name(DEFAULT_TEMPLATE_CATEGORY).unwrap().unwrap();

        let templates = session.templates().list(&TemplateFilter::default()).unwrap();
        assert_eq!(templates.len(), 2);
        let quote = templates.iter().find(|t| t.template_name == "Quote").unwrap();
        let letter = templates.iter().find(|t| t.template_name == "Letter").unwrap();
        assert_eq!(quote.category_id, Some(sales.category_id));
        assert_eq!(letter.category_id, Some(general.category_id));
        assert!(!quote.created_at.is_empty());

        let leftover: i64 = db
            .session()
            .run(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'Templates_legacy'", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(leftover, 0);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_failed_template_rebuild_keeps_legacy_table(ctx: &mut SchemaTestContext) {
        {
            let conn = Connection::open(&ctx.db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE Templates (
                    template_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    template_name TEXT,
                    template_type TEXT NOT NULL,
                    language_code TEXT NOT NULL DEFAULT 'fr',
                    category TEXT
                );
                INSERT INTO Templates (template_name, template_type, category) VALUES ('Quote', 'document_excel', 'Sales');
                INSERT INTO Templates (template_name, template_type, category) VALUES (NULL, 'document_word', 'Letters');",
            )
            .unwrap();
        }

        let db = Db::open(&ctx.db_path).unwrap();
        assert!(initialize_database(&db, &ctx.config).is_err());

        let columns = db.with_connection(|conn| table_columns(conn, "Templates")).unwrap();
        assert!(columns.iter().any(|c| c == "category"));
        assert!(!columns.iter().any(|c| c == "category_id"));
        assert_eq!(ctx.count(&db, "Templates"), 2);

        let leftover: i64 = db
            .session()
            .run(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'Templates_legacy'", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(leftover, 0);
        assert!(db.session().template_categories().get_by_name("Sales").unwrap().is_none());
        assert_eq!(db.with_connection(|conn| get_db_version(conn)).unwrap(), 0);
    }

    #[test_context(SchemaTestContext)]
    #[test]
    fn test_product_names_are_unique_among_live_rows_after_upgrade(ctx: &mut SchemaTestContext) {
        {
            let conn = Connection::open(&ctx.db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE Products (
                    product_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    product_name TEXT NOT NULL,
                    language_code TEXT NOT NULL DEFAULT 'fr',
                    base_unit_price REAL NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    UNIQUE (product_name, language_code)
                );
                INSERT INTO Products (product_name, base_unit_price) VALUES ('Super Widget', 199.99);
                INSERT INTO Products (product_name, base_unit_price) VALUES ('Gadget', 20);",
            )
            .unwrap();
        }

        let db = ctx.initialized();
        let inline_unique: i64 = db
            .session()
            .run(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'sqlite_autoindex_Products%'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(inline_unique, 0);

        let products = db.session().products();
        let widget = products.get_by_name("Super Widget", "fr").unwrap().unwrap();
        assert_eq!(widget.product_id, 1);
        assert_eq!(widget.base_unit_price, 199.99);
        assert!(!widget.created_at.is_empty());

        products.delete(widget.product_id).unwrap();
        let again = products
            .get_or_add(&NewProduct {
                product_name: "Super Widget".to_string(),
                base_unit_price: 210.0,
                ..Default::default()
            })
            .unwrap();
        assert!(again.created);
        assert_ne!(again.id, widget.product_id);
        assert_eq!(ctx.count(&db, "Products"), 3);
    }

    #[test]
    fn test_memory_database_initializes() {
        let db = Db::in_memory().unwrap();
        initialize_database(&db, &AppConfig::with_database(":memory:")).unwrap();
        assert!(!db.session().statuses().list(None).unwrap().is_empty());
    }
}
