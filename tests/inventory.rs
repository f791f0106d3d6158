#[cfg(test)]
mod tests {
    use backoffice::db::db::Db;
    use backoffice::db::error::{DbError, ErrorKind};
    use backoffice::db::inventory::NewItemLocation;
    use backoffice::db::products::NewProduct;
    use backoffice::db::schema::initialize_database;
    use backoffice::libs::config::AppConfig;
    use serde_json::json;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct InventoryTestContext {
        _temp_dir: TempDir,
        db: Db,
    }

    impl TestContext for InventoryTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let db = Db::open(&db_path).unwrap();
            initialize_database(&db, &AppConfig::with_database(db_path.display().to_string())).unwrap();
            InventoryTestContext { _temp_dir: temp_dir, db }
        }
    }

    impl InventoryTestContext {
        fn location(&self, name: &str, parent: Option<&str>) -> String {
            self.db
                .session()
                .locations()
                .add(&NewItemLocation {
                    location_name: name.to_string(),
                    parent_location_id: parent.map(str::to_string),
                    ..Default::default()
                })
                .unwrap()
        }
    }

    #[test_context(InventoryTestContext)]
    #[test]
    fn test_location_tree_paths_and_deletion(ctx: &mut InventoryTestContext) {
        let area = ctx.location("Area", None);
        let shelf = ctx.location("Shelf A1", Some(&area));
        let locations = ctx.db.session().locations();

        assert_eq!(locations.get_full_location_path_str(&shelf).unwrap().as_deref(), Some("Area > Shelf A1"));
        assert_eq!(locations.get_full_location_path_str(&area).unwrap().as_deref(), Some("Area"));
        assert_eq!(locations.get_full_location_path_str("missing").unwrap(), None);

        assert_eq!(locations.list(Some(None), None).unwrap().len(), 1);
        assert_eq!(locations.children(&area).unwrap()[0].location_id, shelf);

        assert_eq!(locations.delete(&area).unwrap_err().kind(), ErrorKind::Conflict);
        assert!(locations.get(&area).unwrap().is_some());

        locations.delete(&shelf).unwrap();
        locations.delete(&area).unwrap();
        assert!(locations.get(&area).unwrap().is_none());
    }

    #[test_context(InventoryTestContext)]
    #[test]
    fn test_reparenting_refuses_cycles(ctx: &mut InventoryTestContext) {
        let area = ctx.location("Area", None);
        let row = ctx.location("Row 3", Some(&area));
        let shelf = ctx.location("Shelf A1", Some(&row));
        let locations = ctx.db.session().locations();

        let under_grandchild = json!({"parent_location_id": shelf}).as_object().cloned().unwrap();
        assert_eq!(locations.update(&area, &under_grandchild).unwrap_err().kind(), ErrorKind::Conflict);
        let under_itself = json!({"parent_location_id": area}).as_object().cloned().unwrap();
        assert_eq!(locations.update(&area, &under_itself).unwrap_err().kind(), ErrorKind::Conflict);

        let other = ctx.location("Annex", None);
        let move_row = json!({"parent_location_id": other}).as_object().cloned().unwrap();
        locations.update(&row, &move_row).unwrap();
        assert_eq!(locations.get_full_location_path_str(&shelf).unwrap().as_deref(), Some("Annex > Row 3 > Shelf A1"));

        let missing_parent = json!({"parent_location_id": "missing"}).as_object().cloned().unwrap();
        assert!(matches!(locations.update(&row, &missing_parent), Err(DbError::NotFound { .. })));
    }

    #[test_context(InventoryTestContext)]
    #[test]
    fn test_stock_follows_its_location(ctx: &mut InventoryTestContext) {
        let session = ctx.db.session();
        let product = session
            .products()
            .add(&NewProduct {
                product_name: "Widget".to_string(),
                ..Default::default()
            })
            .unwrap();
        let shelf = ctx.location("Shelf B2", None);

        let stock_id = session.storage_locations().add(product, &shelf, 12, None).unwrap();
        assert_eq!(session.storage_locations().add(product, &shelf, 1, None).unwrap_err().kind(), ErrorKind::Conflict);
        assert!(session.storage_locations().add(product, &shelf, -1, None).is_err());

        let restock = json!({"quantity": 30}).as_object().cloned().unwrap();
        session.storage_locations().update(&stock_id, &restock).unwrap();
        assert_eq!(session.storage_locations().list_for_product(product).unwrap()[0].quantity, 30);

        session.locations().delete(&shelf).unwrap();
        assert!(session.storage_locations().get(&stock_id).unwrap().is_none());
    }
}
