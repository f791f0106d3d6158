#[cfg(test)]
mod tests {
    use backoffice::db::client_products::{NewClientProduct, ProjectScope};
    use backoffice::db::clients::NewClient;
    use backoffice::db::db::Db;
    use backoffice::db::error::{DbError, ErrorKind};
    use backoffice::db::invoices::{InvoiceFilter, InvoiceSort, NewInvoice, PaymentStatus};
    use backoffice::db::products::NewProduct;
    use backoffice::db::projects::{NewProject, NewTask, ProjectFilter};
    use backoffice::db::rows::Page;
    use backoffice::db::schema::initialize_database;
    use backoffice::libs::config::AppConfig;
    use serde_json::json;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct CommercialTestContext {
        _temp_dir: TempDir,
        db: Db,
        client_id: String,
    }

    impl TestContext for CommercialTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let db = Db::open(&db_path).unwrap();
            initialize_database(&db, &AppConfig::with_database(db_path.display().to_string())).unwrap();
            let client_id = db
                .session()
                .clients()
                .add(&NewClient {
                    client_name: "Test Client Inc.".to_string(),
                    ..Default::default()
                })
                .unwrap();
            CommercialTestContext {
                _temp_dir: temp_dir,
                db,
                client_id,
            }
        }
    }

    impl CommercialTestContext {
        fn product(&self, name: &str, price: f64) -> i64 {
            self.db
                .session()
                .products()
                .add(&NewProduct {
                    product_name: name.to_string(),
                    base_unit_price: price,
                    ..Default::default()
                })
                .unwrap()
        }

        fn invoice(&self, number: &str, issue_date: &str) -> String {
            self.db
                .session()
                .invoices()
                .add(&NewInvoice {
                    client_id: self.client_id.clone(),
                    invoice_number: number.to_string(),
                    issue_date: issue_date.to_string(),
                    due_date: "2024-12-31".to_string(),
                    total_amount: 100.0,
                    ..Default::default()
                })
                .unwrap()
        }
    }

    fn changes(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_equivalency_is_symmetric_and_hides_deleted_products(ctx: &mut CommercialTestContext) {
        let x = ctx.product("Widget FR", 10.0);
        let y = ctx.product("Widget EN", 10.0);
        let equivalencies = ctx.db.session().product_equivalencies();

        let first = equivalencies.add(y, x).unwrap();
        assert!(first.created);
        let again = equivalencies.add(x, y).unwrap();
        assert!(!again.created);
        assert_eq!(again.id, first.id);

        let pairs = equivalencies.list_all(false).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].product_id_a < pairs[0].product_id_b);

        assert_eq!(equivalencies.get_equivalent_products(x, false).unwrap()[0].product_id, y);
        assert_eq!(equivalencies.get_equivalent_products(y, false).unwrap()[0].product_id, x);

        ctx.db.session().products().delete(y).unwrap();
        assert!(equivalencies.get_equivalent_products(x, false).unwrap().is_empty());
        assert_eq!(equivalencies.get_equivalent_products(x, true).unwrap().len(), 1);
        assert!(equivalencies.list_all(false).unwrap().is_empty());

        assert_eq!(equivalencies.add(x, x).unwrap_err().kind(), ErrorKind::Conflict);
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_equivalents_span_both_sides_of_the_pair(ctx: &mut CommercialTestContext) {
        let p1 = ctx.product("P1", 1.0);
        let p2 = ctx.product("P2", 2.0);
        let p3 = ctx.product("P3", 3.0);
        let equivalencies = ctx.db.session().product_equivalencies();
        equivalencies.add(p3, p1).unwrap();
        equivalencies.add(p1, p2).unwrap();

        let ids = |include_deleted: bool| -> Vec<i64> {
            let mut ids: Vec<i64> = equivalencies
                .get_equivalent_products(p1, include_deleted)
                .unwrap()
                .into_iter()
                .map(|p| p.product_id)
                .collect();
            ids.sort();
            ids
        };
        assert_eq!(ids(false), vec![p2, p3]);

        ctx.db.session().products().delete(p3).unwrap();
        assert_eq!(ids(false), vec![p2]);
        assert_eq!(ids(true), vec![p2, p3]);
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_product_get_or_add_reuses_name_and_language(ctx: &mut CommercialTestContext) {
        let products = ctx.db.session().products();
        let widget = NewProduct {
            product_name: "Widget".to_string(),
            base_unit_price: 5.0,
            ..Default::default()
        };
        let first = products.get_or_add(&widget).unwrap();
        let second = products.get_or_add(&widget).unwrap();
        assert!(first.created);
        assert_eq!(second.id, first.id);
        assert!(!second.created);

        let english = products
            .get_or_add(&NewProduct {
                language_code: "en".to_string(),
                ..widget
            })
            .unwrap();
        assert_ne!(english.id, first.id);

        let negative = products.add(&NewProduct {
            product_name: "Broken".to_string(),
            base_unit_price: -1.0,
            ..Default::default()
        });
        assert!(matches!(negative, Err(DbError::Validation { .. })));
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_dimensions_merge_and_follow_product_deletion(ctx: &mut CommercialTestContext) {
        let product = ctx.product("Cabinet", 80.0);
        let session = ctx.db.session();
        let dimensions = session.product_dimensions();

        dimensions.add_or_update(product, &changes(json!({"dim_a": "10", "dim_b": "20"}))).unwrap();
        dimensions.add_or_update(product, &changes(json!({"dim_b": 30}))).unwrap();
        let stored = dimensions.get(product).unwrap().unwrap();
        assert_eq!(stored.dim_a.as_deref(), Some("10"));
        assert_eq!(stored.dim_b.as_deref(), Some("30"));

        session.products().delete(product).unwrap();
        let refused = dimensions.add_or_update(product, &changes(json!({"dim_c": "5"})));
        assert!(matches!(refused, Err(DbError::NotFound { .. })));
        assert_eq!(dimensions.get(product).unwrap().unwrap().dim_c, None);

        let renamed = session.products().update(product, &changes(json!({"product_name": "Cabinet XL"})));
        assert!(matches!(renamed, Err(DbError::NotFound { .. })));
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_link_total_follows_quantity_and_override(ctx: &mut CommercialTestContext) {
        let product = ctx.product("Gadget", 20.0);
        let links = ctx.db.session().client_products();
        let link_id = links
            .add(&NewClientProduct {
                quantity: 3.0,
                ..NewClientProduct::new(ctx.client_id.clone(), product)
            })
            .unwrap();
        assert_eq!(links.get(link_id).unwrap().unwrap().total_price_calculated, 60.0);

        links.update(link_id, &changes(json!({"quantity": 2}))).unwrap();
        assert_eq!(links.get(link_id).unwrap().unwrap().total_price_calculated, 40.0);

        links.update(link_id, &changes(json!({"unit_price_override": 12.5}))).unwrap();
        let link = links.get(link_id).unwrap().unwrap();
        assert_eq!(link.effective_unit_price(), 12.5);
        assert_eq!(link.total_price_calculated, 25.0);

        links.update(link_id, &changes(json!({"serial_number": "SN-1", "total_price_calculated": 1}))).unwrap();
        let link = links.get(link_id).unwrap().unwrap();
        assert_eq!(link.serial_number.as_deref(), Some("SN-1"));
        assert_eq!(link.total_price_calculated, 25.0);

        links.update(link_id, &changes(json!({"unit_price_override": null}))).unwrap();
        assert_eq!(links.get(link_id).unwrap().unwrap().total_price_calculated, 40.0);

        assert!(links.update(link_id, &changes(json!({"quantity": -1}))).is_err());
        assert_eq!(links.list_for_client(&ctx.client_id, ProjectScope::Unassigned).unwrap().len(), 1);
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_invoice_lifecycle(ctx: &mut CommercialTestContext) {
        let id = ctx.invoice("INV-001", "2024-01-15");
        let invoices = ctx.db.session().invoices();

        let created = invoices.get(&id).unwrap().unwrap();
        assert_eq!(created.payment_status, PaymentStatus::Unpaid);
        assert_eq!(created.currency, "EUR");

        thread::sleep(Duration::from_millis(5));
        invoices
            .update(&id, &changes(json!({"payment_status": "paid", "payment_date": "2024-02-01"})))
            .unwrap();

        let paid = invoices.get(&id).unwrap().unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_date.as_deref(), Some("2024-02-01"));
        assert_eq!(paid.created_at, created.created_at);
        assert!(paid.updated_at > created.updated_at);

        let bad = invoices.update(&id, &changes(json!({"payment_status": "settled"})));
        assert!(matches!(bad, Err(DbError::Validation { .. })));

        let duplicate = invoices.add(&NewInvoice {
            client_id: ctx.client_id.clone(),
            invoice_number: "INV-001".to_string(),
            issue_date: "2024-03-01".to_string(),
            due_date: "2024-03-31".to_string(),
            ..Default::default()
        });
        assert_eq!(duplicate.unwrap_err().kind(), ErrorKind::Conflict);

        let orphan = invoices.add(&NewInvoice {
            client_id: "missing".to_string(),
            invoice_number: "INV-404".to_string(),
            issue_date: "2024-03-01".to_string(),
            due_date: "2024-03-31".to_string(),
            ..Default::default()
        });
        assert!(matches!(orphan, Err(DbError::NotFound { .. })));
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_invoice_project_must_belong_to_its_client(ctx: &mut CommercialTestContext) {
        let session = ctx.db.session();
        let own_project = session
            .projects()
            .add(&NewProject {
                client_id: ctx.client_id.clone(),
                project_name: "Own".to_string(),
                ..Default::default()
            })
            .unwrap();
        let other_client = session
            .clients()
            .add(&NewClient {
                client_name: "Other Client".to_string(),
                ..Default::default()
            })
            .unwrap();
        let foreign_project = session
            .projects()
            .add(&NewProject {
                client_id: other_client,
                project_name: "Foreign".to_string(),
                ..Default::default()
            })
            .unwrap();

        let invoice = |number: &str, project_id: &str| NewInvoice {
            client_id: ctx.client_id.clone(),
            project_id: Some(project_id.to_string()),
            invoice_number: number.to_string(),
            issue_date: "2024-05-01".to_string(),
            due_date: "2024-05-31".to_string(),
            ..Default::default()
        };
        let id = session.invoices().add(&invoice("INV-100", &own_project)).unwrap();
        assert!(matches!(session.invoices().add(&invoice("INV-101", &foreign_project)), Err(DbError::Validation { .. })));
        assert!(matches!(session.invoices().add(&invoice("INV-102", "missing")), Err(DbError::NotFound { .. })));

        let moved = session.invoices().update(&id, &changes(json!({"project_id": foreign_project})));
        assert!(matches!(moved, Err(DbError::Validation { .. })));
        assert_eq!(session.invoices().get(&id).unwrap().unwrap().project_id, Some(own_project));
        assert!(session.invoices().get_by_number("INV-101").unwrap().is_none());
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_invoice_listing_is_sorted_and_paged(ctx: &mut CommercialTestContext) {
        ctx.invoice("INV-003", "2024-03-01");
        ctx.invoice("INV-001", "2024-01-01");
        ctx.invoice("INV-002", "2024-02-01");
        ctx.invoice("INV-002B", "2024-02-01");
        let invoices = ctx.db.session().invoices();

        let numbers = |page: Page| -> Vec<String> {
            invoices
                .list_all_invoices(&InvoiceFilter::default(), InvoiceSort::parse("issue_date_asc").unwrap(), page)
                .unwrap()
                .into_iter()
                .map(|i| i.invoice_number)
                .collect()
        };
        assert_eq!(numbers(Page::default()), vec!["INV-001", "INV-002", "INV-002B", "INV-003"]);
        assert_eq!(numbers(Page::new(Some(2), Some(1))), vec!["INV-002", "INV-002B"]);

        let filtered = invoices
            .list_all_invoices(
                &InvoiceFilter {
                    issue_date_from: Some("2024-02-01".to_string()),
                    issue_date_to: Some("2024-02-28".to_string()),
                    ..Default::default()
                },
                InvoiceSort::default(),
                Page::default(),
            )
            .unwrap();
        assert_eq!(filtered.len(), 2);

        assert!(matches!(InvoiceSort::parse("client_id_asc"), Err(DbError::Validation { .. })));
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_project_soft_delete_and_task_completion(ctx: &mut CommercialTestContext) {
        let session = ctx.db.session();
        let project_id = session
            .projects()
            .add(&NewProject {
                client_id: ctx.client_id.clone(),
                project_name: "Website".to_string(),
                ..Default::default()
            })
            .unwrap();
        let task_id = session
            .tasks()
            .add(&NewTask {
                project_id: project_id.clone(),
                task_name: "Mockups".to_string(),
                ..Default::default()
            })
            .unwrap();

        session.tasks().complete(task_id).unwrap();
        assert!(session.tasks().get(task_id).unwrap().unwrap().completed_at.is_some());

        session.projects().delete(&project_id).unwrap();
        assert!(session.projects().get(&project_id, false).unwrap().is_none());
        assert!(session.projects().get(&project_id, true).unwrap().unwrap().is_deleted);
        let live = session.projects().list(&ProjectFilter::default(), Page::default()).unwrap();
        assert!(live.is_empty());

        let late_task = session.tasks().add(&NewTask {
            project_id: project_id.clone(),
            task_name: "Too late".to_string(),
            ..Default::default()
        });
        assert!(matches!(late_task, Err(DbError::NotFound { .. })));

        let renamed = session.projects().update(&project_id, &changes(json!({"project_name": "Website v2"})));
        assert!(matches!(renamed, Err(DbError::NotFound { .. })));

        let bad_progress = session.projects().add(&NewProject {
            client_id: ctx.client_id.clone(),
            project_name: "Overachiever".to_string(),
            progress_percentage: 150,
            ..Default::default()
        });
        assert!(matches!(bad_progress, Err(DbError::Validation { .. })));
    }

    #[test_context(CommercialTestContext)]
    #[test]
    fn test_active_projects_skip_archived_statuses(ctx: &mut CommercialTestContext) {
        let session = ctx.db.session();
        let statuses = session.statuses().list(Some("Project")).unwrap();
        let archived = statuses.iter().find(|s| s.is_archival_status).unwrap().status_id;
        let running = statuses.iter().find(|s| !s.is_archival_status).unwrap().status_id;

        let add = |name: &str, status_id: Option<i64>| {
            session
                .projects()
                .add(&NewProject {
                    client_id: ctx.client_id.clone(),
                    project_name: name.to_string(),
                    status_id,
                    ..Default::default()
                })
                .unwrap()
        };
        let alpha = add("Alpha", Some(running));
        add("Beta", Some(archived));
        let gamma = add("Gamma", None);

        let active: Vec<String> = session
            .projects()
            .list_active(Some(&ctx.client_id))
            .unwrap()
            .into_iter()
            .map(|p| p.project_id)
            .collect();
        assert_eq!(active, vec![alpha, gamma]);
        assert!(session.projects().list_active(Some("someone-else")).unwrap().is_empty());
    }
}
