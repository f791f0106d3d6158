#[cfg(test)]
mod tests {
    use backoffice::db::clients::{ClientFilter, NewClient};
    use backoffice::db::companies::NewCompany;
    use backoffice::db::contacts::NewContact;
    use backoffice::db::db::Db;
    use backoffice::db::error::{DbError, ErrorKind};
    use backoffice::db::logistics::NewTransporter;
    use backoffice::db::onboarding::{onboard_client, ClientOnboarding};
    use backoffice::db::partners::NewPartner;
    use backoffice::db::products::NewProduct;
    use backoffice::db::rows::{Page, SYSTEM_USER};
    use backoffice::db::schema::initialize_database;
    use backoffice::db::users::{NewUser, Role};
    use backoffice::libs::config::AppConfig;
    use serde_json::json;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct PartiesTestContext {
        _temp_dir: TempDir,
        db: Db,
    }

    impl TestContext for PartiesTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let db = Db::open(&db_path).unwrap();
            initialize_database(&db, &AppConfig::with_database(db_path.display().to_string())).unwrap();
            PartiesTestContext { _temp_dir: temp_dir, db }
        }
    }

    fn count(db: &Db, table: &str) -> i64 {
        db.session()
            .run(|conn| Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?))
            .unwrap()
    }

    fn client(db: &Db, name: &str) -> String {
        db.session()
            .clients()
            .add(&NewClient {
                client_name: name.to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_onboarding_creates_client_with_new_product(ctx: &mut PartiesTestContext) {
        let onboarded = onboard_client(
            &ctx.db,
            &ClientOnboarding {
                country_name: "Testland".to_string(),
                city_name: "Testville".to_string(),
                client_name: "Test Client Inc.".to_string(),
                product_product_name: Some("Super Widget".to_string()),
                product_base_unit_price: Some("199.99".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(count(&ctx.db, "Countries"), 1);
        assert_eq!(count(&ctx.db, "Cities"), 1);
        assert_eq!(count(&ctx.db, "Clients"), 1);
        assert_eq!(count(&ctx.db, "Products"), 1);
        assert_eq!(count(&ctx.db, "ClientProjectProducts"), 1);

        let session = ctx.db.session();
        let city = session.cities().get(onboarded.city_id).unwrap().unwrap();
        assert_eq!(city.country_id, onboarded.country_id);

        let stored = session.clients().get(&onboarded.client_id, false).unwrap().unwrap();
        assert_eq!(stored.country_id, Some(onboarded.country_id));
        assert_eq!(stored.city_id, Some(onboarded.city_id));

        let product = session.products().get(onboarded.product_id.unwrap(), false).unwrap().unwrap();
        assert_eq!(product.base_unit_price, 199.99);
        assert!(product.is_active);

        let link = session.client_products().get(onboarded.client_product_id.unwrap()).unwrap().unwrap();
        assert_eq!(link.quantity, 1.0);
        assert_eq!(link.total_price_calculated, 199.99);
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_onboarding_reuses_geography_and_rolls_back_on_failure(ctx: &mut PartiesTestContext) {
        let form = ClientOnboarding {
            country_name: "Testland".to_string(),
            city_name: "Testville".to_string(),
            client_name: "First".to_string(),
            default_base_folder_path: Some("/clients/first".to_string()),
            ..Default::default()
        };
        let first = onboard_client(&ctx.db, &form).unwrap();

        // Same folder path: the client insert fails after the city lookup.
        let duplicate = ClientOnboarding {
            country_name: "Otherland".to_string(),
            client_name: "Second".to_string(),
            ..form.clone()
        };
        let err = onboard_client(&ctx.db, &duplicate).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.existing_id(), Some(first.client_id.as_str()));

        assert_eq!(count(&ctx.db, "Countries"), 1);
        assert_eq!(count(&ctx.db, "Cities"), 1);
        assert_eq!(count(&ctx.db, "Clients"), 1);

        let bad_price = ClientOnboarding {
            product_product_name: Some("Gadget".to_string()),
            product_base_unit_price: Some("cheap".to_string()),
            default_base_folder_path: None,
            ..form
        };
        assert!(matches!(onboard_client(&ctx.db, &bad_price), Err(DbError::Validation { .. })));
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_onboarding_after_product_soft_delete_creates_a_new_product(ctx: &mut PartiesTestContext) {
        let form = ClientOnboarding {
            country_name: "Testland".to_string(),
            city_name: "Testville".to_string(),
            client_name: "First".to_string(),
            product_product_name: Some("Super Widget".to_string()),
            product_base_unit_price: Some("199.99".to_string()),
            ..Default::default()
        };
        let first = onboard_client(&ctx.db, &form).unwrap();
        let retired = first.product_id.unwrap();
        ctx.db.session().products().delete(retired).unwrap();

        let second = onboard_client(
            &ctx.db,
            &ClientOnboarding {
                client_name: "Second".to_string(),
                ..form
            },
        )
        .unwrap();

        let replacement = second.product_id.unwrap();
        assert_ne!(replacement, retired);
        let products = ctx.db.session().products();
        assert_eq!(products.get_by_name("Super Widget", "fr").unwrap().unwrap().product_id, replacement);
        assert!(products.get(retired, true).unwrap().unwrap().is_deleted);
        assert_eq!(count(&ctx.db, "Products"), 2);

        // Live names stay unique and report the row holding them.
        let clash = products.add(&NewProduct {
            product_name: "Super Widget".to_string(),
            ..Default::default()
        });
        assert_eq!(clash.unwrap_err().existing_id(), Some(replacement.to_string().as_str()));
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_default_company_switch(ctx: &mut PartiesTestContext) {
        let companies = ctx.db.session().companies();
        let a = companies
            .add(&NewCompany {
                company_name: "A".to_string(),
                ..Default::default()
            })
            .unwrap();
        let b = companies
            .add(&NewCompany {
                company_name: "B".to_string(),
                ..Default::default()
            })
            .unwrap();

        companies.set_default(&b).unwrap();
        companies.set_default(&a).unwrap();

        assert!(companies.get(&a).unwrap().unwrap().is_default);
        assert!(!companies.get(&b).unwrap().unwrap().is_default);
        let defaults = companies.list().unwrap().into_iter().filter(|c| c.is_default).count();
        assert_eq!(defaults, 1);
        assert_eq!(companies.get_default().unwrap().unwrap().company_id, a);
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_client_soft_delete(ctx: &mut PartiesTestContext) {
        let clients = ctx.db.session().clients();
        let id = client(&ctx.db, "Gone Ltd");
        client(&ctx.db, "Stays Ltd");

        clients.delete(&id).unwrap();

        assert!(clients.get(&id, false).unwrap().is_none());
        let deleted = clients.get(&id, true).unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());

        let live = clients.list(&ClientFilter::default(), Page::default()).unwrap();
        assert!(live.iter().all(|c| c.client_id != id));
        let all = clients
            .list(
                &ClientFilter {
                    include_deleted: true,
                    ..Default::default()
                },
                Page::default(),
            )
            .unwrap();
        assert!(all.iter().any(|c| c.client_id == id));

        let changes = json!({"notes": "late edit"}).as_object().cloned().unwrap();
        assert!(matches!(clients.update(&id, &changes), Err(DbError::NotFound { .. })));
        assert_eq!(clients.get(&id, true).unwrap().unwrap().notes, None);
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_active_clients_skip_archived_statuses(ctx: &mut PartiesTestContext) {
        let session = ctx.db.session();
        let statuses = session.statuses().list(Some("Client")).unwrap();
        let archived = statuses.iter().find(|s| s.is_archival_status).unwrap().status_id;
        let open = statuses.iter().find(|s| !s.is_archival_status).unwrap().status_id;

        let add = |name: &str, status_id: Option<i64>| {
            session
                .clients()
                .add(&NewClient {
                    client_name: name.to_string(),
                    status_id,
                    ..Default::default()
                })
                .unwrap()
        };
        let active = add("Active Ltd", Some(open));
        add("Archived Ltd", Some(archived));
        let unset = add("Unset Ltd", None);
        let deleted = add("Deleted Ltd", Some(open));
        session.clients().delete(&deleted).unwrap();

        let names = |include_without_status: bool| -> Vec<String> {
            session
                .clients()
                .list_active(include_without_status)
                .unwrap()
                .into_iter()
                .map(|c| c.client_id)
                .collect()
        };
        assert_eq!(names(false), vec![active.clone()]);
        assert_eq!(names(true), vec![active, unset]);
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_client_update_whitelists_columns(ctx: &mut PartiesTestContext) {
        let clients = ctx.db.session().clients();
        let id = client(&ctx.db, "Acme");

        let changes = json!({"client_name": "Acme Corp", "is_deleted": 1}).as_object().cloned().unwrap();
        clients.update(&id, &changes).unwrap();
        let stored = clients.get(&id, false).unwrap().unwrap();
        assert_eq!(stored.client_name, "Acme Corp");
        assert!(!stored.is_deleted);

        let only_unknown = json!({"hacker": 1}).as_object().cloned().unwrap();
        assert!(matches!(clients.update(&id, &only_unknown), Err(DbError::Validation { .. })));

        let missing = json!({"client_name": "Nobody"}).as_object().cloned().unwrap();
        assert!(matches!(clients.update("missing", &missing), Err(DbError::NotFound { .. })));
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_system_user_is_stored_as_null(ctx: &mut PartiesTestContext) {
        let clients = ctx.db.session().clients();
        let id = clients
            .add(&NewClient {
                client_name: "Seeded".to_string(),
                created_by_user_id: Some(SYSTEM_USER.to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(clients.get(&id, false).unwrap().unwrap().created_by_user_id, None);
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_user_password_verification(ctx: &mut PartiesTestContext) {
        let users = ctx.db.session().users();
        let id = users
            .add(&NewUser {
                username: "jdoe".to_string(),
                email: "jdoe@example.com".to_string(),
                password: "s3cret".to_string(),
                full_name: None,
                role: Role::Member,
            })
            .unwrap();

        assert_eq!(users.verify_user_password("jdoe", "s3cret").unwrap().unwrap().user_id, id);
        assert!(users.verify_user_password("jdoe", "wrong").unwrap().is_none());
        assert!(users.verify_user_password("nobody", "s3cret").unwrap().is_none());

        let duplicate = users.add(&NewUser {
            username: "jdoe".to_string(),
            email: "other@example.com".to_string(),
            password: "x".to_string(),
            full_name: None,
            role: Role::Member,
        });
        let err = duplicate.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.existing_id(), Some(id.as_str()));
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_user_soft_delete(ctx: &mut PartiesTestContext) {
        let users = ctx.db.session().users();
        let id = users
            .add(&NewUser {
                username: "leaver".to_string(),
                email: "leaver@example.com".to_string(),
                password: "bye".to_string(),
                full_name: None,
                role: Role::Member,
            })
            .unwrap();

        users.delete(&id).unwrap();

        assert!(users.get(&id, false).unwrap().is_none());
        let deleted = users.get(&id, true).unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());
        assert!(users.list(false).unwrap().iter().all(|u| u.user_id != id));
        assert!(users.list(true).unwrap().iter().any(|u| u.user_id == id));
        assert!(users.verify_user_password("leaver", "bye").unwrap().is_none());

        let rename = json!({"full_name": "Ghost"}).as_object().cloned().unwrap();
        assert!(matches!(users.update(&id, &rename), Err(DbError::NotFound { .. })));
        assert!(matches!(users.update_last_login(&id), Err(DbError::NotFound { .. })));
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_client_contacts_keep_one_primary(ctx: &mut PartiesTestContext) {
        let session = ctx.db.session();
        let client_id = client(&ctx.db, "Acme");
        let alice = session
            .contacts()
            .add(&NewContact {
                name: "Alice".to_string(),
                email: Some("alice@example.com".to_string()),
                ..Default::default()
            })
            .unwrap();
        let bob = session
            .contacts()
            .add(&NewContact {
                name: "Bob".to_string(),
                ..Default::default()
            })
            .unwrap();

        let links = session.client_contacts();
        let alice_link = links.link(&client_id, alice, true, true).unwrap();
        links.link(&client_id, bob, true, false).unwrap();

        let contacts = links.contacts_for_client(&client_id).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts.iter().filter(|c| c.is_primary_for_client).count(), 1);
        assert_eq!(contacts[0].contact.name, "Bob");

        let err = links.link(&client_id, alice, false, false).unwrap_err();
        assert_eq!(err.existing_id(), Some(alice_link.to_string().as_str()));

        assert_eq!(links.clients_for_contact(alice).unwrap().len(), 1);
        links.unlink(&client_id, alice).unwrap();
        assert!(links.clients_for_contact(alice).unwrap().is_empty());

        assert_eq!(session.contacts().get_by_email("alice@example.com").unwrap().unwrap().contact_id, alice);
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_contact_list_membership_is_idempotent(ctx: &mut PartiesTestContext) {
        let session = ctx.db.session();
        let contact = session
            .contacts()
            .add(&NewContact {
                name: "Carol".to_string(),
                ..Default::default()
            })
            .unwrap();
        let lists = session.contact_lists();
        let list_id = lists.add("Newsletter", None).unwrap();

        let first = lists.add_member(list_id, contact).unwrap();
        let second = lists.add_member(list_id, contact).unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(lists.members(list_id).unwrap().len(), 1);

        session.contacts().delete(contact).unwrap();
        assert!(lists.members(list_id).unwrap().is_empty());
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_partner_categories_and_contacts(ctx: &mut PartiesTestContext) {
        let session = ctx.db.session();
        let partner = session
            .partners()
            .add(&NewPartner {
                partner_name: "Supplier Co".to_string(),
                ..Default::default()
            })
            .unwrap();
        let categories = session.partner_categories();
        let suppliers = categories.add("Suppliers", None).unwrap();
        assert_eq!(categories.add("Suppliers", Some("again")).unwrap(), suppliers);

        let partners = session.partners();
        partners.link_category(&partner, suppliers).unwrap();
        partners.link_category(&partner, suppliers).unwrap();
        assert_eq!(partners.categories_for_partner(&partner).unwrap().len(), 1);
        assert_eq!(partners.partners_in_category(suppliers).unwrap()[0].partner_id, partner);

        let contact = session
            .contacts()
            .add(&NewContact {
                name: "Dan".to_string(),
                ..Default::default()
            })
            .unwrap();
        session.partner_contacts().add(&partner, contact, Some("Sales")).unwrap();
        assert_eq!(session.partner_contacts().add(&partner, contact, None).unwrap_err().kind(), ErrorKind::Conflict);

        session.partner_interactions().add(&partner, "2024-01-10", "call", None).unwrap();
        session.partner_interactions().add(&partner, "2024-02-10", "meeting", None).unwrap();
        let history = session.partner_interactions().list_for_partner(&partner).unwrap();
        assert_eq!(history[0].interaction_type, "meeting");

        partners.delete(&partner).unwrap();
        assert!(partners.partners_in_category(suppliers).unwrap().is_empty());
        assert!(session.partner_interactions().list_for_partner(&partner).unwrap().is_empty());
    }

    #[test_context(PartiesTestContext)]
    #[test]
    fn test_transporter_crud(ctx: &mut PartiesTestContext) {
        let transporters = ctx.db.session().transporters();
        let id = transporters
            .add(&NewTransporter {
                name: "FastTrucks".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(id.len(), 32);

        let changes = json!({"service_area": "EU"}).as_object().cloned().unwrap();
        transporters.update(&id, &changes).unwrap();
        assert_eq!(transporters.get(&id).unwrap().unwrap().service_area.as_deref(), Some("EU"));

        transporters.delete(&id).unwrap();
        assert!(matches!(transporters.delete(&id), Err(DbError::NotFound { .. })));
    }
}
