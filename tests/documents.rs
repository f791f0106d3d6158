#[cfg(test)]
mod tests {
    use backoffice::db::clients::NewClient;
    use backoffice::db::db::Db;
    use backoffice::db::documents::{NewCoverPage, NewCoverPageTemplate};
    use backoffice::db::emails::{DeliveryStatus, NewScheduledEmail};
    use backoffice::db::error::ErrorKind;
    use backoffice::db::schema::initialize_database;
    use backoffice::db::smtp::NewSmtpConfig;
    use backoffice::db::templates::{NewTemplate, TemplateFilter};
    use backoffice::libs::config::AppConfig;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct DocumentsTestContext {
        _temp_dir: TempDir,
        db: Db,
    }

    impl TestContext for DocumentsTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let db = Db::open(&db_path).unwrap();
            initialize_database(&db, &AppConfig::with_database(db_path.display().to_string())).unwrap();
            DocumentsTestContext { _temp_dir: temp_dir, db }
        }
    }

    impl DocumentsTestContext {
        fn template(&self, name: &str, template_type: &str, language: &str, is_default: bool) -> i64 {
            self.db
                .session()
                .templates()
                .add(&NewTemplate {
                    template_name: name.to_string(),
                    template_type: template_type.to_string(),
                    language_code: language.to_string(),
                    is_default,
                    ..Default::default()
                })
                .unwrap()
        }

        fn smtp(&self, name: &str, is_default: bool) -> i64 {
            self.db
                .session()
                .smtp_configs()
                .add(&NewSmtpConfig {
                    config_name: name.to_string(),
                    smtp_server: "smtp.example.com".to_string(),
                    sender_email_address: "office@example.com".to_string(),
                    is_default,
                    ..Default::default()
                })
                .unwrap()
        }
    }

    #[test_context(DocumentsTestContext)]
    #[test]
    fn test_template_default_is_scoped_by_type_and_language(ctx: &mut DocumentsTestContext) {
        let quote_fr = ctx.template("Devis", "document_excel", "fr", true);
        let quote_en = ctx.template("Quote", "document_excel", "en", true);
        let quote_fr_v2 = ctx.template("Devis v2", "document_excel", "fr", false);
        let templates = ctx.db.session().templates();

        assert_eq!(templates.get_default_for("document_excel", "fr").unwrap().unwrap().template_id, quote_fr);

        templates.set_default(quote_fr_v2).unwrap();
        assert_eq!(templates.get_default_for("document_excel", "fr").unwrap().unwrap().template_id, quote_fr_v2);
        assert!(!templates.get(quote_fr).unwrap().unwrap().is_default_for_type_lang);
        assert_eq!(templates.get_default_for("document_excel", "en").unwrap().unwrap().template_id, quote_en);

        let general = ctx.db.session().template_categories().get_by_name("General").unwrap().unwrap();
        assert_eq!(templates.get(quote_en).unwrap().unwrap().category_id, Some(general.category_id));
        assert_eq!(templates.distinct_languages().unwrap(), vec!["en", "fr"]);

        let french = templates
            .list(&TemplateFilter {
                language_code: Some("fr".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(french.len(), 2);
    }

    #[test_context(DocumentsTestContext)]
    #[test]
    fn test_template_categories_resolve_by_name(ctx: &mut DocumentsTestContext) {
        let categories = ctx.db.session().template_categories();
        let created = categories.add("Contracts", None).unwrap();
        assert!(created.created);
        let again = categories.add("Contracts", Some("ignored")).unwrap();
        assert_eq!(again.id, created.id);
        assert!(!again.created);

        let template_id = ctx
            .db
            .session()
            .templates()
            .add(&NewTemplate {
                template_name: "NDA".to_string(),
                template_type: "document_word".to_string(),
                category_name: Some("Contracts".to_string()),
                ..Default::default()
            })
            .unwrap();
        let stored = ctx.db.session().templates().get(template_id).unwrap().unwrap();
        assert_eq!(stored.category_id, Some(created.id));
        assert_eq!(stored.version, "1.0");
    }

    #[test_context(DocumentsTestContext)]
    #[test]
    fn test_single_default_smtp_config(ctx: &mut DocumentsTestContext) {
        let office = ctx.smtp("Office", true);
        let backup = ctx.smtp("Backup", true);
        let configs = ctx.db.session().smtp_configs();

        assert_eq!(configs.get_default().unwrap().unwrap().smtp_config_id, backup);
        configs.set_default(office).unwrap();
        assert_eq!(configs.get_default().unwrap().unwrap().smtp_config_id, office);
        assert_eq!(configs.list().unwrap().iter().filter(|c| c.is_default).count(), 1);

        assert_eq!(configs.set_default(9999).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(configs.get_default().unwrap().unwrap().smtp_config_id, office);
    }

    #[test_context(DocumentsTestContext)]
    #[test]
    fn test_cover_page_uses_default_template(ctx: &mut DocumentsTestContext) {
        let session = ctx.db.session();
        let seeded_default = session.cover_page_templates().get_default().unwrap().unwrap();

        let page_id = session
            .cover_pages()
            .add(&NewCoverPage {
                title: "Annual report".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            session.cover_pages().get(&page_id).unwrap().unwrap().template_id,
            Some(seeded_default.template_id.clone())
        );

        let custom = session
            .cover_page_templates()
            .add(&NewCoverPageTemplate {
                template_name: "Minimal".to_string(),
                is_default: true,
                ..Default::default()
            })
            .unwrap();
        assert!(!session.cover_page_templates().get(&seeded_default.template_id).unwrap().unwrap().is_default_template);

        let client_id = session
            .clients()
            .add(&NewClient {
                client_name: "Acme".to_string(),
                ..Default::default()
            })
            .unwrap();
        let client_page = session
            .cover_pages()
            .add(&NewCoverPage {
                title: "Proposal".to_string(),
                client_id: Some(client_id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.cover_pages().get(&client_page).unwrap().unwrap().template_id, Some(custom.clone()));
        assert_eq!(session.cover_pages().list_for_client(&client_id).unwrap().len(), 1);

        session.cover_pages().set_logo(&client_page, Some("logo.png"), Some(&[1u8, 2, 3][..])).unwrap();
        assert_eq!(session.cover_pages().get(&client_page).unwrap().unwrap().logo_data, Some(vec![1, 2, 3]));

        session.cover_page_templates().delete(&custom).unwrap();
        let orphan = session.cover_pages().get(&client_page).unwrap().unwrap();
        assert_eq!(orphan.template_id, None);
        assert_eq!(orphan.title, "Proposal");
    }

    #[test_context(DocumentsTestContext)]
    #[test]
    fn test_scheduled_email_delivery(ctx: &mut DocumentsTestContext) {
        let session = ctx.db.session();
        let email = |at: &str| NewScheduledEmail {
            recipient_email: "client@example.com".to_string(),
            subject: "Reminder".to_string(),
            scheduled_send_at: at.to_string(),
            ..Default::default()
        };
        let due = session.scheduled_emails().add(&email("2024-01-01T09:00:00Z")).unwrap();
        session.scheduled_emails().add(&email("2999-01-01T09:00:00Z")).unwrap();
        session.email_reminders().add(due, "follow_up", "2024-01-08T09:00:00Z").unwrap();

        let pending = session.scheduled_emails().list_due("2024-06-01T00:00:00Z").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].scheduled_email_id, due);

        session.scheduled_emails().update_status(due, DeliveryStatus::Sent, None).unwrap();
        let sent = session.scheduled_emails().get(due).unwrap().unwrap();
        assert_eq!(sent.status, DeliveryStatus::Sent);
        assert!(sent.sent_at.is_some());
        assert!(session.scheduled_emails().list_due("2024-06-01T00:00:00Z").unwrap().is_empty());

        session.scheduled_emails().delete(due).unwrap();
        assert!(session.email_reminders().list_for_email(due).unwrap().is_empty());
    }
}
