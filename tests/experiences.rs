#[cfg(test)]
mod tests {
    use backoffice::db::db::Db;
    use backoffice::db::error::DbError;
    use backoffice::db::experiences::{EntityRef, EntityType, ExperienceFilter, ExperienceUpdate, NewExperience};
    use backoffice::db::rows::Page;
    use backoffice::db::schema::initialize_database;
    use backoffice::libs::config::AppConfig;
    use serde_json::json;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct ExperiencesTestContext {
        _temp_dir: TempDir,
        db: Db,
    }

    impl TestContext for ExperiencesTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let db = Db::open(&db_path).unwrap();
            initialize_database(&db, &AppConfig::with_database(db_path.display().to_string())).unwrap();
            ExperiencesTestContext { _temp_dir: temp_dir, db }
        }
    }

    fn trade_show() -> NewExperience {
        NewExperience {
            title: "Trade show".to_string(),
            experience_date: Some("2024-04-10".to_string()),
            tags: vec!["events".to_string(), "sales".to_string()],
            related_entities: vec![EntityRef::new(EntityType::Client, "client-1")],
            media_item_ids: vec!["m2".to_string(), "m1".to_string()],
            ..Default::default()
        }
    }

    fn sorted(mut tags: Vec<String>) -> Vec<String> {
        tags.sort();
        tags
    }

    #[test_context(ExperiencesTestContext)]
    #[test]
    fn test_experience_is_stored_with_its_links(ctx: &mut ExperiencesTestContext) {
        let experiences = ctx.db.session().experiences();
        let id = experiences.add(&trade_show()).unwrap();

        let stored = experiences.get(&id).unwrap().unwrap();
        assert_eq!(sorted(stored.tags), vec!["events", "sales"]);
        assert_eq!(stored.related_entities, vec![EntityRef::new(EntityType::Client, "client-1")]);
        assert_eq!(stored.media_item_ids, vec!["m2", "m1"]);

        let found = experiences.list_for_entity(&EntityRef::new(EntityType::Client, "client-1")).unwrap();
        assert_eq!(found.len(), 1);
        assert!(experiences
            .list_for_entity(&EntityRef::new(EntityType::Project, "client-1"))
            .unwrap()
            .is_empty());
        assert!(matches!(
            experiences.list_for_entity(&EntityRef::new(EntityType::Client, " ")),
            Err(DbError::Validation { .. })
        ));
    }

    #[test_context(ExperiencesTestContext)]
    #[test]
    fn test_tags_are_shared_between_experiences(ctx: &mut ExperiencesTestContext) {
        let session = ctx.db.session();
        session.experiences().add(&trade_show()).unwrap();
        session
            .experiences()
            .add(&NewExperience {
                title: "Workshop".to_string(),
                tags: vec!["events".to_string()],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(session.tags().list().unwrap().len(), 2);
        let events = session
            .experiences()
            .list(
                &ExperienceFilter {
                    tag: Some("events".to_string()),
                    ..Default::default()
                },
                Page::default(),
            )
            .unwrap();
        assert_eq!(events.len(), 2);

        let existing = session.tags().get_or_add("sales").unwrap();
        assert!(!existing.created);
    }

    #[test_context(ExperiencesTestContext)]
    #[test]
    fn test_update_relinks_only_supplied_sets(ctx: &mut ExperiencesTestContext) {
        let experiences = ctx.db.session().experiences();
        let id = experiences.add(&trade_show()).unwrap();

        experiences
            .update(
                &id,
                &ExperienceUpdate {
                    changes: json!({"title": "Spring trade show"}).as_object().cloned().unwrap(),
                    tags: Some(vec!["marketing".to_string()]),
                    related_entities: Some(vec![
                        EntityRef::new(EntityType::Partner, "partner-9"),
                        EntityRef::new(EntityType::from("Warehouse".to_string()), "w-1"),
                    ]),
                    media_item_ids: None,
                },
            )
            .unwrap();

        let stored = experiences.get(&id).unwrap().unwrap();
        assert_eq!(stored.title, "Spring trade show");
        assert_eq!(stored.tags, vec!["marketing"]);
        assert_eq!(stored.related_entities.len(), 2);
        assert_eq!(stored.related_entities[1].entity_type, EntityType::Unknown("Warehouse".to_string()));
        assert_eq!(stored.media_item_ids, vec!["m2", "m1"]);

        experiences
            .update(
                &id,
                &ExperienceUpdate {
                    media_item_ids: Some(Vec::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(experiences.get(&id).unwrap().unwrap().media_item_ids.is_empty());

        let missing = experiences.update("missing", &ExperienceUpdate::default());
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[test_context(ExperiencesTestContext)]
    #[test]
    fn test_deleting_experience_keeps_tags(ctx: &mut ExperiencesTestContext) {
        let session = ctx.db.session();
        let id = session.experiences().add(&trade_show()).unwrap();

        session.experiences().delete(&id).unwrap();

        assert!(session.experiences().get(&id).unwrap().is_none());
        assert!(session.tags().get_by_name("events").unwrap().is_some());
        assert!(session.tags().list_for_experience(&id).unwrap().is_empty());
    }
}
