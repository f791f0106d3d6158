#[cfg(test)]
mod tests {
    use backoffice::db::db::Db;
    use backoffice::db::envelope::Envelope;
    use backoffice::db::error::{DbError, ErrorKind};
    use backoffice::db::recruitment::{NewCandidate, NewInterview, NewJobOpening};
    use backoffice::db::schema::initialize_database;
    use backoffice::libs::config::AppConfig;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct RecruitmentTestContext {
        _temp_dir: TempDir,
        db: Db,
        job_id: String,
        candidate_id: String,
        step_id: String,
    }

    impl TestContext for RecruitmentTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let db = Db::open(&db_path).unwrap();
            initialize_database(&db, &AppConfig::with_database(db_path.display().to_string())).unwrap();

            let session = db.session();
            let job_id = session
                .job_openings()
                .add(&NewJobOpening {
                    title: "Backend Engineer".to_string(),
                    ..Default::default()
                })
                .unwrap();
            let candidate_id = session
                .candidates()
                .add(&NewCandidate {
                    job_opening_id: job_id.clone(),
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                    ..Default::default()
                })
                .unwrap();
            let step_id = session.recruitment_steps().add(&job_id, "Phone screen", 1, None).unwrap();

            RecruitmentTestContext {
                _temp_dir: temp_dir,
                db,
                job_id,
                candidate_id,
                step_id,
            }
        }
    }

    #[test_context(RecruitmentTestContext)]
    #[test]
    fn test_duplicate_progress_reports_existing_id(ctx: &mut RecruitmentTestContext) {
        let progress = ctx.db.session().candidate_progress();
        let first = progress.add(&ctx.candidate_id, &ctx.step_id, Some("Pending"), None).unwrap();

        let envelope = Envelope::from_id(progress.add(&ctx.candidate_id, &ctx.step_id, Some("Passed"), None));
        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains(&first));
        assert_eq!(envelope.id, Some(Value::String(first.clone())));
        assert_eq!(envelope.error_kind, Some(ErrorKind::Conflict));

        let rows = progress.list_for_candidate(&ctx.candidate_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "Pending");
    }

    #[test_context(RecruitmentTestContext)]
    #[test]
    fn test_candidate_email_is_unique_per_job(ctx: &mut RecruitmentTestContext) {
        let session = ctx.db.session();
        let again = NewCandidate {
            job_opening_id: ctx.job_id.clone(),
            first_name: "Ada".to_string(),
            last_name: "King".to_string(),
            email: "ada@example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(session.candidates().add(&again).unwrap_err().kind(), ErrorKind::Conflict);

        let other_job = session
            .job_openings()
            .add(&NewJobOpening {
                title: "Data Engineer".to_string(),
                ..Default::default()
            })
            .unwrap();
        session
            .candidates()
            .add(&NewCandidate {
                job_opening_id: other_job,
                ..again
            })
            .unwrap();

        let candidate = session.candidates().get(&ctx.candidate_id).unwrap().unwrap();
        assert_eq!(candidate.current_status, "Applied");
    }

    #[test_context(RecruitmentTestContext)]
    #[test]
    fn test_steps_and_interviews_stay_within_their_job(ctx: &mut RecruitmentTestContext) {
        let session = ctx.db.session();
        assert_eq!(
            session.recruitment_steps().add(&ctx.job_id, "Duplicate order", 1, None).unwrap_err().kind(),
            ErrorKind::Conflict
        );

        let other_job = session
            .job_openings()
            .add(&NewJobOpening {
                title: "Designer".to_string(),
                ..Default::default()
            })
            .unwrap();
        let foreign_step = session.recruitment_steps().add(&other_job, "Portfolio review", 1, None).unwrap();
        let mismatch = session.candidate_progress().add(&ctx.candidate_id, &foreign_step, None, None);
        assert!(matches!(mismatch, Err(DbError::Validation { .. })));

        let interview_id = session
            .interviews()
            .add(&NewInterview {
                candidate_id: ctx.candidate_id.clone(),
                job_opening_id: ctx.job_id.clone(),
                recruitment_step_id: Some(ctx.step_id.clone()),
                scheduled_at: "2024-05-01T10:00:00Z".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.interviews().get(&interview_id).unwrap().unwrap().status, "Scheduled");

        let wrong_job = session.interviews().add(&NewInterview {
            candidate_id: ctx.candidate_id.clone(),
            job_opening_id: other_job,
            scheduled_at: "2024-05-02T10:00:00Z".to_string(),
            ..Default::default()
        });
        assert!(matches!(wrong_job, Err(DbError::Validation { .. })));

        let rating = json!({"feedback_rating": 9}).as_object().cloned().unwrap();
        assert!(session.interviews().update(&interview_id, &rating).is_err());
    }

    #[test_context(RecruitmentTestContext)]
    #[test]
    fn test_deleting_job_removes_its_pipeline(ctx: &mut RecruitmentTestContext) {
        let session = ctx.db.session();
        session.candidate_progress().add(&ctx.candidate_id, &ctx.step_id, None, None).unwrap();

        session.job_openings().delete(&ctx.job_id).unwrap();

        assert!(session.candidates().get(&ctx.candidate_id).unwrap().is_none());
        assert!(session.recruitment_steps().get(&ctx.step_id).unwrap().is_none());
        assert!(session.candidate_progress().list_for_candidate(&ctx.candidate_id).unwrap().is_empty());
    }
}
