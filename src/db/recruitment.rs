//! Recruitment pipeline: job openings, their candidates and steps,
//! interviews, and each candidate's progress through the steps.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, user_ref, Changes, Conditions, FromRow,
};
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const INSERT_JOB_OPENING: &str = "INSERT INTO JobOpenings
    (job_opening_id, title, description, status_id, department, location, created_by_user_id, closing_date, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_JOB_OPENING_BY_ID: &str = "SELECT * FROM JobOpenings WHERE job_opening_id = ?1";
const SELECT_JOB_OPENINGS: &str = "SELECT * FROM JobOpenings";

const INSERT_CANDIDATE: &str = "INSERT INTO Candidates
    (candidate_id, job_opening_id, first_name, last_name, email, phone, resume_file_path, cover_letter_path,
     application_source, current_status, notes, linkedin_profile_url, portfolio_url, years_of_experience,
     application_date, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)";
const SELECT_CANDIDATE_BY_ID: &str = "SELECT * FROM Candidates WHERE candidate_id = ?1";
const SELECT_CANDIDATES: &str = "SELECT * FROM Candidates";

const INSERT_STEP: &str = "INSERT INTO RecruitmentSteps
    (recruitment_step_id, job_opening_id, step_name, step_order, description, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)";
const SELECT_STEP_BY_ID: &str = "SELECT * FROM RecruitmentSteps WHERE recruitment_step_id = ?1";
const SELECT_STEPS_FOR_JOB: &str = "SELECT * FROM RecruitmentSteps WHERE job_opening_id = ?1 ORDER BY step_order";

const INSERT_INTERVIEW: &str = "INSERT INTO Interviews
    (interview_id, candidate_id, job_opening_id, recruitment_step_id, interviewer_team_member_id, scheduled_at,
     duration_minutes, interview_type, location_or_link, status, feedback_notes_overall, feedback_rating,
     created_by_user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)";
const SELECT_INTERVIEW_BY_ID: &str = "SELECT * FROM Interviews WHERE interview_id = ?1";
const SELECT_INTERVIEWS: &str = "SELECT * FROM Interviews";

const INSERT_PROGRESS: &str = "INSERT INTO CandidateProgress
    (candidate_progress_id, candidate_id, recruitment_step_id, status, notes, completed_at, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)";
const SELECT_PROGRESS_BY_ID: &str = "SELECT * FROM CandidateProgress WHERE candidate_progress_id = ?1";
const SELECT_PROGRESS_PAIR: &str = "SELECT candidate_progress_id FROM CandidateProgress
    WHERE candidate_id = ?1 AND recruitment_step_id = ?2";
const SELECT_PROGRESS_FOR_CANDIDATE: &str = "SELECT cp.* FROM CandidateProgress cp
    JOIN RecruitmentSteps s ON s.recruitment_step_id = cp.recruitment_step_id
    WHERE cp.candidate_id = ?1 ORDER BY s.step_order";

const JOB_OPENING_COLUMNS: &[&str] = &["title", "description", "status_id", "department", "location", "closing_date"];
const CANDIDATE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone",
    "resume_file_path",
    "cover_letter_path",
    "application_source",
    "current_status",
    "notes",
    "linkedin_profile_url",
    "portfolio_url",
    "years_of_experience",
    "application_date",
];
const STEP_COLUMNS: &[&str] = &["step_name", "step_order", "description"];
const INTERVIEW_COLUMNS: &[&str] = &[
    "recruitment_step_id",
    "interviewer_team_member_id",
    "scheduled_at",
    "duration_minutes",
    "interview_type",
    "location_or_link",
    "status",
    "feedback_notes_overall",
    "feedback_rating",
];
const PROGRESS_COLUMNS: &[&str] = &["status", "notes", "completed_at"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOpening {
    pub job_opening_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub created_by_user_id: Option<String>,
    pub closing_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for JobOpening {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(JobOpening {
            job_opening_id: row.get("job_opening_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status_id: row.get("status_id")?,
            department: row.get("department")?,
            location: row.get("location")?,
            created_by_user_id: row.get("created_by_user_id")?,
            closing_date: row.get("closing_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewJobOpening {
    pub title: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub created_by_user_id: Option<String>,
    pub closing_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    pub job_opening_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_file_path: Option<String>,
    pub cover_letter_path: Option<String>,
    pub application_source: Option<String>,
    pub current_status: String,
    pub notes: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub years_of_experience: Option<i64>,
    pub application_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Candidate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Candidate {
            candidate_id: row.get("candidate_id")?,
            job_opening_id: row.get("job_opening_id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            resume_file_path: row.get("resume_file_path")?,
            cover_letter_path: row.get("cover_letter_path")?,
            application_source: row.get("application_source")?,
            current_status: row.get("current_status")?,
            notes: row.get("notes")?,
            linkedin_profile_url: row.get("linkedin_profile_url")?,
            portfolio_url: row.get("portfolio_url")?,
            years_of_experience: row.get("years_of_experience")?,
            application_date: row.get("application_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub job_opening_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_file_path: Option<String>,
    pub cover_letter_path: Option<String>,
    pub application_source: Option<String>,
    /// Defaults to `Applied`.
    pub current_status: Option<String>,
    pub notes: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub years_of_experience: Option<i64>,
    /// Defaults to now.
    pub application_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruitmentStep {
    pub recruitment_step_id: String,
    pub job_opening_id: String,
    pub step_name: String,
    pub step_order: i64,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for RecruitmentStep {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecruitmentStep {
            recruitment_step_id: row.get("recruitment_step_id")?,
            job_opening_id: row.get("job_opening_id")?,
            step_name: row.get("step_name")?,
            step_order: row.get("step_order")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub interview_id: String,
    pub candidate_id: String,
    pub job_opening_id: String,
    pub recruitment_step_id: Option<String>,
    pub interviewer_team_member_id: Option<i64>,
    pub scheduled_at: String,
    pub duration_minutes: Option<i64>,
    pub interview_type: Option<String>,
    pub location_or_link: Option<String>,
    pub status: String,
    pub feedback_notes_overall: Option<String>,
    pub feedback_rating: Option<i64>,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Interview {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Interview {
            interview_id: row.get("interview_id")?,
            candidate_id: row.get("candidate_id")?,
            job_opening_id: row.get("job_opening_id")?,
            recruitment_step_id: row.get("recruitment_step_id")?,
            interviewer_team_member_id: row.get("interviewer_team_member_id")?,
            scheduled_at: row.get("scheduled_at")?,
            duration_minutes: row.get("duration_minutes")?,
            interview_type: row.get("interview_type")?,
            location_or_link: row.get("location_or_link")?,
            status: row.get("status")?,
            feedback_notes_overall: row.get("feedback_notes_overall")?,
            feedback_rating: row.get("feedback_rating")?,
            created_by_user_id: row.get("created_by_user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInterview {
    pub candidate_id: String,
    pub job_opening_id: String,
    pub recruitment_step_id: Option<String>,
    pub interviewer_team_member_id: Option<i64>,
    pub scheduled_at: String,
    pub duration_minutes: Option<i64>,
    pub interview_type: Option<String>,
    pub location_or_link: Option<String>,
    pub created_by_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub candidate_progress_id: String,
    pub candidate_id: String,
    pub recruitment_step_id: String,
    pub status: String,
    pub notes: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Progress {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Progress {
            candidate_progress_id: row.get("candidate_progress_id")?,
            candidate_id: row.get("candidate_id")?,
            recruitment_step_id: row.get("recruitment_step_id")?,
            status: row.get("status")?,
            notes: row.get("notes")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn ensure_job_opening(conn: &Connection, job_opening_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM JobOpenings WHERE job_opening_id = ?1", [job_opening_id])? {
        return Err(DbError::not_found("JobOpening", job_opening_id));
    }
    Ok(())
}

fn candidate_job(conn: &Connection, candidate_id: &str) -> DbResult<String> {
    conn.query_row("SELECT job_opening_id FROM Candidates WHERE candidate_id = ?1", [candidate_id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| DbError::not_found("Candidate", candidate_id))
}

fn step_job(conn: &Connection, step_id: &str) -> DbResult<String> {
    conn.query_row(
        "SELECT job_opening_id FROM RecruitmentSteps WHERE recruitment_step_id = ?1",
        [step_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::not_found("RecruitmentStep", step_id))
}

pub struct JobOpenings<'a> {
    session: Session<'a>,
}

impl<'a> JobOpenings<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, job: &NewJobOpening) -> DbResult<String> {
        require_text("title", &job.title)?;
        let job_opening_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_JOB_OPENING,
                params![
                    job_opening_id,
                    job.title.trim(),
                    job.description,
                    job.status_id,
                    job.department,
                    job.location,
                    user_ref(job.created_by_user_id.as_deref()),
                    job.closing_date,
                    now_iso()
                ],
            )?;
            Ok(job_opening_id.clone())
        })
    }

    pub fn get(&self, job_opening_id: &str) -> DbResult<Option<JobOpening>> {
        self.session.run(|conn| fetch_one(conn, SELECT_JOB_OPENING_BY_ID, [job_opening_id]))
    }

    pub fn list(&self, status_id: Option<i64>, department: Option<&str>) -> DbResult<Vec<JobOpening>> {
        let mut conditions = Conditions::new();
        conditions
            .push_opt("status_id = ?", status_id)
            .push_opt("department = ?", department.map(str::to_string));
        self.session
            .run(|conn| conditions.query(conn, SELECT_JOB_OPENINGS, " ORDER BY created_at DESC, title"))
    }

    pub fn update(&self, job_opening_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "JobOpenings",
                "job_opening_id",
                SqlValue::Text(job_opening_id.to_string()),
                JOB_OPENING_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "JobOpening", job_opening_id)
        })
    }

    /// Removes the opening with its candidates, steps and interviews.
    pub fn delete(&self, job_opening_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "JobOpenings", "job_opening_id", SqlValue::Text(job_opening_id.to_string()), "JobOpening")
        })
    }
}

pub struct Candidates<'a> {
    session: Session<'a>,
}

impl<'a> Candidates<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Email is unique per job opening.
    pub fn add(&self, candidate: &NewCandidate) -> DbResult<String> {
        require_text("first_name", &candidate.first_name)?;
        require_text("last_name", &candidate.last_name)?;
        require_text("email", &candidate.email)?;
        let candidate_id = new_id();
        let now = now_iso();
        self.session.run(|conn| {
            ensure_job_opening(conn, &candidate.job_opening_id)?;
            conn.execute(
                INSERT_CANDIDATE,
                params![
                    candidate_id,
                    candidate.job_opening_id,
                    candidate.first_name.trim(),
                    candidate.last_name.trim(),
                    candidate.email.trim(),
                    candidate.phone,
                    candidate.resume_file_path,
                    candidate.cover_letter_path,
                    candidate.application_source,
                    candidate.current_status.as_deref().unwrap_or("Applied"),
                    candidate.notes,
                    candidate.linkedin_profile_url,
                    candidate.portfolio_url,
                    candidate.years_of_experience,
                    candidate.application_date.as_deref().unwrap_or(&now),
                    now
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("Candidate"))?;
            Ok(candidate_id.clone())
        })
    }

    pub fn get(&self, candidate_id: &str) -> DbResult<Option<Candidate>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CANDIDATE_BY_ID, [candidate_id]))
    }

    pub fn list_for_job(&self, job_opening_id: &str, current_status: Option<&str>) -> DbResult<Vec<Candidate>> {
        let mut conditions = Conditions::new();
        conditions
            .push("job_opening_id = ?", job_opening_id.to_string())
            .push_opt("current_status = ?", current_status.map(str::to_string));
        self.session
            .run(|conn| conditions.query(conn, SELECT_CANDIDATES, " ORDER BY application_date, last_name"))
    }

    pub fn update(&self, candidate_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "Candidates",
                "candidate_id",
                SqlValue::Text(candidate_id.to_string()),
                CANDIDATE_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("Candidate"))?;
            found(affected, "Candidate", candidate_id)
        })
    }

    pub fn delete(&self, candidate_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Candidates", "candidate_id", SqlValue::Text(candidate_id.to_string()), "Candidate"))
    }
}

pub struct RecruitmentSteps<'a> {
    session: Session<'a>,
}

impl<'a> RecruitmentSteps<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// `step_order` is unique within the job opening.
    pub fn add(&self, job_opening_id: &str, step_name: &str, step_order: i64, description: Option<&str>) -> DbResult<String> {
        require_text("step_name", step_name)?;
        let step_id = new_id();
        self.session.run(|conn| {
            ensure_job_opening(conn, job_opening_id)?;
            conn.execute(
                INSERT_STEP,
                params![step_id, job_opening_id, step_name.trim(), step_order, description, now_iso()],
            )
            .map_err(|e| DbError::from(e).for_entity("RecruitmentStep"))?;
            Ok(step_id.clone())
        })
    }

    pub fn get(&self, step_id: &str) -> DbResult<Option<RecruitmentStep>> {
        self.session.run(|conn| fetch_one(conn, SELECT_STEP_BY_ID, [step_id]))
    }

    pub fn list_for_job(&self, job_opening_id: &str) -> DbResult<Vec<RecruitmentStep>> {
        self.session.run(|conn| fetch_all(conn, SELECT_STEPS_FOR_JOB, [job_opening_id]))
    }

    pub fn update(&self, step_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "RecruitmentSteps",
                "recruitment_step_id",
                SqlValue::Text(step_id.to_string()),
                STEP_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("RecruitmentStep"))?;
            found(affected, "RecruitmentStep", step_id)
        })
    }

    pub fn delete(&self, step_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "RecruitmentSteps", "recruitment_step_id", SqlValue::Text(step_id.to_string()), "RecruitmentStep")
        })
    }
}

pub struct Interviews<'a> {
    session: Session<'a>,
}

impl<'a> Interviews<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Every referenced parent must exist, and the candidate and step must
    /// belong to the given job opening.
    pub fn add(&self, interview: &NewInterview) -> DbResult<String> {
        require_text("scheduled_at", &interview.scheduled_at)?;
        let interview_id = new_id();
        self.session.run(|conn| {
            ensure_job_opening(conn, &interview.job_opening_id)?;
            if candidate_job(conn, &interview.candidate_id)? != interview.job_opening_id {
                return Err(DbError::validation("candidate_id", "candidate applied to another job opening"));
            }
            if let Some(step_id) = interview.recruitment_step_id.as_deref() {
                if step_job(conn, step_id)? != interview.job_opening_id {
                    return Err(DbError::validation("recruitment_step_id", "step belongs to another job opening"));
                }
            }
            if let Some(member_id) = interview.interviewer_team_member_id {
                if !exists(conn, "SELECT 1 FROM TeamMembers WHERE team_member_id = ?1", [member_id])? {
                    return Err(DbError::not_found("TeamMember", member_id));
                }
            }
            conn.execute(
                INSERT_INTERVIEW,
                params![
                    interview_id,
                    interview.candidate_id,
                    interview.job_opening_id,
                    interview.recruitment_step_id,
                    interview.interviewer_team_member_id,
                    interview.scheduled_at,
                    interview.duration_minutes,
                    interview.interview_type,
                    interview.location_or_link,
                    "Scheduled",
                    Option::<String>::None,
                    Option::<i64>::None,
                    user_ref(interview.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )?;
            Ok(interview_id.clone())
        })
    }

    pub fn get(&self, interview_id: &str) -> DbResult<Option<Interview>> {
        self.session.run(|conn| fetch_one(conn, SELECT_INTERVIEW_BY_ID, [interview_id]))
    }

    pub fn list_for_candidate(&self, candidate_id: &str) -> DbResult<Vec<Interview>> {
        let mut conditions = Conditions::new();
        conditions.push("candidate_id = ?", candidate_id.to_string());
        self.session.run(|conn| conditions.query(conn, SELECT_INTERVIEWS, " ORDER BY scheduled_at"))
    }

    pub fn list_for_job(&self, job_opening_id: &str) -> DbResult<Vec<Interview>> {
        let mut conditions = Conditions::new();
        conditions.push("job_opening_id = ?", job_opening_id.to_string());
        self.session.run(|conn| conditions.query(conn, SELECT_INTERVIEWS, " ORDER BY scheduled_at"))
    }

    pub fn update(&self, interview_id: &str, changes: &Changes) -> DbResult<usize> {
        if let Some(rating) = changes.get("feedback_rating").and_then(|v| v.as_i64()) {
            if !(0..=5).contains(&rating) {
                return Err(DbError::validation("feedback_rating", "must be between 0 and 5"));
            }
        }
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "Interviews",
                "interview_id",
                SqlValue::Text(interview_id.to_string()),
                INTERVIEW_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "Interview", interview_id)
        })
    }

    pub fn delete(&self, interview_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Interviews", "interview_id", SqlValue::Text(interview_id.to_string()), "Interview"))
    }
}

pub struct CandidateProgress<'a> {
    session: Session<'a>,
}

impl<'a> CandidateProgress<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// One row per candidate and step. A second add for the same pair is a
    /// conflict carrying the existing id; it never overwrites.
    pub fn add(&self, candidate_id: &str, step_id: &str, status: Option<&str>, notes: Option<&str>) -> DbResult<String> {
        let progress_id = new_id();
        self.session.run(|conn| {
            let job_opening_id = candidate_job(conn, candidate_id)?;
            if step_job(conn, step_id)? != job_opening_id {
                return Err(DbError::validation("recruitment_step_id", "step belongs to another job opening"));
            }
            let existing: Option<String> =
                conn.query_row(SELECT_PROGRESS_PAIR, params![candidate_id, step_id], |row| row.get(0)).optional()?;
            if let Some(existing_id) = existing {
                msg_debug!(Message::ProgressExists(existing_id.clone()));
                return Err(DbError::conflict_with(
                    "CandidateProgress",
                    format!("progress already exists with id {}", existing_id),
                    existing_id,
                ));
            }
            conn.execute(
                INSERT_PROGRESS,
                params![
                    progress_id,
                    candidate_id,
                    step_id,
                    status.unwrap_or("Pending"),
                    notes,
                    Option::<String>::None,
                    now_iso()
                ],
            )?;
            Ok(progress_id.clone())
        })
    }

    pub fn get(&self, progress_id: &str) -> DbResult<Option<Progress>> {
        self.session.run(|conn| fetch_one(conn, SELECT_PROGRESS_BY_ID, [progress_id]))
    }

    /// Progress rows in step order.
    pub fn list_for_candidate(&self, candidate_id: &str) -> DbResult<Vec<Progress>> {
        self.session.run(|conn| fetch_all(conn, SELECT_PROGRESS_FOR_CANDIDATE, [candidate_id]))
    }

    pub fn update(&self, progress_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "CandidateProgress",
                "candidate_progress_id",
                SqlValue::Text(progress_id.to_string()),
                PROGRESS_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "CandidateProgress", progress_id)
        })
    }

    pub fn delete(&self, progress_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "CandidateProgress",
                "candidate_progress_id",
                SqlValue::Text(progress_id.to_string()),
                "CandidateProgress",
            )
        })
    }
}
