//! Staff records, optionally tied to a login user.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{fetch_one, found, hard_delete, now_iso, require_text, update_row, user_ref, Changes, Conditions, FromRow};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_TEAM_MEMBER: &str = "INSERT INTO TeamMembers
    (user_id, full_name, email, role_or_title, department, phone_number, profile_picture_url, is_active, notes,
     hire_date, performance, skills, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)";
const SELECT_TEAM_MEMBER_BY_ID: &str = "SELECT * FROM TeamMembers WHERE team_member_id = ?1";
const SELECT_TEAM_MEMBER_BY_EMAIL: &str = "SELECT * FROM TeamMembers WHERE email = ?1";
const SELECT_TEAM_MEMBERS: &str = "SELECT * FROM TeamMembers";

const TEAM_MEMBER_COLUMNS: &[&str] = &[
    "user_id",
    "full_name",
    "email",
    "role_or_title",
    "department",
    "phone_number",
    "profile_picture_url",
    "is_active",
    "notes",
    "hire_date",
    "performance",
    "skills",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub team_member_id: i64,
    pub user_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub role_or_title: Option<String>,
    pub department: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub hire_date: Option<String>,
    pub performance: i64,
    pub skills: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for TeamMember {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TeamMember {
            team_member_id: row.get("team_member_id")?,
            user_id: row.get("user_id")?,
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            role_or_title: row.get("role_or_title")?,
            department: row.get("department")?,
            phone_number: row.get("phone_number")?,
            profile_picture_url: row.get("profile_picture_url")?,
            is_active: row.get("is_active")?,
            notes: row.get("notes")?,
            hire_date: row.get("hire_date")?,
            performance: row.get("performance")?,
            skills: row.get("skills")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeamMember {
    pub user_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub role_or_title: Option<String>,
    pub department: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub hire_date: Option<String>,
    pub performance: i64,
    pub skills: Option<String>,
}

impl Default for NewTeamMember {
    fn default() -> Self {
        NewTeamMember {
            user_id: None,
            full_name: String::new(),
            email: String::new(),
            role_or_title: None,
            department: None,
            phone_number: None,
            profile_picture_url: None,
            is_active: true,
            notes: None,
            hire_date: None,
            performance: 0,
            skills: None,
        }
    }
}

pub struct TeamMembers<'a> {
    session: Session<'a>,
}

impl<'a> TeamMembers<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, member: &NewTeamMember) -> DbResult<i64> {
        require_text("full_name", &member.full_name)?;
        require_text("email", &member.email)?;
        self.session.run(|conn| {
            conn.execute(
                INSERT_TEAM_MEMBER,
                params![
                    user_ref(member.user_id.as_deref()),
                    member.full_name.trim(),
                    member.email.trim(),
                    member.role_or_title,
                    member.department,
                    member.phone_number,
                    member.profile_picture_url,
                    member.is_active,
                    member.notes,
                    member.hire_date,
                    member.performance,
                    member.skills,
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("TeamMember"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, team_member_id: i64) -> DbResult<Option<TeamMember>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TEAM_MEMBER_BY_ID, [team_member_id]))
    }

    pub fn get_by_email(&self, email: &str) -> DbResult<Option<TeamMember>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TEAM_MEMBER_BY_EMAIL, [email.trim()]))
    }

    /// `active`: `Some(true)` for active staff only, `Some(false)` for former staff.
    pub fn list(&self, active: Option<bool>) -> DbResult<Vec<TeamMember>> {
        let mut conditions = Conditions::new();
        conditions.push_opt("is_active = ?", active);
        self.session.run(|conn| conditions.query(conn, SELECT_TEAM_MEMBERS, " ORDER BY full_name"))
    }

    pub fn update(&self, team_member_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "TeamMembers",
                "team_member_id",
                SqlValue::Integer(team_member_id),
                TEAM_MEMBER_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("TeamMember"))?;
            found(affected, "TeamMember", team_member_id)
        })
    }

    /// Hard delete; projects and tasks keep the row but lose the reference.
    pub fn delete(&self, team_member_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "TeamMembers", "team_member_id", SqlValue::Integer(team_member_id), "TeamMember")
        })
    }
}
