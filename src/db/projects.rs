//! Client projects and the tasks inside them.

use super::clients::ensure_client;
use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    change_f64, exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_non_negative, require_text, soft_delete, update_live_row, update_row,
    Changes, Conditions, FromRow, Page,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const INSERT_PROJECT: &str = "INSERT INTO Projects
    (project_id, client_id, project_name, description, start_date, deadline_date, budget, status_id,
     progress_percentage, manager_team_member_id, priority, is_deleted, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)";
const SELECT_PROJECT_BY_ID: &str = "SELECT * FROM Projects WHERE project_id = ?1";
const SELECT_LIVE_PROJECT_BY_ID: &str = "SELECT * FROM Projects WHERE project_id = ?1 AND is_deleted = 0";
const SELECT_PROJECTS: &str = "SELECT * FROM Projects";
const SELECT_PROJECTS_WITH_STATUS: &str = "SELECT p.* FROM Projects p
    LEFT JOIN StatusSettings s ON s.status_id = p.status_id";

const INSERT_TASK: &str = "INSERT INTO Tasks
    (project_id, task_name, description, status_id, assignee_team_member_id, reporter_team_member_id, due_date,
     priority, estimated_hours, actual_hours_spent, parent_task_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)";
const SELECT_TASK_BY_ID: &str = "SELECT * FROM Tasks WHERE task_id = ?1";
const SELECT_TASKS: &str = "SELECT * FROM Tasks";
const SELECT_SUBTASKS: &str = "SELECT * FROM Tasks WHERE parent_task_id = ?1 ORDER BY priority DESC, task_id";
const SELECT_TASK_COMPLETION_STATUS: &str = "SELECT status_id FROM StatusSettings
    WHERE status_type = 'Task' AND is_completion_status = 1
    ORDER BY sort_order, status_id LIMIT 1";
const COMPLETE_TASK: &str = "UPDATE Tasks SET completed_at = ?2, status_id = COALESCE(?3, status_id), updated_at = ?2 WHERE task_id = ?1";

const PROJECT_COLUMNS: &[&str] = &[
    "project_name",
    "description",
    "start_date",
    "deadline_date",
    "budget",
    "status_id",
    "progress_percentage",
    "manager_team_member_id",
    "priority",
];
const TASK_COLUMNS: &[&str] = &[
    "task_name",
    "description",
    "status_id",
    "assignee_team_member_id",
    "reporter_team_member_id",
    "due_date",
    "priority",
    "estimated_hours",
    "actual_hours_spent",
    "parent_task_id",
    "completed_at",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub client_id: String,
    pub project_name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub deadline_date: Option<String>,
    pub budget: Option<f64>,
    pub status_id: Option<i64>,
    pub progress_percentage: i64,
    pub manager_team_member_id: Option<i64>,
    pub priority: i64,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Project {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Project {
            project_id: row.get("project_id")?,
            client_id: row.get("client_id")?,
            project_name: row.get("project_name")?,
            description: row.get("description")?,
            start_date: row.get("start_date")?,
            deadline_date: row.get("deadline_date")?,
            budget: row.get("budget")?,
            status_id: row.get("status_id")?,
            progress_percentage: row.get("progress_percentage")?,
            manager_team_member_id: row.get("manager_team_member_id")?,
            priority: row.get("priority")?,
            is_deleted: row.get("is_deleted")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub client_id: String,
    pub project_name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub deadline_date: Option<String>,
    pub budget: Option<f64>,
    pub status_id: Option<i64>,
    pub progress_percentage: i64,
    pub manager_team_member_id: Option<i64>,
    pub priority: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub client_id: Option<String>,
    pub status_id: Option<i64>,
    pub manager_team_member_id: Option<i64>,
    pub priority: Option<i64>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: i64,
    pub project_id: String,
    pub task_name: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub assignee_team_member_id: Option<i64>,
    pub reporter_team_member_id: Option<i64>,
    pub due_date: Option<String>,
    pub priority: i64,
    pub estimated_hours: Option<f64>,
    pub actual_hours_spent: Option<f64>,
    pub parent_task_id: Option<i64>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Task {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Task {
            task_id: row.get("task_id")?,
            project_id: row.get("project_id")?,
            task_name: row.get("task_name")?,
            description: row.get("description")?,
            status_id: row.get("status_id")?,
            assignee_team_member_id: row.get("assignee_team_member_id")?,
            reporter_team_member_id: row.get("reporter_team_member_id")?,
            due_date: row.get("due_date")?,
            priority: row.get("priority")?,
            estimated_hours: row.get("estimated_hours")?,
            actual_hours_spent: row.get("actual_hours_spent")?,
            parent_task_id: row.get("parent_task_id")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: String,
    pub task_name: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub assignee_team_member_id: Option<i64>,
    pub reporter_team_member_id: Option<i64>,
    pub due_date: Option<String>,
    pub priority: i64,
    pub estimated_hours: Option<f64>,
    pub actual_hours_spent: Option<f64>,
    pub parent_task_id: Option<i64>,
}

pub(crate) fn ensure_project(conn: &Connection, project_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Projects WHERE project_id = ?1 AND is_deleted = 0", [project_id])? {
        return Err(DbError::not_found("Project", project_id));
    }
    Ok(())
}

fn validate_progress(value: i64) -> DbResult<()> {
    if !(0..=100).contains(&value) {
        return Err(DbError::validation("progress_percentage", "must be between 0 and 100"));
    }
    Ok(())
}

pub struct Projects<'a> {
    session: Session<'a>,
}

impl<'a> Projects<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, project: &NewProject) -> DbResult<String> {
        require_text("project_name", &project.project_name)?;
        if let Some(budget) = project.budget {
            require_non_negative("budget", budget)?;
        }
        validate_progress(project.progress_percentage)?;

        let project_id = new_id();
        self.session.run(|conn| {
            ensure_client(conn, &project.client_id)?;
            conn.execute(
                INSERT_PROJECT,
                params![
                    project_id,
                    project.client_id,
                    project.project_name.trim(),
                    project.description,
                    project.start_date,
                    project.deadline_date,
                    project.budget,
                    project.status_id,
                    project.progress_percentage,
                    project.manager_team_member_id,
                    project.priority,
                    now_iso()
                ],
            )?;
            Ok(project_id.clone())
        })
    }

    pub fn get(&self, project_id: &str, include_deleted: bool) -> DbResult<Option<Project>> {
        let sql = if include_deleted { SELECT_PROJECT_BY_ID } else { SELECT_LIVE_PROJECT_BY_ID };
        self.session.run(|conn| fetch_one(conn, sql, [project_id]))
    }

    pub fn list(&self, filter: &ProjectFilter, page: Page) -> DbResult<Vec<Project>> {
        let mut conditions = Conditions::new();
        if !filter.include_deleted {
            conditions.push_raw("is_deleted = 0");
        }
        conditions
            .push_opt("client_id = ?", filter.client_id.clone())
            .push_opt("status_id = ?", filter.status_id)
            .push_opt("manager_team_member_id = ?", filter.manager_team_member_id)
            .push_opt("priority = ?", filter.priority);
        let tail = format!(" ORDER BY created_at DESC, project_name{}", page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_PROJECTS, &tail))
    }

    /// Live projects whose status is not archival (or that have no status).
    pub fn list_active(&self, client_id: Option<&str>) -> DbResult<Vec<Project>> {
        let mut conditions = Conditions::new();
        conditions
            .push_raw("p.is_deleted = 0")
            .push_raw("COALESCE(s.is_archival_status, 0) = 0")
            .push_opt("p.client_id = ?", client_id.map(str::to_string));
        self.session
            .run(|conn| conditions.query(conn, SELECT_PROJECTS_WITH_STATUS, " ORDER BY p.deadline_date, p.project_name"))
    }

    pub fn update(&self, project_id: &str, changes: &Changes) -> DbResult<usize> {
        if let Some(budget) = change_f64(changes, "budget")? {
            require_non_negative("budget", budget)?;
        }
        if let Some(progress) = change_f64(changes, "progress_percentage")? {
            validate_progress(progress as i64)?;
        }
        self.session.run(|conn| {
            let affected = update_live_row(
                conn,
                "Projects",
                "project_id",
                SqlValue::Text(project_id.to_string()),
                PROJECT_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "Project", project_id)
        })
    }

    /// Soft delete. Tasks and product links stay until a hard purge.
    pub fn delete(&self, project_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| soft_delete(conn, "Projects", "project_id", SqlValue::Text(project_id.to_string()), "Project", ""))
    }

    /// Removes the project and cascades to its tasks and product links.
    pub fn purge(&self, project_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Projects", "project_id", SqlValue::Text(project_id.to_string()), "Project"))
    }
}

pub struct Tasks<'a> {
    session: Session<'a>,
}

impl<'a> Tasks<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, task: &NewTask) -> DbResult<i64> {
        require_text("task_name", &task.task_name)?;
        for (field, value) in [("estimated_hours", task.estimated_hours), ("actual_hours_spent", task.actual_hours_spent)] {
            if let Some(value) = value {
                require_non_negative(field, value)?;
            }
        }

        self.session.run(|conn| {
            ensure_project(conn, &task.project_id)?;
            if let Some(parent_id) = task.parent_task_id {
                let parent: Option<Task> = fetch_one(conn, SELECT_TASK_BY_ID, [parent_id])?;
                match parent {
                    None => return Err(DbError::not_found("Task", parent_id)),
                    Some(parent) if parent.project_id != task.project_id => {
                        return Err(DbError::validation("parent_task_id", "parent task belongs to another project"));
                    }
                    Some(_) => {}
                }
            }
            conn.execute(
                INSERT_TASK,
                params![
                    task.project_id,
                    task.task_name.trim(),
                    task.description,
                    task.status_id,
                    task.assignee_team_member_id,
                    task.reporter_team_member_id,
                    task.due_date,
                    task.priority,
                    task.estimated_hours,
                    task.actual_hours_spent,
                    task.parent_task_id,
                    now_iso()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, task_id: i64) -> DbResult<Option<Task>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TASK_BY_ID, [task_id]))
    }

    pub fn list_for_project(&self, project_id: &str, status_id: Option<i64>) -> DbResult<Vec<Task>> {
        let mut conditions = Conditions::new();
        conditions.push("project_id = ?", project_id.to_string()).push_opt("status_id = ?", status_id);
        self.session
            .run(|conn| conditions.query(conn, SELECT_TASKS, " ORDER BY priority DESC, due_date, task_id"))
    }

    pub fn list_for_assignee(&self, team_member_id: i64) -> DbResult<Vec<Task>> {
        let mut conditions = Conditions::new();
        conditions.push("assignee_team_member_id = ?", team_member_id);
        self.session
            .run(|conn| conditions.query(conn, SELECT_TASKS, " ORDER BY due_date, priority DESC, task_id"))
    }

    pub fn list_subtasks(&self, parent_task_id: i64) -> DbResult<Vec<Task>> {
        self.session.run(|conn| fetch_all(conn, SELECT_SUBTASKS, [parent_task_id]))
    }

    pub fn update(&self, task_id: i64, changes: &Changes) -> DbResult<usize> {
        if changes.get("parent_task_id").and_then(|v| v.as_i64()) == Some(task_id) {
            return Err(DbError::validation("parent_task_id", "a task cannot be its own parent"));
        }
        self.session.run(|conn| {
            let affected = update_row(conn, "Tasks", "task_id", SqlValue::Integer(task_id), TASK_COLUMNS, changes, Some("updated_at"))?;
            found(affected, "Task", task_id)
        })
    }

    /// Stamps `completed_at` and moves the task to the first completion
    /// status of the catalogue, when one exists.
    pub fn complete(&self, task_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            let status_id: Option<i64> = conn.query_row(SELECT_TASK_COMPLETION_STATUS, [], |row| row.get(0)).optional()?;
            found(conn.execute(COMPLETE_TASK, params![task_id, now_iso(), status_id])?, "Task", task_id)?;
            Ok(())
        })
    }

    /// Hard delete; subtasks are detached, not removed.
    pub fn delete(&self, task_id: i64) -> DbResult<()> {
        self.session.run(|conn| hard_delete(conn, "Tasks", "task_id", SqlValue::Integer(task_id), "Task"))
    }
}
