//! Emails queued for later delivery and their reminders.
//!
//! Sending is not done here; a scheduler polls [`ScheduledEmails::list_due`]
//! and reports back through `update_status`.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, now_iso, require_text, user_ref, FromRow};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const INSERT_EMAIL: &str = "INSERT INTO ScheduledEmails
    (recipient_email, subject, body_html, body_text, scheduled_send_at, status, related_client_id, related_project_id,
     created_by_user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, ?9)";
const SELECT_EMAIL_BY_ID: &str = "SELECT * FROM ScheduledEmails WHERE scheduled_email_id = ?1";
const SELECT_DUE_EMAILS: &str = "SELECT * FROM ScheduledEmails
    WHERE status = 'pending' AND scheduled_send_at <= ?1 ORDER BY scheduled_send_at, scheduled_email_id";
const SELECT_EMAILS_BY_STATUS: &str = "SELECT * FROM ScheduledEmails WHERE status = ?1 ORDER BY scheduled_send_at";
const UPDATE_EMAIL_STATUS: &str = "UPDATE ScheduledEmails
    SET status = ?2, sent_at = CASE WHEN ?2 = 'sent' THEN ?4 ELSE sent_at END, error_message = ?3, updated_at = ?4
    WHERE scheduled_email_id = ?1";

const INSERT_REMINDER: &str = "INSERT INTO EmailReminders (scheduled_email_id, reminder_type, reminder_send_at, status, created_at)
    VALUES (?1, ?2, ?3, 'pending', ?4)";
const SELECT_REMINDERS: &str = "SELECT * FROM EmailReminders WHERE scheduled_email_id = ?1 ORDER BY reminder_send_at";
const UPDATE_REMINDER_STATUS: &str = "UPDATE EmailReminders SET status = ?2 WHERE reminder_id = ?1";

/// Delivery state shared by emails and reminders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            other => Err(DbError::validation("status", format!("unknown delivery status '{}'", other))),
        }
    }
}

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<DeliveryStatus> {
    let status: String = row.get("status")?;
    status
        .parse()
        .map_err(|e: DbError| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEmail {
    pub scheduled_email_id: i64,
    pub recipient_email: String,
    pub subject: String,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
    pub scheduled_send_at: String,
    pub status: DeliveryStatus,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
    pub related_client_id: Option<String>,
    pub related_project_id: Option<String>,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for ScheduledEmail {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ScheduledEmail {
            scheduled_email_id: row.get("scheduled_email_id")?,
            recipient_email: row.get("recipient_email")?,
            subject: row.get("subject")?,
            body_html: row.get("body_html")?,
            body_text: row.get("body_text")?,
            scheduled_send_at: row.get("scheduled_send_at")?,
            status: status_from_row(row)?,
            sent_at: row.get("sent_at")?,
            error_message: row.get("error_message")?,
            related_client_id: row.get("related_client_id")?,
            related_project_id: row.get("related_project_id")?,
            created_by_user_id: row.get("created_by_user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewScheduledEmail {
    pub recipient_email: String,
    pub subject: String,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
    pub scheduled_send_at: String,
    pub related_client_id: Option<String>,
    pub related_project_id: Option<String>,
    pub created_by_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReminder {
    pub reminder_id: i64,
    pub scheduled_email_id: i64,
    pub reminder_type: String,
    pub reminder_send_at: String,
    pub status: DeliveryStatus,
    pub created_at: String,
}

impl FromRow for EmailReminder {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EmailReminder {
            reminder_id: row.get("reminder_id")?,
            scheduled_email_id: row.get("scheduled_email_id")?,
            reminder_type: row.get("reminder_type")?,
            reminder_send_at: row.get("reminder_send_at")?,
            status: status_from_row(row)?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct ScheduledEmails<'a> {
    session: Session<'a>,
}

impl<'a> ScheduledEmails<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, email: &NewScheduledEmail) -> DbResult<i64> {
        require_text("recipient_email", &email.recipient_email)?;
        require_text("subject", &email.subject)?;
        require_text("scheduled_send_at", &email.scheduled_send_at)?;
        self.session.run(|conn| {
            conn.execute(
                INSERT_EMAIL,
                params![
                    email.recipient_email.trim(),
                    email.subject,
                    email.body_html,
                    email.body_text,
                    email.scheduled_send_at,
                    email.related_client_id,
                    email.related_project_id,
                    user_ref(email.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, email_id: i64) -> DbResult<Option<ScheduledEmail>> {
        self.session.run(|conn| fetch_one(conn, SELECT_EMAIL_BY_ID, [email_id]))
    }

    /// Pending emails scheduled at or before `now` (ISO text).
    pub fn list_due(&self, now: &str) -> DbResult<Vec<ScheduledEmail>> {
        self.session.run(|conn| fetch_all(conn, SELECT_DUE_EMAILS, [now]))
    }

    pub fn list_by_status(&self, status: DeliveryStatus) -> DbResult<Vec<ScheduledEmail>> {
        self.session.run(|conn| fetch_all(conn, SELECT_EMAILS_BY_STATUS, [status.as_str()]))
    }

    /// Moving to `sent` stamps `sent_at`.
    pub fn update_status(&self, email_id: i64, status: DeliveryStatus, error_message: Option<&str>) -> DbResult<()> {
        self.session.run(|conn| {
            let affected = conn.execute(UPDATE_EMAIL_STATUS, params![email_id, status.as_str(), error_message, now_iso()])?;
            found(affected, "ScheduledEmail", email_id)?;
            Ok(())
        })
    }

    /// Reminders go with the email.
    pub fn delete(&self, email_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "ScheduledEmails", "scheduled_email_id", SqlValue::Integer(email_id), "ScheduledEmail")
        })
    }
}

pub struct EmailReminders<'a> {
    session: Session<'a>,
}

impl<'a> EmailReminders<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, email_id: i64, reminder_type: &str, reminder_send_at: &str) -> DbResult<i64> {
        require_text("reminder_type", reminder_type)?;
        require_text("reminder_send_at", reminder_send_at)?;
        self.session.run(|conn| {
            if !exists(conn, "SELECT 1 FROM ScheduledEmails WHERE scheduled_email_id = ?1", [email_id])? {
                return Err(DbError::not_found("ScheduledEmail", email_id));
            }
            conn.execute(INSERT_REMINDER, params![email_id, reminder_type.trim(), reminder_send_at, now_iso()])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_for_email(&self, email_id: i64) -> DbResult<Vec<EmailReminder>> {
        self.session.run(|conn| fetch_all(conn, SELECT_REMINDERS, [email_id]))
    }

    pub fn update_status(&self, reminder_id: i64, status: DeliveryStatus) -> DbResult<()> {
        self.session.run(|conn| {
            found(conn.execute(UPDATE_REMINDER_STATUS, params![reminder_id, status.as_str()])?, "EmailReminder", reminder_id)?;
            Ok(())
        })
    }

    pub fn delete(&self, reminder_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "EmailReminders", "reminder_id", SqlValue::Integer(reminder_id), "EmailReminder"))
    }
}
