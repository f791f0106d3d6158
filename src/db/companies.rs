//! The user's own companies and their staff.
//!
//! Exactly one company may be the default; switching happens in one
//! transaction so readers never see zero or two defaults.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, Changes, Conditions, FromRow};
use crate::libs::config::AppConfig;
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const INSERT_COMPANY: &str = "INSERT INTO Companies
    (company_id, company_name, address, payment_info, logo_path, other_info, is_default, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)";
const SELECT_COMPANY_BY_ID: &str = "SELECT * FROM Companies WHERE company_id = ?1";
const SELECT_COMPANIES: &str = "SELECT * FROM Companies ORDER BY company_name";
const SELECT_DEFAULT_COMPANY: &str = "SELECT * FROM Companies WHERE is_default = 1";
const CLEAR_DEFAULT_COMPANY: &str = "UPDATE Companies SET is_default = 0, updated_at = ?1 WHERE is_default = 1 AND company_id != ?2";
const SET_DEFAULT_COMPANY: &str = "UPDATE Companies SET is_default = 1, updated_at = ?1 WHERE company_id = ?2";

const INSERT_PERSONNEL: &str = "INSERT INTO CompanyPersonnel (company_id, name, role, phone, email, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const SELECT_PERSONNEL_BY_ID: &str = "SELECT * FROM CompanyPersonnel WHERE personnel_id = ?1";
const SELECT_PERSONNEL: &str = "SELECT * FROM CompanyPersonnel";

const COMPANY_COLUMNS: &[&str] = &["company_name", "address", "payment_info", "logo_path", "other_info"];
const PERSONNEL_COLUMNS: &[&str] = &["name", "role", "phone", "email"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub company_name: String,
    pub address: Option<String>,
    pub payment_info: Option<String>,
    pub logo_path: Option<String>,
    pub other_info: Option<String>,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Company {
    /// Logo location; relative paths live in the configured logo directory.
    pub fn logo_file(&self, config: &AppConfig) -> Option<PathBuf> {
        let logo = self.logo_path.as_deref().filter(|p| !p.trim().is_empty())?;
        let path = Path::new(logo);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            Some(config.resolved_logo_dir().join(path))
        }
    }
}

impl FromRow for Company {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Company {
            company_id: row.get("company_id")?,
            company_name: row.get("company_name")?,
            address: row.get("address")?,
            payment_info: row.get("payment_info")?,
            logo_path: row.get("logo_path")?,
            other_info: row.get("other_info")?,
            is_default: row.get("is_default")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
    pub company_name: String,
    pub address: Option<String>,
    pub payment_info: Option<String>,
    pub logo_path: Option<String>,
    pub other_info: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    pub personnel_id: i64,
    pub company_id: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: String,
}

impl FromRow for Personnel {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Personnel {
            personnel_id: row.get("personnel_id")?,
            company_id: row.get("company_id")?,
            name: row.get("name")?,
            role: row.get("role")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPersonnel {
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn make_default(conn: &Connection, company_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Companies WHERE company_id = ?1", [company_id])? {
        return Err(DbError::not_found("Company", company_id));
    }
    let now = now_iso();
    // Clear first: the partial unique index allows only one flagged row.
    conn.execute(CLEAR_DEFAULT_COMPANY, params![now, company_id])?;
    conn.execute(SET_DEFAULT_COMPANY, params![now, company_id])?;
    msg_debug!(Message::DefaultChanged("Company", company_id.to_string()));
    Ok(())
}

pub struct Companies<'a> {
    session: Session<'a>,
}

impl<'a> Companies<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, company: &NewCompany) -> DbResult<String> {
        require_text("company_name", &company.company_name)?;
        let company_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_COMPANY,
                params![
                    company_id,
                    company.company_name.trim(),
                    company.address,
                    company.payment_info,
                    company.logo_path,
                    company.other_info,
                    now_iso()
                ],
            )?;
            if company.is_default {
                make_default(conn, &company_id)?;
            }
            Ok(company_id.clone())
        })
    }

    pub fn get(&self, company_id: &str) -> DbResult<Option<Company>> {
        self.session.run(|conn| fetch_one(conn, SELECT_COMPANY_BY_ID, [company_id]))
    }

    pub fn list(&self) -> DbResult<Vec<Company>> {
        self.session.run(|conn| fetch_all(conn, SELECT_COMPANIES, []))
    }

    pub fn get_default(&self) -> DbResult<Option<Company>> {
        self.session.run(|conn| fetch_one(conn, SELECT_DEFAULT_COMPANY, []))
    }

    /// Clears the previous default and flags this one, atomically.
    pub fn set_default(&self, company_id: &str) -> DbResult<()> {
        self.session.run(|conn| make_default(conn, company_id))
    }

    /// The default flag is not a plain column here; use [`Self::set_default`].
    pub fn update(&self, company_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "Companies",
                "company_id",
                SqlValue::Text(company_id.to_string()),
                COMPANY_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "Company", company_id)
        })
    }

    /// Hard delete; personnel go with it.
    pub fn delete(&self, company_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Companies", "company_id", SqlValue::Text(company_id.to_string()), "Company"))
    }
}

pub struct CompanyPersonnel<'a> {
    session: Session<'a>,
}

impl<'a> CompanyPersonnel<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, company_id: &str, person: &NewPersonnel) -> DbResult<i64> {
        require_text("name", &person.name)?;
        require_text("role", &person.role)?;
        self.session.run(|conn| {
            if !exists(conn, "SELECT 1 FROM Companies WHERE company_id = ?1", [company_id])? {
                return Err(DbError::not_found("Company", company_id));
            }
            conn.execute(
                INSERT_PERSONNEL,
                params![company_id, person.name.trim(), person.role.trim(), person.phone, person.email, now_iso()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, personnel_id: i64) -> DbResult<Option<Personnel>> {
        self.session.run(|conn| fetch_one(conn, SELECT_PERSONNEL_BY_ID, [personnel_id]))
    }

    pub fn list_for_company(&self, company_id: &str, role: Option<&str>) -> DbResult<Vec<Personnel>> {
        let mut conditions = Conditions::new();
        conditions.push("company_id = ?", company_id.to_string());
        conditions.push_opt("role = ?", role.map(str::to_string));
        self.session.run(|conn| conditions.query(conn, SELECT_PERSONNEL, " ORDER BY name"))
    }

    pub fn update(&self, personnel_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "CompanyPersonnel",
                "personnel_id",
                SqlValue::Integer(personnel_id),
                PERSONNEL_COLUMNS,
                changes,
                None,
            )?;
            found(affected, "Personnel", personnel_id)
        })
    }

    pub fn delete(&self, personnel_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "CompanyPersonnel", "personnel_id", SqlValue::Integer(personnel_id), "Personnel")
        })
    }
}
