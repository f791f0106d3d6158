//! Document and email templates, grouped by category.
//!
//! At most one template per `(template_type, language_code)` carries the
//! default flag; a partial unique index enforces it and
//! [`Templates::set_default`] moves the flag inside one transaction.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::products::DEFAULT_LANGUAGE_CODE;
use super::rows::{
    exists, fetch_all, fetch_one, found, hard_delete, now_iso, require_text, update_row, user_ref, Changes, Conditions, FromRow, Resolved,
};
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Category given to templates that name none.
pub const DEFAULT_TEMPLATE_CATEGORY: &str = "General";

const INSERT_CATEGORY: &str = "INSERT INTO TemplateCategories (category_name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)";
const SELECT_CATEGORY_BY_ID: &str = "SELECT * FROM TemplateCategories WHERE category_id = ?1";
const SELECT_CATEGORY_ID_BY_NAME: &str = "SELECT category_id FROM TemplateCategories WHERE category_name = ?1";
const SELECT_CATEGORY_BY_NAME: &str = "SELECT * FROM TemplateCategories WHERE category_name = ?1";
const SELECT_CATEGORIES: &str = "SELECT * FROM TemplateCategories ORDER BY category_name";

const INSERT_TEMPLATE: &str = "INSERT INTO Templates
    (template_name, template_type, description, base_file_name, language_code, is_default_for_type_lang, category_id,
     content_definition, email_subject_template, email_variables_info, cover_page_config_json,
     document_mapping_config_json, raw_template_file_data, version, created_by_user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)";
const SELECT_TEMPLATE_BY_ID: &str = "SELECT * FROM Templates WHERE template_id = ?1";
const SELECT_TEMPLATES: &str = "SELECT * FROM Templates";
const SELECT_DEFAULT_TEMPLATE: &str = "SELECT * FROM Templates
    WHERE template_type = ?1 AND language_code = ?2 AND is_default_for_type_lang = 1";
const SELECT_TEMPLATE_SCOPE: &str = "SELECT template_type, language_code FROM Templates WHERE template_id = ?1";
const CLEAR_DEFAULT_TEMPLATE: &str = "UPDATE Templates SET is_default_for_type_lang = 0, updated_at = ?1
    WHERE template_type = ?2 AND language_code = ?3 AND is_default_for_type_lang = 1 AND template_id != ?4";
const SET_DEFAULT_TEMPLATE: &str = "UPDATE Templates SET is_default_for_type_lang = 1, updated_at = ?1 WHERE template_id = ?2";
const SELECT_LANGUAGES: &str = "SELECT DISTINCT language_code FROM Templates ORDER BY language_code";

const CATEGORY_COLUMNS: &[&str] = &["category_name", "description"];
const TEMPLATE_COLUMNS: &[&str] = &[
    "template_name",
    "description",
    "base_file_name",
    "category_id",
    "content_definition",
    "email_subject_template",
    "email_variables_info",
    "cover_page_config_json",
    "document_mapping_config_json",
    "version",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCategory {
    pub category_id: i64,
    pub category_name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for TemplateCategory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TemplateCategory {
            category_id: row.get("category_id")?,
            category_name: row.get("category_name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub template_id: i64,
    pub template_name: String,
    pub template_type: String,
    pub description: Option<String>,
    pub base_file_name: Option<String>,
    pub language_code: String,
    pub is_default_for_type_lang: bool,
    pub category_id: Option<i64>,
    pub content_definition: Option<String>,
    pub email_subject_template: Option<String>,
    pub email_variables_info: Option<String>,
    pub cover_page_config_json: Option<String>,
    pub document_mapping_config_json: Option<String>,
    #[serde(skip_serializing)]
    pub raw_template_file_data: Option<Vec<u8>>,
    pub version: String,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Template {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Template {
            template_id: row.get("template_id")?,
            template_name: row.get("template_name")?,
            template_type: row.get("template_type")?,
            description: row.get("description")?,
            base_file_name: row.get("base_file_name")?,
            language_code: row.get("language_code")?,
            is_default_for_type_lang: row.get("is_default_for_type_lang")?,
            category_id: row.get("category_id")?,
            content_definition: row.get("content_definition")?,
            email_subject_template: row.get("email_subject_template")?,
            email_variables_info: row.get("email_variables_info")?,
            cover_page_config_json: row.get("cover_page_config_json")?,
            document_mapping_config_json: row.get("document_mapping_config_json")?,
            raw_template_file_data: row.get("raw_template_file_data")?,
            version: row.get("version")?,
            created_by_user_id: row.get("created_by_user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub template_name: String,
    pub template_type: String,
    pub description: Option<String>,
    pub base_file_name: Option<String>,
    pub language_code: String,
    pub is_default: bool,
    /// Resolved to a category id; [`DEFAULT_TEMPLATE_CATEGORY`] when absent.
    pub category_name: Option<String>,
    pub content_definition: Option<String>,
    pub email_subject_template: Option<String>,
    pub email_variables_info: Option<String>,
    pub cover_page_config_json: Option<String>,
    pub document_mapping_config_json: Option<String>,
    pub raw_template_file_data: Option<Vec<u8>>,
    pub version: String,
    pub created_by_user_id: Option<String>,
}

impl Default for NewTemplate {
    fn default() -> Self {
        NewTemplate {
            template_name: String::new(),
            template_type: String::new(),
            description: None,
            base_file_name: None,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            is_default: false,
            category_name: None,
            content_definition: None,
            email_subject_template: None,
            email_variables_info: None,
            cover_page_config_json: None,
            document_mapping_config_json: None,
            raw_template_file_data: None,
            version: "1.0".to_string(),
            created_by_user_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateFilter {
    pub template_type: Option<String>,
    pub language_code: Option<String>,
    pub category_id: Option<i64>,
}

fn resolve_category(conn: &Connection, name: &str, description: Option<&str>) -> DbResult<Resolved<i64>> {
    let name = name.trim();
    let existing: Option<i64> = conn.query_row(SELECT_CATEGORY_ID_BY_NAME, [name], |row| row.get(0)).optional()?;
    if let Some(category_id) = existing {
        return Ok(Resolved::existing(category_id));
    }
    conn.execute(INSERT_CATEGORY, params![name, description, now_iso()])?;
    Ok(Resolved::created(conn.last_insert_rowid()))
}

fn make_default(conn: &Connection, template_id: i64) -> DbResult<()> {
    let scope: Option<(String, String)> = conn
        .query_row(SELECT_TEMPLATE_SCOPE, [template_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    let Some((template_type, language_code)) = scope else {
        return Err(DbError::not_found("Template", template_id));
    };
    let now = now_iso();
    conn.execute(CLEAR_DEFAULT_TEMPLATE, params![now, template_type, language_code, template_id])?;
    conn.execute(SET_DEFAULT_TEMPLATE, params![now, template_id])?;
    msg_debug!(Message::DefaultChanged("Template", template_id.to_string()));
    Ok(())
}

pub struct TemplateCategories<'a> {
    session: Session<'a>,
}

impl<'a> TemplateCategories<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Idempotent: an existing name resolves to its id.
    pub fn add(&self, name: &str, description: Option<&str>) -> DbResult<Resolved<i64>> {
        self.get_or_add(name, description)
    }

    pub fn get_or_add(&self, name: &str, description: Option<&str>) -> DbResult<Resolved<i64>> {
        require_text("category_name", name)?;
        self.session.run(|conn| resolve_category(conn, name, description))
    }

    pub fn get(&self, category_id: i64) -> DbResult<Option<TemplateCategory>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CATEGORY_BY_ID, [category_id]))
    }

    pub fn get_by_name(&self, name: &str) -> DbResult<Option<TemplateCategory>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CATEGORY_BY_NAME, [name.trim()]))
    }

    pub fn list(&self) -> DbResult<Vec<TemplateCategory>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CATEGORIES, []))
    }

    pub fn update(&self, category_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "TemplateCategories",
                "category_id",
                SqlValue::Integer(category_id),
                CATEGORY_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("TemplateCategory"))?;
            found(affected, "TemplateCategory", category_id)
        })
    }

    /// Templates in the category keep existing with no category.
    pub fn delete(&self, category_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "TemplateCategories", "category_id", SqlValue::Integer(category_id), "TemplateCategory")
        })
    }
}

pub struct Templates<'a> {
    session: Session<'a>,
}

impl<'a> Templates<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, template: &NewTemplate) -> DbResult<i64> {
        require_text("template_name", &template.template_name)?;
        require_text("template_type", &template.template_type)?;
        require_text("language_code", &template.language_code)?;

        self.session.run(|conn| {
            let category = template
                .category_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_TEMPLATE_CATEGORY);
            let category_id = resolve_category(conn, category, None)?.id;

            conn.execute(
                INSERT_TEMPLATE,
                params![
                    template.template_name.trim(),
                    template.template_type.trim(),
                    template.description,
                    template.base_file_name,
                    template.language_code.trim(),
                    category_id,
                    template.content_definition,
                    template.email_subject_template,
                    template.email_variables_info,
                    template.cover_page_config_json,
                    template.document_mapping_config_json,
                    template.raw_template_file_data,
                    template.version,
                    user_ref(template.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("Template"))?;
            let template_id = conn.last_insert_rowid();
            if template.is_default {
                make_default(conn, template_id)?;
            }
            Ok(template_id)
        })
    }

    pub fn get(&self, template_id: i64) -> DbResult<Option<Template>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TEMPLATE_BY_ID, [template_id]))
    }

    pub fn list(&self, filter: &TemplateFilter) -> DbResult<Vec<Template>> {
        let mut conditions = Conditions::new();
        conditions
            .push_opt("template_type = ?", filter.template_type.clone())
            .push_opt("language_code = ?", filter.language_code.clone())
            .push_opt("category_id = ?", filter.category_id);
        self.session.run(|conn| {
            conditions.query(conn, SELECT_TEMPLATES, " ORDER BY template_type, language_code, template_name, version")
        })
    }

    /// Moves the default flag to this template within its type and language.
    pub fn set_default(&self, template_id: i64) -> DbResult<()> {
        self.session.run(|conn| make_default(conn, template_id))
    }

    pub fn get_default_for(&self, template_type: &str, language_code: &str) -> DbResult<Option<Template>> {
        self.session
            .run(|conn| fetch_one(conn, SELECT_DEFAULT_TEMPLATE, params![template_type, language_code]))
    }

    pub fn distinct_languages(&self) -> DbResult<Vec<String>> {
        self.session.run(|conn| {
            let mut stmt = conn.prepare(SELECT_LANGUAGES)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut languages = Vec::new();
            for language in rows {
                languages.push(language?);
            }
            Ok(languages)
        })
    }

    /// Type, language and default flag are not editable here.
    pub fn update(&self, template_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            if let Some(category_id) = changes.get("category_id").and_then(|v| v.as_i64()) {
                if !exists(conn, "SELECT 1 FROM TemplateCategories WHERE category_id = ?1", [category_id])? {
                    return Err(DbError::not_found("TemplateCategory", category_id));
                }
            }
            let affected = update_row(
                conn,
                "Templates",
                "template_id",
                SqlValue::Integer(template_id),
                TEMPLATE_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("Template"))?;
            found(affected, "Template", template_id)
        })
    }

    pub fn delete(&self, template_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Templates", "template_id", SqlValue::Integer(template_id), "Template"))
    }
}
