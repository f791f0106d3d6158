//! Generated client documents and cover pages.
//!
//! The store only keeps metadata and paths for documents; rendering happens
//! elsewhere and reads through these repositories.

use super::clients::ensure_client;
use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, user_ref, Changes, Conditions, FromRow};
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

const INSERT_DOCUMENT: &str = "INSERT INTO ClientDocuments
    (document_id, client_id, project_id, document_name, file_name_on_disk, file_path_relative, document_type_generated,
     source_template_id, version_tag, notes, created_by_user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)";
const SELECT_DOCUMENT_BY_ID: &str = "SELECT * FROM ClientDocuments WHERE document_id = ?1";
const SELECT_DOCUMENTS: &str = "SELECT * FROM ClientDocuments";

const INSERT_COVER_TEMPLATE: &str = "INSERT INTO CoverPageTemplates
    (template_id, template_name, description, default_title, default_subtitle, default_author, style_config_json,
     is_default_template, created_by_user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?9)";
const SELECT_COVER_TEMPLATE_BY_ID: &str = "SELECT * FROM CoverPageTemplates WHERE template_id = ?1";
const SELECT_COVER_TEMPLATE_BY_NAME: &str = "SELECT * FROM CoverPageTemplates WHERE template_name = ?1";
const SELECT_COVER_TEMPLATES: &str = "SELECT * FROM CoverPageTemplates ORDER BY template_name";
const SELECT_DEFAULT_COVER_TEMPLATE: &str = "SELECT * FROM CoverPageTemplates WHERE is_default_template = 1";
const CLEAR_DEFAULT_COVER_TEMPLATE: &str = "UPDATE CoverPageTemplates SET is_default_template = 0, updated_at = ?1
    WHERE is_default_template = 1 AND template_id != ?2";
const SET_DEFAULT_COVER_TEMPLATE: &str = "UPDATE CoverPageTemplates SET is_default_template = 1, updated_at = ?1 WHERE template_id = ?2";

const INSERT_COVER_PAGE: &str = "INSERT INTO CoverPages
    (cover_page_id, cover_page_name, client_id, project_id, template_id, title, subtitle, author_text, institution_text,
     department_text, document_type_text, document_version, creation_date, logo_name, logo_data,
     custom_style_config_json, created_by_user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)";
const SELECT_COVER_PAGE_BY_ID: &str = "SELECT * FROM CoverPages WHERE cover_page_id = ?1";
const SELECT_COVER_PAGES: &str = "SELECT * FROM CoverPages";

const DOCUMENT_COLUMNS: &[&str] = &[
    "project_id",
    "document_name",
    "file_name_on_disk",
    "file_path_relative",
    "document_type_generated",
    "source_template_id",
    "version_tag",
    "notes",
];
const COVER_TEMPLATE_COLUMNS: &[&str] = &[
    "template_name",
    "description",
    "default_title",
    "default_subtitle",
    "default_author",
    "style_config_json",
];
const COVER_PAGE_COLUMNS: &[&str] = &[
    "cover_page_name",
    "project_id",
    "template_id",
    "title",
    "subtitle",
    "author_text",
    "institution_text",
    "department_text",
    "document_type_text",
    "document_version",
    "creation_date",
    "logo_name",
    "custom_style_config_json",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDocument {
    pub document_id: String,
    pub client_id: String,
    pub project_id: Option<String>,
    pub document_name: String,
    pub file_name_on_disk: String,
    pub file_path_relative: String,
    pub document_type_generated: Option<String>,
    pub source_template_id: Option<i64>,
    pub version_tag: Option<String>,
    pub notes: Option<String>,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for ClientDocument {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ClientDocument {
            document_id: row.get("document_id")?,
            client_id: row.get("client_id")?,
            project_id: row.get("project_id")?,
            document_name: row.get("document_name")?,
            file_name_on_disk: row.get("file_name_on_disk")?,
            file_path_relative: row.get("file_path_relative")?,
            document_type_generated: row.get("document_type_generated")?,
            source_template_id: row.get("source_template_id")?,
            version_tag: row.get("version_tag")?,
            notes: row.get("notes")?,
            created_by_user_id: row.get("created_by_user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClientDocument {
    pub client_id: String,
    pub project_id: Option<String>,
    pub document_name: String,
    pub file_name_on_disk: String,
    pub file_path_relative: String,
    pub document_type_generated: Option<String>,
    pub source_template_id: Option<i64>,
    pub version_tag: Option<String>,
    pub notes: Option<String>,
    pub created_by_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverPageTemplate {
    pub template_id: String,
    pub template_name: String,
    pub description: Option<String>,
    pub default_title: Option<String>,
    pub default_subtitle: Option<String>,
    pub default_author: Option<String>,
    pub style_config_json: Option<String>,
    pub is_default_template: bool,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for CoverPageTemplate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CoverPageTemplate {
            template_id: row.get("template_id")?,
            template_name: row.get("template_name")?,
            description: row.get("description")?,
            default_title: row.get("default_title")?,
            default_subtitle: row.get("default_subtitle")?,
            default_author: row.get("default_author")?,
            style_config_json: row.get("style_config_json")?,
            is_default_template: row.get("is_default_template")?,
            created_by_user_id: row.get("created_by_user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCoverPageTemplate {
    pub template_name: String,
    pub description: Option<String>,
    pub default_title: Option<String>,
    pub default_subtitle: Option<String>,
    pub default_author: Option<String>,
    pub style_config_json: Option<String>,
    pub is_default: bool,
    pub created_by_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverPage {
    pub cover_page_id: String,
    pub cover_page_name: Option<String>,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub template_id: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_text: Option<String>,
    pub institution_text: Option<String>,
    pub department_text: Option<String>,
    pub document_type_text: Option<String>,
    pub document_version: Option<String>,
    pub creation_date: Option<String>,
    pub logo_name: Option<String>,
    #[serde(skip_serializing)]
    pub logo_data: Option<Vec<u8>>,
    pub custom_style_config_json: Option<String>,
    pub created_by_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for CoverPage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CoverPage {
            cover_page_id: row.get("cover_page_id")?,
            cover_page_name: row.get("cover_page_name")?,
            client_id: row.get("client_id")?,
            project_id: row.get("project_id")?,
            template_id: row.get("template_id")?,
            title: row.get("title")?,
            subtitle: row.get("subtitle")?,
            author_text: row.get("author_text")?,
            institution_text: row.get("institution_text")?,
            department_text: row.get("department_text")?,
            document_type_text: row.get("document_type_text")?,
            document_version: row.get("document_version")?,
            creation_date: row.get("creation_date")?,
            logo_name: row.get("logo_name")?,
            logo_data: row.get("logo_data")?,
            custom_style_config_json: row.get("custom_style_config_json")?,
            created_by_user_id: row.get("created_by_user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCoverPage {
    pub cover_page_name: Option<String>,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    /// Cover page template id; the default template when absent.
    pub template_id: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_text: Option<String>,
    pub institution_text: Option<String>,
    pub department_text: Option<String>,
    pub document_type_text: Option<String>,
    pub document_version: Option<String>,
    pub creation_date: Option<String>,
    pub logo_name: Option<String>,
    pub logo_data: Option<Vec<u8>>,
    pub custom_style_config_json: Option<String>,
    pub created_by_user_id: Option<String>,
}

fn make_default_cover_template(conn: &Connection, template_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM CoverPageTemplates WHERE template_id = ?1", [template_id])? {
        return Err(DbError::not_found("CoverPageTemplate", template_id));
    }
    let now = now_iso();
    conn.execute(CLEAR_DEFAULT_COVER_TEMPLATE, params![now, template_id])?;
    conn.execute(SET_DEFAULT_COVER_TEMPLATE, params![now, template_id])?;
    msg_debug!(Message::DefaultChanged("CoverPageTemplate", template_id.to_string()));
    Ok(())
}

pub struct ClientDocuments<'a> {
    session: Session<'a>,
}

impl<'a> ClientDocuments<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, document: &NewClientDocument) -> DbResult<String> {
        require_text("document_name", &document.document_name)?;
        require_text("file_name_on_disk", &document.file_name_on_disk)?;
        require_text("file_path_relative", &document.file_path_relative)?;
        let document_id = new_id();
        self.session.run(|conn| {
            ensure_client(conn, &document.client_id)?;
            conn.execute(
                INSERT_DOCUMENT,
                params![
                    document_id,
                    document.client_id,
                    document.project_id,
                    document.document_name.trim(),
                    document.file_name_on_disk,
                    document.file_path_relative,
                    document.document_type_generated,
                    document.source_template_id,
                    document.version_tag,
                    document.notes,
                    user_ref(document.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )?;
            Ok(document_id.clone())
        })
    }

    pub fn get(&self, document_id: &str) -> DbResult<Option<ClientDocument>> {
        self.session.run(|conn| fetch_one(conn, SELECT_DOCUMENT_BY_ID, [document_id]))
    }

    /// Newest first; `document_type` narrows to one generated type.
    pub fn list_for_client(&self, client_id: &str, document_type: Option<&str>) -> DbResult<Vec<ClientDocument>> {
        let mut conditions = Conditions::new();
        conditions
            .push("client_id = ?", client_id.to_string())
            .push_opt("document_type_generated = ?", document_type.map(str::to_string));
        self.session.run(|conn| conditions.query(conn, SELECT_DOCUMENTS, " ORDER BY created_at DESC"))
    }

    pub fn update(&self, document_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "ClientDocuments",
                "document_id",
                SqlValue::Text(document_id.to_string()),
                DOCUMENT_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "ClientDocument", document_id)
        })
    }

    pub fn delete(&self, document_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "ClientDocuments", "document_id", SqlValue::Text(document_id.to_string()), "ClientDocument")
        })
    }
}

pub struct CoverPageTemplates<'a> {
    session: Session<'a>,
}

impl<'a> CoverPageTemplates<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, template: &NewCoverPageTemplate) -> DbResult<String> {
        require_text("template_name", &template.template_name)?;
        let template_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_COVER_TEMPLATE,
                params![
                    template_id,
                    template.template_name.trim(),
                    template.description,
                    template.default_title,
                    template.default_subtitle,
                    template.default_author,
                    template.style_config_json,
                    user_ref(template.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("CoverPageTemplate"))?;
            if template.is_default {
                make_default_cover_template(conn, &template_id)?;
            }
            Ok(template_id.clone())
        })
    }

    pub fn get(&self, template_id: &str) -> DbResult<Option<CoverPageTemplate>> {
        self.session.run(|conn| fetch_one(conn, SELECT_COVER_TEMPLATE_BY_ID, [template_id]))
    }

    pub fn get_by_name(&self, template_name: &str) -> DbResult<Option<CoverPageTemplate>> {
        self.session.run(|conn| fetch_one(conn, SELECT_COVER_TEMPLATE_BY_NAME, [template_name.trim()]))
    }

    pub fn list(&self) -> DbResult<Vec<CoverPageTemplate>> {
        self.session.run(|conn| fetch_all(conn, SELECT_COVER_TEMPLATES, []))
    }

    pub fn get_default(&self) -> DbResult<Option<CoverPageTemplate>> {
        self.session.run(|conn| fetch_one(conn, SELECT_DEFAULT_COVER_TEMPLATE, []))
    }

    pub fn set_default(&self, template_id: &str) -> DbResult<()> {
        self.session.run(|conn| make_default_cover_template(conn, template_id))
    }

    pub fn update(&self, template_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "CoverPageTemplates",
                "template_id",
                SqlValue::Text(template_id.to_string()),
                COVER_TEMPLATE_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("CoverPageTemplate"))?;
            found(affected, "CoverPageTemplate", template_id)
        })
    }

    /// Cover pages built from it keep their content and lose the reference.
    pub fn delete(&self, template_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "CoverPageTemplates", "template_id", SqlValue::Text(template_id.to_string()), "CoverPageTemplate")
        })
    }
}

pub struct CoverPages<'a> {
    session: Session<'a>,
}

impl<'a> CoverPages<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, page: &NewCoverPage) -> DbResult<String> {
        require_text("title", &page.title)?;
        let cover_page_id = new_id();
        self.session.run(|conn| {
            if let Some(client_id) = page.client_id.as_deref() {
                ensure_client(conn, client_id)?;
            }
            let template_id = match page.template_id.as_deref() {
                Some(id) => Some(id.to_string()),
                None => Session::within(conn).cover_page_templates().get_default()?.map(|t| t.template_id),
            };
            conn.execute(
                INSERT_COVER_PAGE,
                params![
                    cover_page_id,
                    page.cover_page_name,
                    page.client_id,
                    page.project_id,
                    template_id,
                    page.title.trim(),
                    page.subtitle,
                    page.author_text,
                    page.institution_text,
                    page.department_text,
                    page.document_type_text,
                    page.document_version,
                    page.creation_date,
                    page.logo_name,
                    page.logo_data,
                    page.custom_style_config_json,
                    user_ref(page.created_by_user_id.as_deref()),
                    now_iso()
                ],
            )?;
            Ok(cover_page_id.clone())
        })
    }

    pub fn get(&self, cover_page_id: &str) -> DbResult<Option<CoverPage>> {
        self.session.run(|conn| fetch_one(conn, SELECT_COVER_PAGE_BY_ID, [cover_page_id]))
    }

    pub fn list_for_client(&self, client_id: &str) -> DbResult<Vec<CoverPage>> {
        let mut conditions = Conditions::new();
        conditions.push("client_id = ?", client_id.to_string());
        self.session.run(|conn| conditions.query(conn, SELECT_COVER_PAGES, " ORDER BY created_at DESC"))
    }

    /// Logo bytes are replaced with [`Self::set_logo`], not through `changes`.
    pub fn update(&self, cover_page_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "CoverPages",
                "cover_page_id",
                SqlValue::Text(cover_page_id.to_string()),
                COVER_PAGE_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "CoverPage", cover_page_id)
        })
    }

    pub fn set_logo(&self, cover_page_id: &str, logo_name: Option<&str>, logo_data: Option<&[u8]>) -> DbResult<()> {
        self.session.run(|conn| {
            let affected = conn.execute(
                "UPDATE CoverPages SET logo_name = ?2, logo_data = ?3, updated_at = ?4 WHERE cover_page_id = ?1",
                params![cover_page_id, logo_name, logo_data, now_iso()],
            )?;
            found(affected, "CoverPage", cover_page_id)?;
            Ok(())
        })
    }

    pub fn delete(&self, cover_page_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "CoverPages", "cover_page_id", SqlValue::Text(cover_page_id.to_string()), "CoverPage"))
    }
}
