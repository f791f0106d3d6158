//! Business partners (suppliers, agents, service providers), their
//! contacts, categories and interaction history.

use super::contacts::{ensure_contact, Contact};
use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    exists, fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, Changes, Conditions, FromRow, Page, Resolved,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const INSERT_PARTNER: &str = "INSERT INTO Partners
    (partner_id, partner_name, email, phone, address, location, website_url, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_PARTNER_BY_ID: &str = "SELECT * FROM Partners WHERE partner_id = ?1";
const SELECT_PARTNERS: &str = "SELECT * FROM Partners";

const INSERT_PARTNER_CONTACT: &str = "INSERT INTO PartnerContacts (partner_id, contact_id, role_in_partner, created_at)
    VALUES (?1, ?2, ?3, ?4)";
const SELECT_PARTNER_CONTACT_ID: &str = "SELECT partner_contact_id FROM PartnerContacts WHERE partner_id = ?1 AND contact_id = ?2";
const UPDATE_PARTNER_CONTACT_ROLE: &str = "UPDATE PartnerContacts SET role_in_partner = ?3 WHERE partner_id = ?1 AND contact_id = ?2";
const DELETE_PARTNER_CONTACT: &str = "DELETE FROM PartnerContacts WHERE partner_id = ?1 AND contact_id = ?2";
const SELECT_CONTACTS_FOR_PARTNER: &str = "SELECT c.*, pc.partner_contact_id, pc.role_in_partner
    FROM Contacts c
    JOIN PartnerContacts pc ON pc.contact_id = c.contact_id
    WHERE pc.partner_id = ?1
    ORDER BY c.name";

const INSERT_CATEGORY: &str = "INSERT INTO PartnerCategories (category_name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)";
const SELECT_CATEGORY_ID_BY_NAME: &str = "SELECT partner_category_id FROM PartnerCategories WHERE category_name = ?1";
const SELECT_CATEGORY_BY_ID: &str = "SELECT * FROM PartnerCategories WHERE partner_category_id = ?1";
const SELECT_CATEGORY_BY_NAME: &str = "SELECT * FROM PartnerCategories WHERE category_name = ?1";
const SELECT_CATEGORIES: &str = "SELECT * FROM PartnerCategories ORDER BY category_name";

const INSERT_CATEGORY_LINK: &str = "INSERT OR IGNORE INTO PartnerCategoryLink (partner_id, partner_category_id) VALUES (?1, ?2)";
const DELETE_CATEGORY_LINK: &str = "DELETE FROM PartnerCategoryLink WHERE partner_id = ?1 AND partner_category_id = ?2";
const SELECT_CATEGORIES_FOR_PARTNER: &str = "SELECT pc.* FROM PartnerCategories pc
    JOIN PartnerCategoryLink l ON l.partner_category_id = pc.partner_category_id
    WHERE l.partner_id = ?1
    ORDER BY pc.category_name";
const SELECT_PARTNERS_IN_CATEGORY: &str = "SELECT p.* FROM Partners p
    JOIN PartnerCategoryLink l ON l.partner_id = p.partner_id
    WHERE l.partner_category_id = ?1
    ORDER BY p.partner_name";

const INSERT_INTERACTION: &str = "INSERT INTO PartnerInteractions
    (partner_id, interaction_date, interaction_type, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?5)";
const SELECT_INTERACTION_BY_ID: &str = "SELECT * FROM PartnerInteractions WHERE interaction_id = ?1";
const SELECT_INTERACTIONS_FOR_PARTNER: &str = "SELECT * FROM PartnerInteractions WHERE partner_id = ?1
    ORDER BY interaction_date DESC, interaction_id DESC";

const PARTNER_COLUMNS: &[&str] = &["partner_name", "email", "phone", "address", "location", "website_url", "notes"];
const CATEGORY_COLUMNS: &[&str] = &["category_name", "description"];
const INTERACTION_COLUMNS: &[&str] = &["interaction_date", "interaction_type", "notes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub partner_id: String,
    pub partner_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Partner {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Partner {
            partner_id: row.get("partner_id")?,
            partner_name: row.get("partner_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            address: row.get("address")?,
            location: row.get("location")?,
            website_url: row.get("website_url")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPartner {
    pub partner_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerContact {
    pub partner_contact_id: i64,
    pub role_in_partner: Option<String>,
    #[serde(flatten)]
    pub contact: Contact,
}

impl FromRow for PartnerContact {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PartnerContact {
            partner_contact_id: row.get("partner_contact_id")?,
            role_in_partner: row.get("role_in_partner")?,
            contact: Contact::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerCategory {
    pub partner_category_id: i64,
    pub category_name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for PartnerCategory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PartnerCategory {
            partner_category_id: row.get("partner_category_id")?,
            category_name: row.get("category_name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerInteraction {
    pub interaction_id: i64,
    pub partner_id: String,
    pub interaction_date: String,
    pub interaction_type: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for PartnerInteraction {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PartnerInteraction {
            interaction_id: row.get("interaction_id")?,
            partner_id: row.get("partner_id")?,
            interaction_date: row.get("interaction_date")?,
            interaction_type: row.get("interaction_type")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn ensure_partner(conn: &Connection, partner_id: &str) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Partners WHERE partner_id = ?1", [partner_id])? {
        return Err(DbError::not_found("Partner", partner_id));
    }
    Ok(())
}

fn ensure_category(conn: &Connection, category_id: i64) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM PartnerCategories WHERE partner_category_id = ?1", [category_id])? {
        return Err(DbError::not_found("PartnerCategory", category_id));
    }
    Ok(())
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

pub struct Partners<'a> {
    session: Session<'a>,
}

impl<'a> Partners<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, partner: &NewPartner) -> DbResult<String> {
        require_text("partner_name", &partner.partner_name)?;
        let partner_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_PARTNER,
                params![
                    partner_id,
                    partner.partner_name.trim(),
                    partner.email,
                    partner.phone,
                    partner.address,
                    partner.location,
                    partner.website_url,
                    partner.notes,
                    now_iso()
                ],
            )?;
            Ok(partner_id.clone())
        })
    }

    pub fn get(&self, partner_id: &str) -> DbResult<Option<Partner>> {
        self.session.run(|conn| fetch_one(conn, SELECT_PARTNER_BY_ID, [partner_id]))
    }

    /// `search` matches the partner name or location.
    pub fn list(&self, search: Option<&str>, page: Page) -> DbResult<Vec<Partner>> {
        let mut conditions = Conditions::new();
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            conditions.push("(partner_name || ' ' || COALESCE(location, '')) LIKE ?", format!("%{}%", term));
        }
        let tail = format!(" ORDER BY partner_name, partner_id{}", page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_PARTNERS, &tail))
    }

    pub fn update(&self, partner_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "Partners",
                "partner_id",
                SqlValue::Text(partner_id.to_string()),
                PARTNER_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "Partner", partner_id)
        })
    }

    /// Contacts, category links and interactions go with the partner.
    pub fn delete(&self, partner_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Partners", "partner_id", SqlValue::Text(partner_id.to_string()), "Partner"))
    }

    /// Linking twice is a no-op.
    pub fn link_category(&self, partner_id: &str, category_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            ensure_partner(conn, partner_id)?;
            ensure_category(conn, category_id)?;
            conn.execute(INSERT_CATEGORY_LINK, params![partner_id, category_id])?;
            Ok(())
        })
    }

    pub fn unlink_category(&self, partner_id: &str, category_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            found(conn.execute(DELETE_CATEGORY_LINK, params![partner_id, category_id])?, "PartnerCategoryLink", category_id)?;
            Ok(())
        })
    }

    pub fn categories_for_partner(&self, partner_id: &str) -> DbResult<Vec<PartnerCategory>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CATEGORIES_FOR_PARTNER, [partner_id]))
    }

    pub fn partners_in_category(&self, category_id: i64) -> DbResult<Vec<Partner>> {
        self.session.run(|conn| fetch_all(conn, SELECT_PARTNERS_IN_CATEGORY, [category_id]))
    }
}

pub struct PartnerContacts<'a> {
    session: Session<'a>,
}

impl<'a> PartnerContacts<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, partner_id: &str, contact_id: i64, role_in_partner: Option<&str>) -> DbResult<i64> {
        self.session.run(|conn| {
            ensure_partner(conn, partner_id)?;
            ensure_contact(conn, contact_id)?;
            let existing: Option<i64> = conn
                .query_row(SELECT_PARTNER_CONTACT_ID, params![partner_id, contact_id], |row| row.get(0))
                .optional()?;
            if let Some(existing_id) = existing {
                return Err(DbError::conflict_with(
                    "PartnerContact",
                    format!("contact {} is already linked to partner {}", contact_id, partner_id),
                    existing_id,
                ));
            }
            conn.execute(INSERT_PARTNER_CONTACT, params![partner_id, contact_id, role_in_partner, now_iso()])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_for_partner(&self, partner_id: &str) -> DbResult<Vec<PartnerContact>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CONTACTS_FOR_PARTNER, [partner_id]))
    }

    pub fn set_role(&self, partner_id: &str, contact_id: i64, role_in_partner: Option<&str>) -> DbResult<()> {
        self.session.run(|conn| {
            let affected = conn.execute(UPDATE_PARTNER_CONTACT_ROLE, params![partner_id, contact_id, role_in_partner])?;
            found(affected, "PartnerContact", contact_id)?;
            Ok(())
        })
    }

    pub fn remove(&self, partner_id: &str, contact_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            found(conn.execute(DELETE_PARTNER_CONTACT, params![partner_id, contact_id])?, "PartnerContact", contact_id)?;
            Ok(())
        })
    }
}

pub struct PartnerCategories<'a> {
    session: Session<'a>,
}

impl<'a> PartnerCategories<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Adding an existing name returns its id.
    pub fn add(&self, name: &str, description: Option<&str>) -> DbResult<i64> {
        Ok(self.get_or_add(name, description)?.id)
    }

    pub fn get_or_add(&self, name: &str, description: Option<&str>) -> DbResult<Resolved<i64>> {
        require_text("category_name", name)?;
        self.session.run(|conn| resolve_category(conn, name, description))
    }

    pub fn get(&self, category_id: i64) -> DbResult<Option<PartnerCategory>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CATEGORY_BY_ID, [category_id]))
    }

    pub fn get_by_name(&self, name: &str) -> DbResult<Option<PartnerCategory>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CATEGORY_BY_NAME, [name.trim()]))
    }

    pub fn list(&self) -> DbResult<Vec<PartnerCategory>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CATEGORIES, []))
    }

    pub fn update(&self, category_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "PartnerCategories",
                "partner_category_id",
                SqlValue::Integer(category_id),
                CATEGORY_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("PartnerCategory"))?;
            found(affected, "PartnerCategory", category_id)
        })
    }

    pub fn delete(&self, category_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "PartnerCategories",
                "partner_category_id",
                SqlValue::Integer(category_id),
                "PartnerCategory",
            )
        })
    }
}

pub struct PartnerInteractions<'a> {
    session: Session<'a>,
}

impl<'a> PartnerInteractions<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, partner_id: &str, interaction_date: &str, interaction_type: &str, notes: Option<&str>) -> DbResult<i64> {
        require_text("interaction_date", interaction_date)?;
        require_text("interaction_type", interaction_type)?;
        self.session.run(|conn| {
            ensure_partner(conn, partner_id)?;
            conn.execute(
                INSERT_INTERACTION,
                params![partner_id, interaction_date, interaction_type.trim(), notes, now_iso()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, interaction_id: i64) -> DbResult<Option<PartnerInteraction>> {
        self.session.run(|conn| fetch_one(conn, SELECT_INTERACTION_BY_ID, [interaction_id]))
    }

    /// Most recent first.
    pub fn list_for_partner(&self, partner_id: &str) -> DbResult<Vec<PartnerInteraction>> {
        self.session.run(|conn| fetch_all(conn, SELECT_INTERACTIONS_FOR_PARTNER, [partner_id]))
    }

    pub fn update(&self, interaction_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "PartnerInteractions",
                "interaction_id",
                SqlValue::Integer(interaction_id),
                INTERACTION_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "PartnerInteraction", interaction_id)
        })
    }

    pub fn delete(&self, interaction_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "PartnerInteractions",
                "interaction_id",
                SqlValue::Integer(interaction_id),
                "PartnerInteraction",
            )
        })
    }
}
