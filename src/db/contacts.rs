//! Address book: contacts, their links to clients, and mailing lists.

use super::clients::{ensure_client, Client};
use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    exists, fetch_all, fetch_one, found, hard_delete, now_iso, require_text, update_row, Changes, Conditions, FromRow, Page, Resolved,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const INSERT_CONTACT: &str = "INSERT INTO Contacts
    (name, given_name, family_name, email, phone, position, company_name, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_CONTACT_BY_ID: &str = "SELECT * FROM Contacts WHERE contact_id = ?1";
const SELECT_CONTACT_BY_EMAIL: &str = "SELECT * FROM Contacts WHERE email = ?1 ORDER BY contact_id LIMIT 1";
const SELECT_CONTACTS: &str = "SELECT * FROM Contacts";

const INSERT_CLIENT_CONTACT: &str = "INSERT INTO ClientContacts (client_id, contact_id, is_primary_for_client, can_receive_documents)
    VALUES (?1, ?2, ?3, ?4)";
const SELECT_CLIENT_CONTACT_ID: &str = "SELECT client_contact_id FROM ClientContacts WHERE client_id = ?1 AND contact_id = ?2";
const SELECT_LINK_CLIENT: &str = "SELECT client_id FROM ClientContacts WHERE client_contact_id = ?1";
const CLEAR_PRIMARY_CONTACT: &str = "UPDATE ClientContacts SET is_primary_for_client = 0
    WHERE client_id = ?1 AND client_contact_id != ?2";
const DELETE_CLIENT_CONTACT: &str = "DELETE FROM ClientContacts WHERE client_id = ?1 AND contact_id = ?2";
const SELECT_CONTACTS_FOR_CLIENT: &str = "SELECT c.*, cc.client_contact_id, cc.is_primary_for_client, cc.can_receive_documents
    FROM Contacts c
    JOIN ClientContacts cc ON cc.contact_id = c.contact_id
    WHERE cc.client_id = ?1
    ORDER BY cc.is_primary_for_client DESC, c.name";
const SELECT_CLIENTS_FOR_CONTACT: &str = "SELECT cl.* FROM Clients cl
    JOIN ClientContacts cc ON cc.client_id = cl.client_id
    WHERE cc.contact_id = ?1 AND cl.is_deleted = 0
    ORDER BY cl.client_name";

const INSERT_LIST: &str = "INSERT INTO ContactLists (list_name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)";
const SELECT_LIST_BY_ID: &str = "SELECT * FROM ContactLists WHERE list_id = ?1";
const SELECT_LISTS: &str = "SELECT * FROM ContactLists ORDER BY list_name";
const INSERT_LIST_MEMBER: &str = "INSERT INTO ContactListMembers (list_id, contact_id, added_at) VALUES (?1, ?2, ?3)";
const SELECT_LIST_MEMBER_ID: &str = "SELECT list_member_id FROM ContactListMembers WHERE list_id = ?1 AND contact_id = ?2";
const DELETE_LIST_MEMBER: &str = "DELETE FROM ContactListMembers WHERE list_id = ?1 AND contact_id = ?2";
const SELECT_LIST_MEMBERS: &str = "SELECT c.* FROM Contacts c
    JOIN ContactListMembers m ON m.contact_id = c.contact_id
    WHERE m.list_id = ?1
    ORDER BY m.added_at, c.name";

const CONTACT_COLUMNS: &[&str] = &["name", "given_name", "family_name", "email", "phone", "position", "company_name", "notes"];
const CLIENT_CONTACT_COLUMNS: &[&str] = &["is_primary_for_client", "can_receive_documents"];
const LIST_COLUMNS: &[&str] = &["list_name", "description"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: i64,
    pub name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Contact {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Contact {
            contact_id: row.get("contact_id")?,
            name: row.get("name")?,
            given_name: row.get("given_name")?,
            family_name: row.get("family_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            position: row.get("position")?,
            company_name: row.get("company_name")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
}

/// A contact as seen from one client, with the link flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientContact {
    pub client_contact_id: i64,
    pub is_primary_for_client: bool,
    pub can_receive_documents: bool,
    #[serde(flatten)]
    pub contact: Contact,
}

impl FromRow for ClientContact {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ClientContact {
            client_contact_id: row.get("client_contact_id")?,
            is_primary_for_client: row.get("is_primary_for_client")?,
            can_receive_documents: row.get("can_receive_documents")?,
            contact: Contact::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactList {
    pub list_id: i64,
    pub list_name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for ContactList {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ContactList {
            list_id: row.get("list_id")?,
            list_name: row.get("list_name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub(crate) fn ensure_contact(conn: &Connection, contact_id: i64) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Contacts WHERE contact_id = ?1", [contact_id])? {
        return Err(DbError::not_found("Contact", contact_id));
    }
    Ok(())
}

pub struct Contacts<'a> {
    session: Session<'a>,
}

impl<'a> Contacts<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, contact: &NewContact) -> DbResult<i64> {
        require_text("name", &contact.name)?;
        self.session.run(|conn| {
            conn.execute(
                INSERT_CONTACT,
                params![
                    contact.name.trim(),
                    contact.given_name,
                    contact.family_name,
                    contact.email.as_deref().map(str::trim),
                    contact.phone,
                    contact.position,
                    contact.company_name,
                    contact.notes,
                    now_iso()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, contact_id: i64) -> DbResult<Option<Contact>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CONTACT_BY_ID, [contact_id]))
    }

    pub fn get_by_email(&self, email: &str) -> DbResult<Option<Contact>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CONTACT_BY_EMAIL, [email.trim()]))
    }

    /// `search` matches name, email or company, case-insensitively.
    pub fn list(&self, search: Option<&str>, page: Page) -> DbResult<Vec<Contact>> {
        let mut conditions = Conditions::new();
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            conditions.push(
                "(name || ' ' || COALESCE(email, '') || ' ' || COALESCE(company_name, '')) LIKE ?",
                format!("%{}%", term),
            );
        }
        let tail = format!(" ORDER BY name, contact_id{}", page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_CONTACTS, &tail))
    }

    pub fn update(&self, contact_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(conn, "Contacts", "contact_id", SqlValue::Integer(contact_id), CONTACT_COLUMNS, changes, Some("updated_at"))?;
            found(affected, "Contact", contact_id)
        })
    }

    /// Also removes the contact from clients, partners and lists.
    pub fn delete(&self, contact_id: i64) -> DbResult<()> {
        self.session.run(|conn| hard_delete(conn, "Contacts", "contact_id", SqlValue::Integer(contact_id), "Contact"))
    }
}

pub struct ClientContacts<'a> {
    session: Session<'a>,
}

impl<'a> ClientContacts<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// A client has at most one primary contact; flagging a new one clears the old.
    pub fn link(&self, client_id: &str, contact_id: i64, is_primary: bool, can_receive_documents: bool) -> DbResult<i64> {
        self.session.run(|conn| {
            ensure_client(conn, client_id)?;
            ensure_contact(conn, contact_id)?;
            let existing: Option<i64> = conn
                .query_row(SELECT_CLIENT_CONTACT_ID, params![client_id, contact_id], |row| row.get(0))
                .optional()?;
            if let Some(existing_id) = existing {
                return Err(DbError::conflict_with(
                    "ClientContact",
                    format!("contact {} is already linked to client {}", contact_id, client_id),
                    existing_id,
                ));
            }
            conn.execute(INSERT_CLIENT_CONTACT, params![client_id, contact_id, is_primary, can_receive_documents])?;
            let link_id = conn.last_insert_rowid();
            if is_primary {
                conn.execute(CLEAR_PRIMARY_CONTACT, params![client_id, link_id])?;
            }
            Ok(link_id)
        })
    }

    pub fn update_link(&self, link_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "ClientContacts",
                "client_contact_id",
                SqlValue::Integer(link_id),
                CLIENT_CONTACT_COLUMNS,
                changes,
                None,
            )?;
            found(affected, "ClientContact", link_id)?;
            if changes.get("is_primary_for_client").and_then(|v| v.as_bool().or(v.as_i64().map(|i| i != 0))) == Some(true) {
                let client_id: String = conn.query_row(SELECT_LINK_CLIENT, [link_id], |row| row.get(0))?;
                conn.execute(CLEAR_PRIMARY_CONTACT, params![client_id, link_id])?;
            }
            Ok(affected)
        })
    }

    pub fn unlink(&self, client_id: &str, contact_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            let affected = conn.execute(DELETE_CLIENT_CONTACT, params![client_id, contact_id])?;
            found(affected, "ClientContact", format!("{}/{}", client_id, contact_id))?;
            Ok(())
        })
    }

    /// Primary contact first.
    pub fn contacts_for_client(&self, client_id: &str) -> DbResult<Vec<ClientContact>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CONTACTS_FOR_CLIENT, [client_id]))
    }

    /// Live clients the contact is linked to.
    pub fn clients_for_contact(&self, contact_id: i64) -> DbResult<Vec<Client>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CLIENTS_FOR_CONTACT, [contact_id]))
    }
}

pub struct ContactLists<'a> {
    session: Session<'a>,
}

impl<'a> ContactLists<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, list_name: &str, description: Option<&str>) -> DbResult<i64> {
        require_text("list_name", list_name)?;
        self.session.run(|conn| {
            conn.execute(INSERT_LIST, params![list_name.trim(), description, now_iso()])
                .map_err(|e| DbError::from(e).for_entity("ContactList"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, list_id: i64) -> DbResult<Option<ContactList>> {
        self.session.run(|conn| fetch_one(conn, SELECT_LIST_BY_ID, [list_id]))
    }

    pub fn list(&self) -> DbResult<Vec<ContactList>> {
        self.session.run(|conn| fetch_all(conn, SELECT_LISTS, []))
    }

    pub fn update(&self, list_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(conn, "ContactLists", "list_id", SqlValue::Integer(list_id), LIST_COLUMNS, changes, Some("updated_at"))
                .map_err(|e| e.for_entity("ContactList"))?;
            found(affected, "ContactList", list_id)
        })
    }

    pub fn delete(&self, list_id: i64) -> DbResult<()> {
        self.session.run(|conn| hard_delete(conn, "ContactLists", "list_id", SqlValue::Integer(list_id), "ContactList"))
    }

    /// Idempotent: adding a member twice resolves to the first membership.
    pub fn add_member(&self, list_id: i64, contact_id: i64) -> DbResult<Resolved<i64>> {
        self.session.run(|conn| {
            if !exists(conn, "SELECT 1 FROM ContactLists WHERE list_id = ?1", [list_id])? {
                return Err(DbError::not_found("ContactList", list_id));
            }
            ensure_contact(conn, contact_id)?;
            let existing: Option<i64> = conn
                .query_row(SELECT_LIST_MEMBER_ID, params![list_id, contact_id], |row| row.get(0))
                .optional()?;
            if let Some(member_id) = existing {
                return Ok(Resolved::existing(member_id));
            }
            conn.execute(INSERT_LIST_MEMBER, params![list_id, contact_id, now_iso()])?;
            Ok(Resolved::created(conn.last_insert_rowid()))
        })
    }

    pub fn remove_member(&self, list_id: i64, contact_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            found(conn.execute(DELETE_LIST_MEMBER, params![list_id, contact_id])?, "ContactListMember", contact_id)?;
            Ok(())
        })
    }

    pub fn members(&self, list_id: i64) -> DbResult<Vec<Contact>> {
        self.session.run(|conn| fetch_all(conn, SELECT_LIST_MEMBERS, [list_id]))
    }
}
