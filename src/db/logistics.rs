use super::db::Session;
use super::error::DbResult;
use super::rows::{fetch_all, fetch_one, found, hard_delete, new_id, now_iso, require_text, update_row, Changes, FromRow};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_FORWARDER: &str = "INSERT INTO FreightForwarders
    (forwarder_id, name, contact_person, phone, email, address, services_offered, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_FORWARDER_BY_ID: &str = "SELECT * FROM FreightForwarders WHERE forwarder_id = ?1";
const SELECT_FORWARDERS: &str = "SELECT * FROM FreightForwarders ORDER BY name, forwarder_id";

const INSERT_TRANSPORTER: &str = "INSERT INTO Transporters
    (transporter_id, name, contact_person, phone, email, address, service_area, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";
const SELECT_TRANSPORTER_BY_ID: &str = "SELECT * FROM Transporters WHERE transporter_id = ?1";
const SELECT_TRANSPORTERS: &str = "SELECT * FROM Transporters ORDER BY name, transporter_id";

const FORWARDER_COLUMNS: &[&str] = &["name", "contact_person", "phone", "email", "address", "services_offered", "notes"];
const TRANSPORTER_COLUMNS: &[&str] = &["name", "contact_person", "phone", "email", "address", "service_area", "notes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreightForwarder {
    pub forwarder_id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub services_offered: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for FreightForwarder {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FreightForwarder {
            forwarder_id: row.get("forwarder_id")?,
            name: row.get("name")?,
            contact_person: row.get("contact_person")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            address: row.get("address")?,
            services_offered: row.get("services_offered")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFreightForwarder {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub services_offered: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transporter {
    pub transporter_id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service_area: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Transporter {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Transporter {
            transporter_id: row.get("transporter_id")?,
            name: row.get("name")?,
            contact_person: row.get("contact_person")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            address: row.get("address")?,
            service_area: row.get("service_area")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTransporter {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service_area: Option<String>,
    pub notes: Option<String>,
}

pub struct FreightForwarders<'a> {
    session: Session<'a>,
}

impl<'a> FreightForwarders<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, forwarder: &NewFreightForwarder) -> DbResult<String> {
        require_text("name", &forwarder.name)?;
        let forwarder_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_FORWARDER,
                params![
                    forwarder_id,
                    forwarder.name.trim(),
                    forwarder.contact_person,
                    forwarder.phone,
                    forwarder.email,
                    forwarder.address,
                    forwarder.services_offered,
                    forwarder.notes,
                    now_iso()
                ],
            )?;
            Ok(forwarder_id.clone())
        })
    }

    pub fn get(&self, forwarder_id: &str) -> DbResult<Option<FreightForwarder>> {
        self.session.run(|conn| fetch_one(conn, SELECT_FORWARDER_BY_ID, [forwarder_id]))
    }

    pub fn list(&self) -> DbResult<Vec<FreightForwarder>> {
        self.session.run(|conn| fetch_all(conn, SELECT_FORWARDERS, []))
    }

    pub fn update(&self, forwarder_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "FreightForwarders",
                "forwarder_id",
                SqlValue::Text(forwarder_id.to_string()),
                FORWARDER_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "FreightForwarder", forwarder_id)
        })
    }

    pub fn delete(&self, forwarder_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "FreightForwarders",
                "forwarder_id",
                SqlValue::Text(forwarder_id.to_string()),
                "FreightForwarder",
            )
        })
    }
}

pub struct Transporters<'a> {
    session: Session<'a>,
}

impl<'a> Transporters<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, transporter: &NewTransporter) -> DbResult<String> {
        require_text("name", &transporter.name)?;
        let transporter_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_TRANSPORTER,
                params![
                    transporter_id,
                    transporter.name.trim(),
                    transporter.contact_person,
                    transporter.phone,
                    transporter.email,
                    transporter.address,
                    transporter.service_area,
                    transporter.notes,
                    now_iso()
                ],
            )?;
            Ok(transporter_id.clone())
        })
    }

    pub fn get(&self, transporter_id: &str) -> DbResult<Option<Transporter>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TRANSPORTER_BY_ID, [transporter_id]))
    }

    pub fn list(&self) -> DbResult<Vec<Transporter>> {
        self.session.run(|conn| fetch_all(conn, SELECT_TRANSPORTERS, []))
    }

    pub fn update(&self, transporter_id: &str, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(
                conn,
                "Transporters",
                "transporter_id",
                SqlValue::Text(transporter_id.to_string()),
                TRANSPORTER_COLUMNS,
                changes,
                Some("updated_at"),
            )?;
            found(affected, "Transporter", transporter_id)
        })
    }

    pub fn delete(&self, transporter_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(
                conn,
                "Transporters",
                "transporter_id",
                SqlValue::Text(transporter_id.to_string()),
                "Transporter",
            )
        })
    }
}
