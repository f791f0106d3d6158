//! Database handle and the per-call session that owns or joins a transaction.
//!
//! [`Db`] knows where the data lives. A file database gets a fresh connection
//! per call; `:memory:` keeps one connection behind a mutex so every call sees
//! the same data.
//!
//! [`Session`] is what every repository runs on:
//!
//! - `Session::Fresh(&db)` opens a connection, enables foreign keys, runs the
//!   body in a transaction, commits on `Ok`, rolls back on `Err`.
//! - `Session::Joined(&conn)` runs on a caller-owned connection and never
//!   commits, rolls back or closes it.
//!
//! ```rust,no_run
//! use backoffice::db::companies::NewCompany;
//! use backoffice::db::db::Db;
//!
//! let db = Db::open(":memory:")?;
//! db.transaction(|session| {
//!     let company = session.companies().add(&NewCompany {
//!         company_name: "Acme".to_string(),
//!         ..Default::default()
//!     })?;
//!     session.companies().set_default(&company)
//! })?;
//! # Ok::<(), backoffice::db::error::DbError>(())
//! ```

use super::activity::ActivityLog;
use super::client_products::ClientProjectProducts;
use super::clients::{ClientNotes, Clients};
use super::companies::{Companies, CompanyPersonnel};
use super::contacts::{ClientContacts, ContactLists, Contacts};
use super::documents::{ClientDocuments, CoverPageTemplates, CoverPages};
use super::emails::{EmailReminders, ScheduledEmails};
use super::error::{DbError, DbResult};
use super::experiences::Experiences;
use super::geography::{Cities, Countries};
use super::google_sync::{ContactSyncLog, UserGoogleAccounts};
use super::inventory::{ItemLocations, ProductStorageLocations};
use super::invoices::Invoices;
use super::logistics::{FreightForwarders, Transporters};
use super::partners::{PartnerCategories, PartnerContacts, PartnerInteractions, Partners};
use super::products::{ProductDimensions, ProductEquivalencies, ProductMediaLinks, Products};
use super::projects::{Projects, Tasks};
use super::recruitment::{CandidateProgress, Candidates, Interviews, JobOpenings, RecruitmentSteps};
use super::settings::ApplicationSettings;
use super::smtp::SmtpConfigs;
use super::statuses::StatusSettings;
use super::tags::Tags;
use super::team_members::TeamMembers;
use super::templates::{TemplateCategories, Templates};
use super::users::Users;
use crate::libs::config::{self, MEMORY_DB_PATH};
use crate::libs::messages::Message;
use crate::msg_debug;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
enum Backend {
    File(PathBuf),
    Memory(Arc<Mutex<Connection>>),
}

#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

impl Db {
    /// Database named by the installed configuration.
    pub fn new() -> DbResult<Db> {
        let config = config::current();
        Self::open(config.resolved_database_path())
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Db> {
        let path = path.as_ref();
        if path == Path::new(MEMORY_DB_PATH) {
            return Self::in_memory();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Storage(e.to_string()))?;
        }
        // Fail early on an unusable path.
        configure(Connection::open(path)?)?;

        msg_debug!(Message::DatabaseOpened(path.display().to_string()));
        Ok(Db {
            backend: Backend::File(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> DbResult<Db> {
        let conn = configure(Connection::open_in_memory()?)?;
        msg_debug!(Message::DatabaseOpened(MEMORY_DB_PATH.to_string()));
        Ok(Db {
            backend: Backend::Memory(Arc::new(Mutex::new(conn))),
        })
    }

    /// Human-readable location, for messages.
    pub fn describe(&self) -> String {
        match &self.backend {
            Backend::File(path) => path.display().to_string(),
            Backend::Memory(_) => MEMORY_DB_PATH.to_string(),
        }
    }

    /// Runs `f` on a connection with no implicit transaction.
    pub fn with_connection<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T>,
    {
        match &self.backend {
            Backend::File(path) => {
                let mut conn = configure(Connection::open(path)?)?;
                f(&mut conn)
            }
            Backend::Memory(shared) => {
                let mut conn = shared.lock();
                f(&mut conn)
            }
        }
    }

    /// Runs `f` inside one transaction: commit on `Ok`, rollback on `Err`.
    pub fn run_in_transaction<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    msg_debug!(Message::TransactionRolledBack(e.to_string()));
                    // Dropping the transaction rolls it back as well.
                    let _ = tx.rollback();
                    Err(e)
                }
            }
        })
    }

    pub fn session(&self) -> Session<'_> {
        Session::Fresh(self)
    }

    /// Composite operation: every repository reached through the session
    /// joins the same transaction.
    pub fn transaction<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(Session<'_>) -> DbResult<T>,
    {
        self.run_in_transaction(|conn| f(Session::Joined(conn)))
    }
}

fn configure(conn: Connection) -> DbResult<Connection> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Either owns a fresh transaction per call or joins a caller's connection.
#[derive(Clone, Copy)]
pub enum Session<'a> {
    Fresh(&'a Db),
    Joined(&'a Connection),
}

impl<'a> Session<'a> {
    pub fn within(conn: &'a Connection) -> Session<'a> {
        Session::Joined(conn)
    }

    pub fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        match self {
            Session::Fresh(db) => db.run_in_transaction(f),
            Session::Joined(conn) => f(conn),
        }
    }

    pub fn countries(self) -> Countries<'a> {
        Countries::new(self)
    }

    pub fn cities(self) -> Cities<'a> {
        Cities::new(self)
    }

    pub fn statuses(self) -> StatusSettings<'a> {
        StatusSettings::new(self)
    }

    pub fn template_categories(self) -> TemplateCategories<'a> {
        TemplateCategories::new(self)
    }

    pub fn partner_categories(self) -> PartnerCategories<'a> {
        PartnerCategories::new(self)
    }

    pub fn users(self) -> Users<'a> {
        Users::new(self)
    }

    pub fn companies(self) -> Companies<'a> {
        Companies::new(self)
    }

    pub fn company_personnel(self) -> CompanyPersonnel<'a> {
        CompanyPersonnel::new(self)
    }

    pub fn team_members(self) -> TeamMembers<'a> {
        TeamMembers::new(self)
    }

    pub fn clients(self) -> Clients<'a> {
        Clients::new(self)
    }

    pub fn client_notes(self) -> ClientNotes<'a> {
        ClientNotes::new(self)
    }

    pub fn contacts(self) -> Contacts<'a> {
        Contacts::new(self)
    }

    pub fn client_contacts(self) -> ClientContacts<'a> {
        ClientContacts::new(self)
    }

    pub fn contact_lists(self) -> ContactLists<'a> {
        ContactLists::new(self)
    }

    pub fn partners(self) -> Partners<'a> {
        Partners::new(self)
    }

    pub fn partner_contacts(self) -> PartnerContacts<'a> {
        PartnerContacts::new(self)
    }

    pub fn partner_interactions(self) -> PartnerInteractions<'a> {
        PartnerInteractions::new(self)
    }

    pub fn freight_forwarders(self) -> FreightForwarders<'a> {
        FreightForwarders::new(self)
    }

    pub fn transporters(self) -> Transporters<'a> {
        Transporters::new(self)
    }

    pub fn products(self) -> Products<'a> {
        Products::new(self)
    }

    pub fn product_media(self) -> ProductMediaLinks<'a> {
        ProductMediaLinks::new(self)
    }

    pub fn product_dimensions(self) -> ProductDimensions<'a> {
        ProductDimensions::new(self)
    }

    pub fn product_equivalencies(self) -> ProductEquivalencies<'a> {
        ProductEquivalencies::new(self)
    }

    pub fn client_products(self) -> ClientProjectProducts<'a> {
        ClientProjectProducts::new(self)
    }

    pub fn projects(self) -> Projects<'a> {
        Projects::new(self)
    }

    pub fn tasks(self) -> Tasks<'a> {
        Tasks::new(self)
    }

    pub fn invoices(self) -> Invoices<'a> {
        Invoices::new(self)
    }

    pub fn job_openings(self) -> JobOpenings<'a> {
        JobOpenings::new(self)
    }

    pub fn candidates(self) -> Candidates<'a> {
        Candidates::new(self)
    }

    pub fn recruitment_steps(self) -> RecruitmentSteps<'a> {
        RecruitmentSteps::new(self)
    }

    pub fn interviews(self) -> Interviews<'a> {
        Interviews::new(self)
    }

    pub fn candidate_progress(self) -> CandidateProgress<'a> {
        CandidateProgress::new(self)
    }

    pub fn locations(self) -> ItemLocations<'a> {
        ItemLocations::new(self)
    }

    pub fn storage_locations(self) -> ProductStorageLocations<'a> {
        ProductStorageLocations::new(self)
    }

    pub fn templates(self) -> Templates<'a> {
        Templates::new(self)
    }

    pub fn client_documents(self) -> ClientDocuments<'a> {
        ClientDocuments::new(self)
    }

    pub fn cover_page_templates(self) -> CoverPageTemplates<'a> {
        CoverPageTemplates::new(self)
    }

    pub fn cover_pages(self) -> CoverPages<'a> {
        CoverPages::new(self)
    }

    pub fn smtp_configs(self) -> SmtpConfigs<'a> {
        SmtpConfigs::new(self)
    }

    pub fn settings(self) -> ApplicationSettings<'a> {
        ApplicationSettings::new(self)
    }

    pub fn activity(self) -> ActivityLog<'a> {
        ActivityLog::new(self)
    }

    pub fn scheduled_emails(self) -> ScheduledEmails<'a> {
        ScheduledEmails::new(self)
    }

    pub fn email_reminders(self) -> EmailReminders<'a> {
        EmailReminders::new(self)
    }

    pub fn google_accounts(self) -> UserGoogleAccounts<'a> {
        UserGoogleAccounts::new(self)
    }

    pub fn contact_sync_log(self) -> ContactSyncLog<'a> {
        ContactSyncLog::new(self)
    }

    pub fn experiences(self) -> Experiences<'a> {
        Experiences::new(self)
    }

    pub fn tags(self) -> Tags<'a> {
        Tags::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database_is_shared_between_calls() {
        let db = Db::open(":memory:").unwrap();
        db.session().run(|conn| Ok(conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1);")?)).unwrap();

        let count: i64 = db.session().run(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))?)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn failed_body_rolls_back() {
        let db = Db::in_memory().unwrap();
        db.session().run(|conn| Ok(conn.execute_batch("CREATE TABLE t (v INTEGER);")?)).unwrap();

        let result: DbResult<()> = db.session().run(|conn| {
            conn.execute("INSERT INTO t VALUES (1)", [])?;
            Err(DbError::Storage("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = db.session().run(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))?)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = Db::in_memory().unwrap();
        let enabled: i64 = db.session().run(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?)).unwrap();
        assert_eq!(enabled, 1);
    }
}
