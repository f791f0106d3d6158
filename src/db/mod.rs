//! Persistence layer of the back office.
//!
//! Built on SQLite through `rusqlite`. [`db::Db`] owns the database location
//! and hands out sessions; every repository is reached from a session and
//! runs each call in its own transaction, or in the caller's transaction when
//! the session was opened with [`db::Db::transaction`].
//!
//! ## Layout
//!
//! - **Infrastructure**: [`db`], [`error`], [`rows`], [`envelope`]
//! - **Schema**: [`schema`], [`migrations`], [`seed`]
//! - **Reference data**: [`geography`], [`statuses`], [`templates`], [`settings`]
//! - **Parties**: [`users`], [`companies`], [`team_members`], [`clients`],
//!   [`contacts`], [`partners`], [`logistics`], [`onboarding`]
//! - **Commercial**: [`products`], [`client_products`], [`projects`], [`invoices`]
//! - **Recruitment and inventory**: [`recruitment`], [`inventory`]
//! - **Documents and messaging**: [`documents`], [`smtp`], [`emails`], [`google_sync`]
//! - **Journal**: [`activity`], [`experiences`], [`tags`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backoffice::db::db::Db;
//! use backoffice::db::products::NewProduct;
//!
//! let db = Db::new()?;
//! let product_id = db.session().products().add(&NewProduct {
//!     product_name: "Super Widget".to_string(),
//!     base_unit_price: 199.99,
//!     ..Default::default()
//! })?;
//!
//! // Several writes that must succeed or fail together.
//! db.transaction(|session| {
//!     let country = session.countries().get_or_add("Testland")?;
//!     session.cities().get_or_add(country.id, "Testville")?;
//!     Ok(())
//! })?;
//! # Ok::<(), backoffice::db::error::DbError>(())
//! ```

pub mod activity;
pub mod client_products;
pub mod clients;
pub mod companies;
pub mod contacts;
pub mod db;
pub mod documents;
pub mod emails;
pub mod envelope;
pub mod error;
pub mod experiences;
pub mod geography;
pub mod google_sync;
pub mod inventory;
pub mod invoices;
pub mod logistics;
pub mod migrations;
pub mod onboarding;
pub mod partners;
pub mod products;
pub mod projects;
pub mod recruitment;
pub mod rows;
pub mod schema;
pub mod seed;
pub mod settings;
pub mod smtp;
pub mod statuses;
pub mod tags;
pub mod team_members;
pub mod templates;
pub mod users;
