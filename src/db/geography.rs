//! Countries and the cities under them.
//!
//! Both expose resolve-or-create (`get_or_add`), which is how free-text
//! locations entered for a client become ids.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{exists, fetch_all, fetch_one, found, hard_delete, update_row, Changes, FromRow, Resolved};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const INSERT_COUNTRY: &str = "INSERT INTO Countries (country_name) VALUES (?1)";
const SELECT_COUNTRY_BY_ID: &str = "SELECT * FROM Countries WHERE country_id = ?1";
const SELECT_COUNTRY_BY_NAME: &str = "SELECT * FROM Countries WHERE country_name = ?1";
const SELECT_COUNTRIES: &str = "SELECT * FROM Countries ORDER BY country_name";

const INSERT_CITY: &str = "INSERT INTO Cities (country_id, city_name) VALUES (?1, ?2)";
const SELECT_CITY_BY_ID: &str = "SELECT * FROM Cities WHERE city_id = ?1";
const SELECT_CITY_BY_NAME: &str = "SELECT * FROM Cities WHERE country_id = ?1 AND city_name = ?2";
const SELECT_CITIES_BY_COUNTRY: &str = "SELECT * FROM Cities WHERE country_id = ?1 ORDER BY city_name";
const SELECT_CITIES: &str = "SELECT * FROM Cities ORDER BY city_name";

const COUNTRY_COLUMNS: &[&str] = &["country_name"];
const CITY_COLUMNS: &[&str] = &["country_id", "city_name"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub country_id: i64,
    pub country_name: String,
}

impl FromRow for Country {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Country {
            country_id: row.get("country_id")?,
            country_name: row.get("country_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub city_id: i64,
    pub country_id: i64,
    pub city_name: String,
}

impl FromRow for City {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(City {
            city_id: row.get("city_id")?,
            country_id: row.get("country_id")?,
            city_name: row.get("city_name")?,
        })
    }
}

fn clean_name(field: &str, name: &str) -> DbResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::validation(field, "must not be empty"));
    }
    Ok(name.to_string())
}

pub struct Countries<'a> {
    session: Session<'a>,
}

impl<'a> Countries<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, name: &str) -> DbResult<i64> {
        let name = clean_name("country_name", name)?;
        self.session.run(|conn| {
            conn.execute(INSERT_COUNTRY, params![name]).map_err(|e| DbError::from(e).for_entity("Country"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, country_id: i64) -> DbResult<Option<Country>> {
        self.session.run(|conn| fetch_one(conn, SELECT_COUNTRY_BY_ID, [country_id]))
    }

    pub fn get_by_name(&self, name: &str) -> DbResult<Option<Country>> {
        self.session.run(|conn| fetch_one(conn, SELECT_COUNTRY_BY_NAME, [name.trim()]))
    }

    pub fn list(&self) -> DbResult<Vec<Country>> {
        self.session.run(|conn| fetch_all(conn, SELECT_COUNTRIES, []))
    }

    /// Returns the id of the country with this name, inserting it if needed.
    pub fn get_or_add(&self, name: &str) -> DbResult<Resolved<i64>> {
        let name = clean_name("country_name", name)?;
        self.session.run(|conn| {
            if let Some(country) = fetch_one::<Country, _>(conn, SELECT_COUNTRY_BY_NAME, [&name])? {
                return Ok(Resolved::existing(country.country_id));
            }
            conn.execute(INSERT_COUNTRY, params![name])?;
            Ok(Resolved::created(conn.last_insert_rowid()))
        })
    }

    pub fn update(&self, country_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(conn, "Countries", "country_id", SqlValue::Integer(country_id), COUNTRY_COLUMNS, changes, None)
                .map_err(|e| e.for_entity("Country"))?;
            found(affected, "Country", country_id)
        })
    }

    /// Hard delete. Fails with an integrity error while clients still point at it.
    pub fn delete(&self, country_id: i64) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Countries", "country_id", SqlValue::Integer(country_id), "Country"))
    }
}

pub struct Cities<'a> {
    session: Session<'a>,
}

impl<'a> Cities<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, country_id: i64, name: &str) -> DbResult<i64> {
        let name = clean_name("city_name", name)?;
        self.session.run(|conn| {
            ensure_country(conn, country_id)?;
            conn.execute(INSERT_CITY, params![country_id, name]).map_err(|e| DbError::from(e).for_entity("City"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get(&self, city_id: i64) -> DbResult<Option<City>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CITY_BY_ID, [city_id]))
    }

    pub fn get_by_name(&self, country_id: i64, name: &str) -> DbResult<Option<City>> {
        self.session.run(|conn| fetch_one(conn, SELECT_CITY_BY_NAME, params![country_id, name.trim()]))
    }

    pub fn list(&self) -> DbResult<Vec<City>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CITIES, []))
    }

    pub fn list_for_country(&self, country_id: i64) -> DbResult<Vec<City>> {
        self.session.run(|conn| fetch_all(conn, SELECT_CITIES_BY_COUNTRY, [country_id]))
    }

    /// Same as [`Countries::get_or_add`], scoped to one country.
    pub fn get_or_add(&self, country_id: i64, name: &str) -> DbResult<Resolved<i64>> {
        let name = clean_name("city_name", name)?;
        self.session.run(|conn| {
            if let Some(city) = fetch_one::<City, _>(conn, SELECT_CITY_BY_NAME, params![country_id, name])? {
                return Ok(Resolved::existing(city.city_id));
            }
            ensure_country(conn, country_id)?;
            conn.execute(INSERT_CITY, params![country_id, name])?;
            Ok(Resolved::created(conn.last_insert_rowid()))
        })
    }

    pub fn update(&self, city_id: i64, changes: &Changes) -> DbResult<usize> {
        self.session.run(|conn| {
            let affected = update_row(conn, "Cities", "city_id", SqlValue::Integer(city_id), CITY_COLUMNS, changes, None)
                .map_err(|e| e.for_entity("City"))?;
            found(affected, "City", city_id)
        })
    }

    pub fn delete(&self, city_id: i64) -> DbResult<()> {
        self.session.run(|conn| hard_delete(conn, "Cities", "city_id", SqlValue::Integer(city_id), "City"))
    }
}

fn ensure_country(conn: &rusqlite::Connection, country_id: i64) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Countries WHERE country_id = ?1", [country_id])? {
        return Err(DbError::not_found("Country", country_id));
    }
    Ok(())
}
