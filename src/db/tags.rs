use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{fetch_all, fetch_one, found, hard_delete, require_text, FromRow, Resolved};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const INSERT_TAG: &str = "INSERT INTO Tags (tag_name) VALUES (?1)";
const RENAME_TAG: &str = "UPDATE Tags SET tag_name = ?2 WHERE tag_id = ?1";
const SELECT_TAG_ID_BY_NAME: &str = "SELECT tag_id FROM Tags WHERE tag_name = ?1";
const SELECT_TAG_BY_ID: &str = "SELECT * FROM Tags WHERE tag_id = ?1";
const SELECT_TAG_BY_NAME: &str = "SELECT * FROM Tags WHERE tag_name = ?1";
const SELECT_ALL_TAGS: &str = "SELECT * FROM Tags ORDER BY tag_name";
const SELECT_TAGS_BY_EXPERIENCE: &str = "SELECT t.* FROM Tags t
    JOIN ExperienceTags et ON et.tag_id = t.tag_id
    WHERE et.experience_id = ?1
    ORDER BY t.tag_name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: i64,
    pub tag_name: String,
}

impl FromRow for Tag {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Tag {
            tag_id: row.get("tag_id")?,
            tag_name: row.get("tag_name")?,
        })
    }
}

pub(crate) fn resolve_tag(conn: &Connection, name: &str) -> DbResult<Resolved<i64>> {
    let name = name.trim();
    let existing: Option<i64> = conn.query_row(SELECT_TAG_ID_BY_NAME, [name], |row| row.get(0)).optional()?;
    if let Some(tag_id) = existing {
        return Ok(Resolved::existing(tag_id));
    }
    conn.execute(INSERT_TAG, [name])?;
    Ok(Resolved::created(conn.last_insert_rowid()))
}

pub struct Tags<'a> {
    session: Session<'a>,
}

impl<'a> Tags<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Tag names are unique; an existing name resolves to its id.
    pub fn get_or_add(&self, name: &str) -> DbResult<Resolved<i64>> {
        require_text("tag_name", name)?;
        self.session.run(|conn| resolve_tag(conn, name))
    }

    pub fn get(&self, tag_id: i64) -> DbResult<Option<Tag>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TAG_BY_ID, [tag_id]))
    }

    pub fn get_by_name(&self, name: &str) -> DbResult<Option<Tag>> {
        self.session.run(|conn| fetch_one(conn, SELECT_TAG_BY_NAME, [name.trim()]))
    }

    pub fn list(&self) -> DbResult<Vec<Tag>> {
        self.session.run(|conn| fetch_all(conn, SELECT_ALL_TAGS, []))
    }

    pub fn list_for_experience(&self, experience_id: &str) -> DbResult<Vec<Tag>> {
        self.session.run(|conn| fetch_all(conn, SELECT_TAGS_BY_EXPERIENCE, [experience_id]))
    }

    pub fn rename(&self, tag_id: i64, name: &str) -> DbResult<()> {
        require_text("tag_name", name)?;
        self.session.run(|conn| {
            let affected = conn
                .execute(RENAME_TAG, params![tag_id, name.trim()])
                .map_err(|e| DbError::from(e).for_entity("Tag"))?;
            found(affected, "Tag", tag_id)?;
            Ok(())
        })
    }

    /// Detaches the tag from every experience.
    pub fn delete(&self, tag_id: i64) -> DbResult<()> {
        self.session.run(|conn| hard_delete(conn, "Tags", "tag_id", SqlValue::Integer(tag_id), "Tag"))
    }
}
