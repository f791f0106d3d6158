//! Experiences: dated write-ups with tags, related records and media.
//!
//! The three side tables are always rewritten as a whole: an update that
//! supplies a new set of tags (or entities, or media) deletes the old rows
//! and inserts the new ones in the same transaction as the row update.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{fetch_one, filter_changes, found, hard_delete, new_id, now_iso, require_text, update_row, user_ref, Changes, Conditions, FromRow, Page};
use super::tags::resolve_tag;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

const INSERT_EXPERIENCE: &str = "INSERT INTO Experiences
    (experience_id, title, description, experience_date, experience_type, user_id, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)";
const SELECT_EXPERIENCE_BY_ID: &str = "SELECT * FROM Experiences WHERE experience_id = ?1";
const SELECT_EXPERIENCES: &str = "SELECT * FROM Experiences";
const TOUCH_EXPERIENCE: &str = "UPDATE Experiences SET updated_at = ?2 WHERE experience_id = ?1";

const INSERT_EXPERIENCE_TAG: &str = "INSERT OR IGNORE INTO ExperienceTags (experience_id, tag_id) VALUES (?1, ?2)";
const DELETE_EXPERIENCE_TAGS: &str = "DELETE FROM ExperienceTags WHERE experience_id = ?1";
const INSERT_RELATED_ENTITY: &str = "INSERT OR IGNORE INTO ExperienceRelatedEntities (experience_id, entity_type, entity_id) VALUES (?1, ?2, ?3)";
const DELETE_RELATED_ENTITIES: &str = "DELETE FROM ExperienceRelatedEntities WHERE experience_id = ?1";
const SELECT_RELATED_ENTITIES: &str = "SELECT entity_type, entity_id FROM ExperienceRelatedEntities
    WHERE experience_id = ?1 ORDER BY experience_related_entity_id";
const INSERT_MEDIA: &str = "INSERT OR IGNORE INTO ExperienceMedia (experience_id, media_item_id, display_order) VALUES (?1, ?2, ?3)";
const DELETE_MEDIA: &str = "DELETE FROM ExperienceMedia WHERE experience_id = ?1";
const SELECT_MEDIA: &str = "SELECT media_item_id FROM ExperienceMedia WHERE experience_id = ?1 ORDER BY display_order";

const EXPERIENCE_COLUMNS: &[&str] = &["title", "description", "experience_date", "experience_type", "user_id"];

/// Kind of record an experience points at. Unrecognised kinds read from
/// the store are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Client,
    Project,
    Product,
    Partner,
    CompanyAsset,
    Unknown(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Client => "Client",
            EntityType::Project => "Project",
            EntityType::Product => "Product",
            EntityType::Partner => "Partner",
            EntityType::CompanyAsset => "CompanyAsset",
            EntityType::Unknown(other) => other,
        }
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Client" => EntityType::Client,
            "Project" => EntityType::Project,
            "Product" => EntityType::Product,
            "Partner" => EntityType::Partner,
            "CompanyAsset" => EntityType::CompanyAsset,
            _ => EntityType::Unknown(value),
        }
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record an experience is about. `entity_id` is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub experience_id: String,
    pub title: String,
    pub description: Option<String>,
    pub experience_date: Option<String>,
    pub experience_type: Option<String>,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_entities: Vec<EntityRef>,
    #[serde(default)]
    pub media_item_ids: Vec<String>,
}

impl FromRow for Experience {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Experience {
            experience_id: row.get("experience_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            experience_date: row.get("experience_date")?,
            experience_type: row.get("experience_type")?,
            user_id: row.get("user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            tags: Vec::new(),
            related_entities: Vec::new(),
            media_item_ids: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewExperience {
    pub title: String,
    pub description: Option<String>,
    pub experience_date: Option<String>,
    pub experience_type: Option<String>,
    pub user_id: Option<String>,
    pub tags: Vec<String>,
    pub related_entities: Vec<EntityRef>,
    /// Stored in this order.
    pub media_item_ids: Vec<String>,
}

/// Column changes plus optional replacement sets for the side tables.
/// `None` leaves a side table untouched; `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperienceUpdate {
    pub changes: Changes,
    pub tags: Option<Vec<String>>,
    pub related_entities: Option<Vec<EntityRef>>,
    pub media_item_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceFilter {
    pub experience_type: Option<String>,
    pub user_id: Option<String>,
    pub tag: Option<String>,
    pub related_to: Option<EntityRef>,
}

fn link_tags(conn: &Connection, experience_id: &str, tags: &[String]) -> DbResult<()> {
    conn.execute(DELETE_EXPERIENCE_TAGS, [experience_id])?;
    for tag in tags.iter().filter(|t| !t.trim().is_empty()) {
        let tag_id = resolve_tag(conn, tag)?.id;
        conn.execute(INSERT_EXPERIENCE_TAG, params![experience_id, tag_id])?;
    }
    Ok(())
}

fn link_entities(conn: &Connection, experience_id: &str, entities: &[EntityRef]) -> DbResult<()> {
    conn.execute(DELETE_RELATED_ENTITIES, [experience_id])?;
    for entity in entities {
        require_text("entity_id", &entity.entity_id)?;
        conn.execute(INSERT_RELATED_ENTITY, params![experience_id, entity.entity_type.as_str(), entity.entity_id])?;
    }
    Ok(())
}

fn link_media(conn: &Connection, experience_id: &str, media_item_ids: &[String]) -> DbResult<()> {
    conn.execute(DELETE_MEDIA, [experience_id])?;
    for (order, media_item_id) in media_item_ids.iter().enumerate() {
        conn.execute(INSERT_MEDIA, params![experience_id, media_item_id, order as i64])?;
    }
    Ok(())
}

fn load_side_rows(conn: &Connection, experience: &mut Experience) -> DbResult<()> {
    let id = experience.experience_id.as_str();
    experience.tags = Session::within(conn)
        .tags()
        .list_for_experience(id)?
        .into_iter()
        .map(|tag| tag.tag_name)
        .collect();

    let mut stmt = conn.prepare(SELECT_RELATED_ENTITIES)?;
    let rows = stmt.query_map([id], |row| {
        Ok(EntityRef::new(EntityType::from(row.get::<_, String>(0)?), row.get::<_, String>(1)?))
    })?;
    experience.related_entities = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(SELECT_MEDIA)?;
    let rows = stmt.query_map([id], |row| row.get::<_, String>(0))?;
    experience.media_item_ids = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(())
}

pub struct Experiences<'a> {
    session: Session<'a>,
}

impl<'a> Experiences<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, experience: &NewExperience) -> DbResult<String> {
        require_text("title", &experience.title)?;
        let experience_id = new_id();
        self.session.run(|conn| {
            conn.execute(
                INSERT_EXPERIENCE,
                params![
                    experience_id,
                    experience.title.trim(),
                    experience.description,
                    experience.experience_date,
                    experience.experience_type,
                    user_ref(experience.user_id.as_deref()),
                    now_iso()
                ],
            )?;
            link_tags(conn, &experience_id, &experience.tags)?;
            link_entities(conn, &experience_id, &experience.related_entities)?;
            link_media(conn, &experience_id, &experience.media_item_ids)?;
            Ok(experience_id.clone())
        })
    }

    /// The experience with its tags, related entities and media.
    pub fn get(&self, experience_id: &str) -> DbResult<Option<Experience>> {
        self.session.run(|conn| {
            let Some(mut experience) = fetch_one::<Experience, _>(conn, SELECT_EXPERIENCE_BY_ID, [experience_id])? else {
                return Ok(None);
            };
            load_side_rows(conn, &mut experience)?;
            Ok(Some(experience))
        })
    }

    /// Newest first, side rows included.
    pub fn list(&self, filter: &ExperienceFilter, page: Page) -> DbResult<Vec<Experience>> {
        let mut conditions = Conditions::new();
        conditions
            .push_opt("experience_type = ?", filter.experience_type.clone())
            .push_opt("user_id = ?", filter.user_id.clone())
            .push_opt(
                "experience_id IN (SELECT et.experience_id FROM ExperienceTags et JOIN Tags t ON t.tag_id = et.tag_id WHERE t.tag_name = ?)",
                filter.tag.clone(),
            );
        conditions.push_opt(
            "experience_id IN (SELECT experience_id FROM ExperienceRelatedEntities WHERE entity_type || ':' || entity_id = ?)",
            filter
                .related_to
                .as_ref()
                .map(|entity| format!("{}:{}", entity.entity_type, entity.entity_id)),
        );
        let tail = format!(" ORDER BY COALESCE(experience_date, created_at) DESC{}", page.to_sql());

        self.session.run(|conn| {
            let mut experiences: Vec<Experience> = conditions.query(conn, SELECT_EXPERIENCES, &tail)?;
            for experience in experiences.iter_mut() {
                load_side_rows(conn, experience)?;
            }
            Ok(experiences)
        })
    }

    /// Updates columns and re-links the side tables that were supplied, atomically.
    pub fn update(&self, experience_id: &str, update: &ExperienceUpdate) -> DbResult<()> {
        if let Some(title) = update.changes.get("title") {
            require_text("title", title.as_str().unwrap_or_default())?;
        }
        let columns = filter_changes(&update.changes, EXPERIENCE_COLUMNS);

        self.session.run(|conn| {
            let affected = if columns.is_empty() {
                conn.execute(TOUCH_EXPERIENCE, params![experience_id, now_iso()])?
            } else {
                update_row(
                    conn,
                    "Experiences",
                    "experience_id",
                    SqlValue::Text(experience_id.to_string()),
                    EXPERIENCE_COLUMNS,
                    &columns,
                    Some("updated_at"),
                )?
            };
            found(affected, "Experience", experience_id)?;

            if let Some(tags) = &update.tags {
                link_tags(conn, experience_id, tags)?;
            }
            if let Some(entities) = &update.related_entities {
                link_entities(conn, experience_id, entities)?;
            }
            if let Some(media) = &update.media_item_ids {
                link_media(conn, experience_id, media)?;
            }
            Ok(())
        })
    }

    /// Removes the experience and its side rows. Tags themselves stay.
    pub fn delete(&self, experience_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "Experiences", "experience_id", SqlValue::Text(experience_id.to_string()), "Experience")
        })
    }

    /// Experiences that reference the given record.
    pub fn list_for_entity(&self, entity: &EntityRef) -> DbResult<Vec<Experience>> {
        if entity.entity_id.trim().is_empty() {
            return Err(DbError::validation("entity_id", "must not be empty"));
        }
        self.list(
            &ExperienceFilter {
                related_to: Some(entity.clone()),
                ..Default::default()
            },
            Page::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_types_survive_a_round_trip() {
        assert_eq!(EntityType::from("CompanyAsset".to_string()), EntityType::CompanyAsset);
        let other = EntityType::from("Vehicle".to_string());
        assert_eq!(other, EntityType::Unknown("Vehicle".to_string()));
        assert_eq!(other.as_str(), "Vehicle");
    }

    #[test]
    fn entity_refs_serialize_as_plain_strings() {
        let entity = EntityRef::new(EntityType::Client, "c1");
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json, serde_json::json!({"entity_type": "Client", "entity_id": "c1"}));
    }
}
