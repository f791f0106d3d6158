//! Product catalogue: products, their media links, technical dimensions and
//! the symmetric equivalency relation between products.

use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    change_f64, exists, fetch_all, fetch_one, filter_changes, found, hard_delete, json_to_sql, now_iso, require_non_negative, require_text,
    soft_delete, update_live_row, update_row, with_holder, Changes, Conditions, FromRow, Page, Resolved,
};
use crate::libs::messages::Message;
use crate::msg_debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE_CODE: &str = "fr";

const INSERT_PRODUCT: &str = "INSERT INTO Products
    (product_name, product_code, description, category, language_code, base_unit_price, unit_of_measure, weight,
     dimensions, is_active, is_deleted, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, 0, ?10, ?10)";
const SELECT_PRODUCT_BY_ID: &str = "SELECT * FROM Products WHERE product_id = ?1";
const SELECT_LIVE_PRODUCT_BY_ID: &str = "SELECT * FROM Products WHERE product_id = ?1 AND is_deleted = 0";
const SELECT_PRODUCT_BY_CODE: &str = "SELECT * FROM Products WHERE product_code = ?1 AND is_deleted = 0";
const SELECT_PRODUCT_BY_NAME: &str = "SELECT * FROM Products WHERE product_name = ?1 AND language_code = ?2 AND is_deleted = 0";
const SELECT_PRODUCTS: &str = "SELECT * FROM Products";
const COUNT_PRODUCTS: &str = "SELECT COUNT(*) FROM Products";

const INSERT_MEDIA_LINK: &str = "INSERT INTO ProductMediaLinks (product_id, media_item_id, display_order, alt_text, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)";
const SELECT_MEDIA_LINK: &str = "SELECT * FROM ProductMediaLinks WHERE product_id = ?1 AND media_item_id = ?2";
const SELECT_MEDIA_LINKS: &str = "SELECT * FROM ProductMediaLinks WHERE product_id = ?1 ORDER BY display_order, link_id";
const DELETE_MEDIA_LINK: &str = "DELETE FROM ProductMediaLinks WHERE product_id = ?1 AND media_item_id = ?2";
const UPDATE_MEDIA_ORDER: &str = "UPDATE ProductMediaLinks SET display_order = ?3 WHERE product_id = ?1 AND media_item_id = ?2";
const NEXT_MEDIA_ORDER: &str = "SELECT COALESCE(MAX(display_order) + 1, 0) FROM ProductMediaLinks WHERE product_id = ?1";

const SELECT_DIMENSIONS: &str = "SELECT * FROM ProductDimensions WHERE product_id = ?1";

const INSERT_EQUIVALENCY: &str = "INSERT INTO ProductEquivalencies (product_id_a, product_id_b, created_at) VALUES (?1, ?2, ?3)";
const SELECT_EQUIVALENCY_PAIR: &str = "SELECT * FROM ProductEquivalencies WHERE product_id_a = ?1 AND product_id_b = ?2";
const SELECT_EQUIVALENT_PRODUCTS: &str = "SELECT p.* FROM ProductEquivalencies e
    JOIN Products p ON p.product_id = CASE WHEN e.product_id_a = ?1 THEN e.product_id_b ELSE e.product_id_a END
    WHERE (e.product_id_a = ?1 OR e.product_id_b = ?1)";
const SELECT_EQUIVALENCIES: &str = "SELECT e.* FROM ProductEquivalencies e";
const LIVE_EQUIVALENCIES: &str = " JOIN Products pa ON pa.product_id = e.product_id_a
    JOIN Products pb ON pb.product_id = e.product_id_b
    WHERE pa.is_deleted = 0 AND pb.is_deleted = 0";

const PRODUCT_COLUMNS: &[&str] = &[
    "product_name",
    "product_code",
    "description",
    "category",
    "language_code",
    "base_unit_price",
    "unit_of_measure",
    "weight",
    "dimensions",
    "is_active",
];
pub const DIMENSION_COLUMNS: &[&str] = &[
    "dim_a",
    "dim_b",
    "dim_c",
    "dim_d",
    "dim_e",
    "dim_f",
    "dim_g",
    "dim_h",
    "dim_i",
    "dim_j",
    "technical_image_path",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub product_name: String,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language_code: String,
    pub base_unit_price: f64,
    pub unit_of_measure: Option<String>,
    pub weight: Option<f64>,
    pub dimensions: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Filled by [`Products::get`] only.
    #[serde(default)]
    pub media_links: Vec<MediaLink>,
}

impl FromRow for Product {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Product {
            product_id: row.get("product_id")?,
            product_name: row.get("product_name")?,
            product_code: row.get("product_code")?,
            description: row.get("description")?,
            category: row.get("category")?,
            language_code: row.get("language_code")?,
            base_unit_price: row.get("base_unit_price")?,
            unit_of_measure: row.get("unit_of_measure")?,
            weight: row.get("weight")?,
            dimensions: row.get("dimensions")?,
            is_active: row.get("is_active")?,
            is_deleted: row.get("is_deleted")?,
            deleted_at: row.get("deleted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            media_links: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language_code: String,
    pub base_unit_price: f64,
    pub unit_of_measure: Option<String>,
    pub weight: Option<f64>,
    pub dimensions: Option<String>,
}

impl Default for NewProduct {
    fn default() -> Self {
        NewProduct {
            product_name: String::new(),
            product_code: None,
            description: None,
            category: None,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            base_unit_price: 0.0,
            unit_of_measure: None,
            weight: None,
            dimensions: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub language_code: Option<String>,
    /// Substring of the product name.
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub is_active: Option<bool>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaLink {
    pub link_id: i64,
    pub product_id: i64,
    pub media_item_id: String,
    pub display_order: i64,
    pub alt_text: Option<String>,
    pub created_at: String,
}

impl FromRow for MediaLink {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MediaLink {
            link_id: row.get("link_id")?,
            product_id: row.get("product_id")?,
            media_item_id: row.get("media_item_id")?,
            display_order: row.get("display_order")?,
            alt_text: row.get("alt_text")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub product_id: i64,
    pub dim_a: Option<String>,
    pub dim_b: Option<String>,
    pub dim_c: Option<String>,
    pub dim_d: Option<String>,
    pub dim_e: Option<String>,
    pub dim_f: Option<String>,
    pub dim_g: Option<String>,
    pub dim_h: Option<String>,
    pub dim_i: Option<String>,
    pub dim_j: Option<String>,
    pub technical_image_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Dimensions {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Dimensions {
            product_id: row.get("product_id")?,
            dim_a: row.get("dim_a")?,
            dim_b: row.get("dim_b")?,
            dim_c: row.get("dim_c")?,
            dim_d: row.get("dim_d")?,
            dim_e: row.get("dim_e")?,
            dim_f: row.get("dim_f")?,
            dim_g: row.get("dim_g")?,
            dim_h: row.get("dim_h")?,
            dim_i: row.get("dim_i")?,
            dim_j: row.get("dim_j")?,
            technical_image_path: row.get("technical_image_path")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// One stored equivalency; always `product_id_a < product_id_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equivalency {
    pub equivalence_id: i64,
    pub product_id_a: i64,
    pub product_id_b: i64,
    pub created_at: String,
}

impl FromRow for Equivalency {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Equivalency {
            equivalence_id: row.get("equivalence_id")?,
            product_id_a: row.get("product_id_a")?,
            product_id_b: row.get("product_id_b")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Fails unless the product exists and is not soft-deleted.
pub(crate) fn ensure_live_product(conn: &Connection, product_id: i64) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Products WHERE product_id = ?1 AND is_deleted = 0", [product_id])? {
        return Err(DbError::not_found("Product", format!("{} (not found or deleted)", product_id)));
    }
    Ok(())
}

fn ensure_product(conn: &Connection, product_id: i64) -> DbResult<()> {
    if !exists(conn, "SELECT 1 FROM Products WHERE product_id = ?1", [product_id])? {
        return Err(DbError::not_found("Product", product_id));
    }
    Ok(())
}

fn validate_product(product: &NewProduct) -> DbResult<()> {
    require_text("product_name", &product.product_name)?;
    require_text("language_code", &product.language_code)?;
    require_non_negative("base_unit_price", product.base_unit_price)?;
    if let Some(weight) = product.weight {
        require_non_negative("weight", weight)?;
    }
    Ok(())
}

fn insert_product(conn: &Connection, product: &NewProduct) -> DbResult<i64> {
    let code = product.product_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    conn.execute(
        INSERT_PRODUCT,
        params![
            product.product_name.trim(),
            code,
            product.description,
            product.category,
            product.language_code.trim(),
            product.base_unit_price,
            product.unit_of_measure,
            product.weight,
            product.dimensions,
            now_iso()
        ],
    )
    .map_err(|e| {
        let err = DbError::from(e).for_entity("Product");
        let err = with_holder(
            err,
            conn,
            "SELECT product_id FROM Products WHERE product_name = ?1 AND language_code = ?2 AND is_deleted = 0",
            params![product.product_name.trim(), product.language_code.trim()],
        );
        match code {
            Some(code) => with_holder(err, conn, "SELECT product_id FROM Products WHERE product_code = ?1 AND is_deleted = 0", [code]),
            None => err,
        }
    })?;
    Ok(conn.last_insert_rowid())
}

pub struct Products<'a> {
    session: Session<'a>,
}

impl<'a> Products<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, product: &NewProduct) -> DbResult<i64> {
        validate_product(product)?;
        self.session.run(|conn| insert_product(conn, product))
    }

    /// Returns the live product with this name and language, inserting it if needed.
    pub fn get_or_add(&self, product: &NewProduct) -> DbResult<Resolved<i64>> {
        validate_product(product)?;
        self.session.run(|conn| {
            let existing: Option<Product> = fetch_one(
                conn,
                SELECT_PRODUCT_BY_NAME,
                params![product.product_name.trim(), product.language_code.trim()],
            )?;
            match existing {
                Some(product) => Ok(Resolved::existing(product.product_id)),
                None => Ok(Resolved::created(insert_product(conn, product)?)),
            }
        })
    }

    /// The product together with its media links.
    pub fn get(&self, product_id: i64, include_deleted: bool) -> DbResult<Option<Product>> {
        let sql = if include_deleted { SELECT_PRODUCT_BY_ID } else { SELECT_LIVE_PRODUCT_BY_ID };
        self.session.run(|conn| {
            let Some(mut product) = fetch_one::<Product, _>(conn, sql, [product_id])? else {
                return Ok(None);
            };
            product.media_links = Session::within(conn).product_media().list_for_product(product_id)?;
            Ok(Some(product))
        })
    }

    pub fn get_by_code(&self, product_code: &str) -> DbResult<Option<Product>> {
        self.session.run(|conn| fetch_one(conn, SELECT_PRODUCT_BY_CODE, [product_code.trim()]))
    }

    pub fn get_by_name(&self, product_name: &str, language_code: &str) -> DbResult<Option<Product>> {
        self.session
            .run(|conn| fetch_one(conn, SELECT_PRODUCT_BY_NAME, params![product_name.trim(), language_code.trim()]))
    }

    fn conditions(filter: &ProductFilter) -> Conditions {
        let mut conditions = Conditions::new();
        if !filter.include_deleted {
            conditions.push_raw("is_deleted = 0");
        }
        conditions
            .push_opt("category = ?", filter.category.clone())
            .push_opt("language_code = ?", filter.language_code.clone())
            .push_opt("base_unit_price >= ?", filter.min_price)
            .push_opt("base_unit_price <= ?", filter.max_price)
            .push_opt("is_active = ?", filter.is_active);
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push("product_name LIKE ?", format!("%{}%", search));
        }
        conditions
    }

    pub fn list(&self, filter: &ProductFilter, page: Page) -> DbResult<Vec<Product>> {
        let conditions = Self::conditions(filter);
        let tail = format!(" ORDER BY product_name, language_code{}", page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_PRODUCTS, &tail))
    }

    pub fn count(&self, filter: &ProductFilter) -> DbResult<i64> {
        let conditions = Self::conditions(filter);
        let sql = format!("{}{}", COUNT_PRODUCTS, conditions.to_sql());
        self.session
            .run(|conn| Ok(conn.query_row(&sql, params_from_iter(conditions.params().iter()), |row| row.get(0))?))
    }

    pub fn update(&self, product_id: i64, changes: &Changes) -> DbResult<usize> {
        for field in ["base_unit_price", "weight"] {
            if let Some(value) = change_f64(changes, field)? {
                require_non_negative(field, value)?;
            }
        }
        self.session.run(|conn| {
            let affected = update_live_row(
                conn,
                "Products",
                "product_id",
                SqlValue::Integer(product_id),
                PRODUCT_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("Product"))?;
            found(affected, "Product", product_id)
        })
    }

    /// Soft delete; the product is also marked inactive. Links and
    /// equivalencies are kept but hidden from default readers.
    pub fn delete(&self, product_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            soft_delete(conn, "Products", "product_id", SqlValue::Integer(product_id), "Product", ", is_active = 0")
        })
    }
}

pub struct ProductMediaLinks<'a> {
    session: Session<'a>,
}

impl<'a> ProductMediaLinks<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Links a media item; linking it twice returns the existing link.
    /// Without an explicit order the item goes last.
    pub fn link(&self, product_id: i64, media_item_id: &str, display_order: Option<i64>, alt_text: Option<&str>) -> DbResult<Resolved<i64>> {
        require_text("media_item_id", media_item_id)?;
        self.session.run(|conn| {
            ensure_product(conn, product_id)?;
            if let Some(link) = fetch_one::<MediaLink, _>(conn, SELECT_MEDIA_LINK, params![product_id, media_item_id])? {
                return Ok(Resolved::existing(link.link_id));
            }
            let order = match display_order {
                Some(order) => order,
                None => conn.query_row(NEXT_MEDIA_ORDER, [product_id], |row| row.get(0))?,
            };
            conn.execute(INSERT_MEDIA_LINK, params![product_id, media_item_id, order, alt_text, now_iso()])?;
            Ok(Resolved::created(conn.last_insert_rowid()))
        })
    }

    pub fn list_for_product(&self, product_id: i64) -> DbResult<Vec<MediaLink>> {
        self.session.run(|conn| fetch_all(conn, SELECT_MEDIA_LINKS, [product_id]))
    }

    pub fn unlink(&self, product_id: i64, media_item_id: &str) -> DbResult<()> {
        self.session.run(|conn| {
            found(conn.execute(DELETE_MEDIA_LINK, params![product_id, media_item_id])?, "MediaLink", media_item_id)?;
            Ok(())
        })
    }

    /// Rewrites display order to follow `media_item_ids`.
    pub fn reorder(&self, product_id: i64, media_item_ids: &[&str]) -> DbResult<()> {
        self.session.run(|conn| {
            for (order, media_item_id) in media_item_ids.iter().enumerate() {
                let affected = conn.execute(UPDATE_MEDIA_ORDER, params![product_id, media_item_id, order as i64])?;
                found(affected, "MediaLink", media_item_id)?;
            }
            Ok(())
        })
    }
}

pub struct ProductDimensions<'a> {
    session: Session<'a>,
}

impl<'a> ProductDimensions<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Inserts the dimension row, or merges into it: only supplied keys change.
    pub fn add_or_update(&self, product_id: i64, dimensions: &Changes) -> DbResult<()> {
        let mut accepted = filter_changes(dimensions, DIMENSION_COLUMNS);
        // Dimension columns are text; numbers are kept as written.
        for value in accepted.values_mut() {
            if let serde_json::Value::Number(n) = value {
                *value = serde_json::Value::String(n.to_string());
            }
        }
        if accepted.is_empty() {
            return Err(DbError::validation("dimensions", "no dimension fields supplied"));
        }

        self.session.run(|conn| {
            ensure_live_product(conn, product_id)?;
            if exists(conn, "SELECT 1 FROM ProductDimensions WHERE product_id = ?1", [product_id])? {
                update_row(
                    conn,
                    "ProductDimensions",
                    "product_id",
                    SqlValue::Integer(product_id),
                    DIMENSION_COLUMNS,
                    &accepted,
                    Some("updated_at"),
                )?;
                return Ok(());
            }

            let now = now_iso();
            let mut columns = vec!["product_id", "created_at", "updated_at"];
            let mut values = vec![SqlValue::Integer(product_id), SqlValue::Text(now.clone()), SqlValue::Text(now)];
            for (column, value) in &accepted {
                columns.push(column.as_str());
                values.push(json_to_sql(value));
            }
            let sql = format!(
                "INSERT INTO ProductDimensions ({}) VALUES ({})",
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            );
            conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(())
        })
    }

    pub fn get(&self, product_id: i64) -> DbResult<Option<Dimensions>> {
        self.session.run(|conn| fetch_one(conn, SELECT_DIMENSIONS, [product_id]))
    }

    pub fn delete(&self, product_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "ProductDimensions", "product_id", SqlValue::Integer(product_id), "Dimensions")
        })
    }
}

pub struct ProductEquivalencies<'a> {
    session: Session<'a>,
}

impl<'a> ProductEquivalencies<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// Records that two products are interchangeable. The pair is stored
    /// smaller id first; adding it again, in either order, returns the
    /// existing id.
    pub fn add(&self, product_x: i64, product_y: i64) -> DbResult<Resolved<i64>> {
        if product_x == product_y {
            return Err(DbError::conflict("Equivalency", format!("product {} cannot be equivalent to itself", product_x)));
        }
        let (a, b) = (product_x.min(product_y), product_x.max(product_y));

        self.session.run(|conn| {
            ensure_product(conn, a)?;
            ensure_product(conn, b)?;
            if let Some(existing) = fetch_one::<Equivalency, _>(conn, SELECT_EQUIVALENCY_PAIR, params![a, b])? {
                msg_debug!(Message::EquivalencyExists(existing.equivalence_id));
                return Ok(Resolved::existing(existing.equivalence_id));
            }
            conn.execute(INSERT_EQUIVALENCY, params![a, b, now_iso()])?;
            Ok(Resolved::created(conn.last_insert_rowid()))
        })
    }

    /// Products equivalent to `product_id`, from either side of the pair.
    pub fn get_equivalent_products(&self, product_id: i64, include_deleted: bool) -> DbResult<Vec<Product>> {
        let mut sql = SELECT_EQUIVALENT_PRODUCTS.to_string();
        if !include_deleted {
            sql.push_str(" AND p.is_deleted = 0");
        }
        sql.push_str(" ORDER BY p.product_name, p.product_id");
        self.session.run(|conn| fetch_all(conn, &sql, [product_id]))
    }

    /// Every stored pair; pairs touching a soft-deleted product are hidden by default.
    pub fn list_all(&self, include_deleted: bool) -> DbResult<Vec<Equivalency>> {
        let sql = if include_deleted {
            format!("{} ORDER BY e.product_id_a, e.product_id_b", SELECT_EQUIVALENCIES)
        } else {
            format!("{}{} ORDER BY e.product_id_a, e.product_id_b", SELECT_EQUIVALENCIES, LIVE_EQUIVALENCIES)
        };
        self.session.run(|conn| fetch_all(conn, &sql, []))
    }

    pub fn remove(&self, equivalence_id: i64) -> DbResult<()> {
        self.session.run(|conn| {
            hard_delete(conn, "ProductEquivalencies", "equivalence_id", SqlValue::Integer(equivalence_id), "Equivalency")
        })
    }

    pub fn remove_pair(&self, product_x: i64, product_y: i64) -> DbResult<()> {
        let (a, b) = (product_x.min(product_y), product_x.max(product_y));
        self.session.run(|conn| {
            let affected = conn.execute("DELETE FROM ProductEquivalencies WHERE product_id_a = ?1 AND product_id_b = ?2", params![a, b])?;
            found(affected, "Equivalency", format!("{}-{}", a, b))?;
            Ok(())
        })
    }
}
