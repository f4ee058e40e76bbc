//! Statement-level helpers. Every function here takes a bare `Connection`
//! so callers decide the transaction boundary; `rusqlite::Transaction`
//! derefs to `Connection` and can be passed straight through.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{Category, Impression, Item};
use crate::selection::fair_share::CategoryTally;
use crate::types::error::{EpigramError, StoreError};
use crate::types::identifiers::{CategoryId, ImpressionId, ItemId};

const CATEGORY_COLUMNS: &str = "category_id, name, weight";
const ITEM_COLUMNS: &str = "item_id, category_id, content, last_shown_at";
const IMPRESSION_COLUMNS: &str = "impression_id, item_id, category_id, shown_at, saved, annotation";

fn timestamp(idx: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, "timestamp out of range".into())
    })
}

fn item_id(idx: usize, raw: String) -> rusqlite::Result<ItemId> {
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let weight: i64 = row.get(2)?;
    let weight = u32::try_from(weight)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e)))?;
    Ok(Category {
        id: CategoryId::new(row.get(0)?),
        name: row.get(1)?,
        weight,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let last_shown_at = match row.get::<_, Option<i64>>(3)? {
        Some(micros) => Some(timestamp(3, micros)?),
        None => None,
    };
    Ok(Item {
        id: item_id(0, row.get(0)?)?,
        category_id: CategoryId::new(row.get(1)?),
        content: row.get(2)?,
        last_shown_at,
    })
}

fn impression_from_row(row: &Row<'_>) -> rusqlite::Result<Impression> {
    Ok(Impression {
        id: ImpressionId::new(row.get(0)?),
        item_id: item_id(1, row.get(1)?)?,
        category_id: CategoryId::new(row.get(2)?),
        shown_at: timestamp(3, row.get(3)?)?,
        saved: row.get(4)?,
        annotation: row.get(5)?,
    })
}

// Categories

pub fn category_by_name(conn: &Connection, name: &str) -> Result<Option<Category>, EpigramError> {
    let category = conn
        .query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM category WHERE name = ?1"),
            params![name],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

/// Returns the category and whether this call created it.
pub fn ensure_category(conn: &Connection, name: &str, weight: u32) -> Result<(Category, bool), EpigramError> {
    let created = conn.execute(
        "INSERT INTO category (name, weight) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, weight],
    )? > 0;

    let category = category_by_name(conn, name)?.ok_or_else(|| {
        StoreError::Corrupt(format!("category {name} vanished after insert"))
    })?;
    Ok((category, created))
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>, EpigramError> {
    let mut stmt = conn.prepare(&format!("SELECT {CATEGORY_COLUMNS} FROM category ORDER BY name"))?;
    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(categories)
}

/// Returns the number of rows touched (0 when the name is unknown).
pub fn update_weight(conn: &Connection, name: &str, weight: u32) -> Result<usize, EpigramError> {
    Ok(conn.execute(
        "UPDATE category SET weight = ?2 WHERE name = ?1",
        params![name, weight],
    )?)
}

/// Every category with its impression count, ordered by name.
pub fn tallies(conn: &Connection) -> Result<Vec<CategoryTally>, EpigramError> {
    let mut stmt = conn.prepare(
        "SELECT c.category_id, c.name, c.weight, COUNT(i.impression_id)
         FROM category c
         LEFT JOIN impression i ON i.category_id = c.category_id
         GROUP BY c.category_id
         ORDER BY c.name",
    )?;
    let tallies = stmt
        .query_map([], |row| {
            let impressions: i64 = row.get(3)?;
            Ok(CategoryTally {
                category: category_from_row(row)?,
                impressions: impressions.max(0) as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tallies)
}

/// Like [`tallies`], restricted to categories holding at least one item
/// shorter than `length_cap`.
pub fn selectable_tallies(conn: &Connection, length_cap: usize) -> Result<Vec<CategoryTally>, EpigramError> {
    let mut stmt = conn.prepare(
        "SELECT c.category_id, c.name, c.weight,
                (SELECT COUNT(*) FROM impression i WHERE i.category_id = c.category_id)
         FROM category c
         WHERE EXISTS (
             SELECT 1 FROM item it
             WHERE it.category_id = c.category_id AND length(it.content) < ?1
         )
         ORDER BY c.name",
    )?;
    let tallies = stmt
        .query_map(params![cap_param(length_cap)], |row| {
            let impressions: i64 = row.get(3)?;
            Ok(CategoryTally {
                category: category_from_row(row)?,
                impressions: impressions.max(0) as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tallies)
}

pub fn has_categories(conn: &Connection) -> Result<bool, EpigramError> {
    Ok(conn.query_row("SELECT EXISTS (SELECT 1 FROM category)", [], |row| row.get(0))?)
}

// Items

pub fn insert_item(conn: &Connection, item: &Item, created_at: DateTime<Utc>) -> Result<(), EpigramError> {
    conn.execute(
        "INSERT INTO item (item_id, category_id, content, created_at, last_shown_at)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![
            item.id.to_string(),
            item.category_id.get(),
            item.content,
            created_at.timestamp_micros()
        ],
    )?;
    Ok(())
}

pub fn item_by_id(conn: &Connection, id: ItemId) -> Result<Option<Item>, EpigramError> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM item WHERE item_id = ?1"),
            params![id.to_string()],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Items of one category in insertion order.
pub fn items_in_category(conn: &Connection, category: CategoryId) -> Result<Vec<Item>, EpigramError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM item WHERE category_id = ?1 ORDER BY rowid"
    ))?;
    let items = stmt
        .query_map(params![category.get()], item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn move_item(conn: &Connection, id: ItemId, category: CategoryId) -> Result<usize, EpigramError> {
    Ok(conn.execute(
        "UPDATE item SET category_id = ?2 WHERE item_id = ?1",
        params![id.to_string(), category.get()],
    )?)
}

/// Number of items in `category` short enough to be shown.
pub fn count_candidates(conn: &Connection, category: CategoryId, length_cap: usize) -> Result<usize, EpigramError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM item WHERE category_id = ?1 AND length(content) < ?2",
        params![category.get(), cap_param(length_cap)],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as usize)
}

/// The candidate at `offset` in staleness order: never-shown first, then
/// oldest `last_shown_at`, ties broken by insertion order.
pub fn candidate_at(
    conn: &Connection,
    category: CategoryId,
    length_cap: usize,
    offset: usize,
) -> Result<Option<Item>, EpigramError> {
    let item = conn
        .query_row(
            &format!(
                "SELECT {ITEM_COLUMNS} FROM item
                 WHERE category_id = ?1 AND length(content) < ?2
                 ORDER BY last_shown_at ASC NULLS FIRST, rowid ASC
                 LIMIT 1 OFFSET ?3"
            ),
            params![category.get(), cap_param(length_cap), offset as i64],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

fn cap_param(length_cap: usize) -> i64 {
    i64::try_from(length_cap).unwrap_or(i64::MAX)
}

// Impressions

/// Append an impression for `item` and stamp its `last_shown_at`.
///
/// Must run inside a transaction. The stamp is kept strictly greater than
/// any stamp already in the store so staleness ordering never ties on time.
pub fn insert_impression(conn: &Connection, item: &Item) -> Result<(Impression, Item), EpigramError> {
    let latest: Option<i64> = conn.query_row("SELECT MAX(last_shown_at) FROM item", [], |row| row.get(0))?;
    let mut now = Utc::now().timestamp_micros();
    if let Some(latest) = latest {
        now = now.max(latest + 1);
    }
    let shown_at = timestamp(0, now)?;

    conn.execute(
        "UPDATE item SET last_shown_at = ?2 WHERE item_id = ?1",
        params![item.id.to_string(), now],
    )?;
    conn.execute(
        "INSERT INTO impression (item_id, category_id, shown_at, saved) VALUES (?1, ?2, ?3, 0)",
        params![item.id.to_string(), item.category_id.get(), now],
    )?;

    let impression = Impression {
        id: ImpressionId::new(conn.last_insert_rowid()),
        item_id: item.id,
        category_id: item.category_id,
        shown_at,
        saved: false,
        annotation: None,
    };
    let mut shown = item.clone();
    shown.last_shown_at = Some(shown_at);
    Ok((impression, shown))
}

pub fn count_impressions(conn: &Connection, category_name: Option<&str>) -> Result<u64, EpigramError> {
    let count: i64 = match category_name {
        Some(name) => conn.query_row(
            "SELECT COUNT(*) FROM impression i
             JOIN category c ON c.category_id = i.category_id
             WHERE c.name = ?1",
            params![name],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM impression", [], |row| row.get(0))?,
    };
    Ok(count.max(0) as u64)
}

pub fn impression_by_id(conn: &Connection, id: ImpressionId) -> Result<Option<Impression>, EpigramError> {
    let impression = conn
        .query_row(
            &format!("SELECT {IMPRESSION_COLUMNS} FROM impression WHERE impression_id = ?1"),
            params![id.get()],
            impression_from_row,
        )
        .optional()?;
    Ok(impression)
}

pub fn last_impression(conn: &Connection) -> Result<Option<Impression>, EpigramError> {
    let impression = conn
        .query_row(
            &format!(
                "SELECT {IMPRESSION_COLUMNS} FROM impression
                 ORDER BY shown_at DESC, impression_id DESC LIMIT 1"
            ),
            [],
            impression_from_row,
        )
        .optional()?;
    Ok(impression)
}

pub fn set_saved(conn: &Connection, id: ImpressionId) -> Result<usize, EpigramError> {
    Ok(conn.execute(
        "UPDATE impression SET saved = 1 WHERE impression_id = ?1",
        params![id.get()],
    )?)
}

pub fn set_annotation(conn: &Connection, id: ImpressionId, text: &str) -> Result<usize, EpigramError> {
    Ok(conn.execute(
        "UPDATE impression SET annotation = ?2 WHERE impression_id = ?1",
        params![id.get(), text],
    )?)
}
