use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::import::ImportRecord;
use crate::model::category::{validate_name, validate_weight};
use crate::model::{Category, Impression, Item, DEFAULT_WEIGHT};
use crate::selection::fair_share::{compute_shares, CategoryShare};
use crate::store::{queries, schema};
use crate::types::error::{EpigramError, NotFoundError, StoreError, ValidationError};
use crate::types::identifiers::{ImpressionId, ItemId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Counts returned by a committed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub items: usize,
    pub categories_created: usize,
}

/// Durable category/item/impression storage backed by SQLite.
///
/// One connection behind a mutex: every public operation runs to completion
/// before the next begins, so the store can be shared across threads.
pub struct EpigramStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl EpigramStore {
    /// Open (or create) a store file, creating missing parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EpigramError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), "opened epigram store");
        Ok(store)
    }

    /// A private, non-persistent store.
    pub fn open_in_memory() -> Result<Self, EpigramError> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, EpigramError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        schema::bootstrap(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, EpigramError> {
        self.conn.lock().map_err(|_| EpigramError::from(StoreError::Poisoned))
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction. Any error rolls back.
    pub(crate) fn write_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, EpigramError>,
    ) -> Result<T, EpigramError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T, EpigramError>) -> Result<T, EpigramError> {
        let conn = self.lock()?;
        f(&conn)
    }

    // Categories

    /// Return the category called `name`, creating it with `weight` if absent.
    /// An existing category is returned unchanged, whatever `weight` says.
    pub fn put_category(&self, name: &str, weight: i64) -> Result<Category, EpigramError> {
        validate_name(name)?;
        let weight = validate_weight(weight)?;
        self.write_transaction(|tx| {
            let (category, created) = queries::ensure_category(tx, name, weight)?;
            if created {
                tracing::debug!(name, weight, "created category");
            }
            Ok(category)
        })
    }

    pub fn get_category(&self, name: &str) -> Result<Option<Category>, EpigramError> {
        self.read(|conn| queries::category_by_name(conn, name))
    }

    /// All categories, ordered by name.
    pub fn list_categories(&self) -> Result<Vec<Category>, EpigramError> {
        self.read(queries::list_categories)
    }

    pub fn update_category_weight(&self, name: &str, weight: i64) -> Result<(), EpigramError> {
        let weight = validate_weight(weight)?;
        self.write_transaction(|tx| {
            if queries::update_weight(tx, name, weight)? == 0 {
                return Err(NotFoundError::Category(name.to_string()).into());
            }
            tracing::debug!(name, weight, "updated category weight");
            Ok(())
        })
    }

    // Items

    /// Store a new item in `category`. Always creates a fresh identity.
    pub fn put_item(&self, content: &str, category: &Category) -> Result<Item, EpigramError> {
        let item = Item::new(content, category.id)?;
        self.write_transaction(|tx| {
            queries::insert_item(tx, &item, Utc::now()).map_err(|e| foreign_key_to_not_found(e, category))?;
            Ok(item)
        })
    }

    pub fn get_item(&self, id: ItemId) -> Result<Option<Item>, EpigramError> {
        self.read(|conn| queries::item_by_id(conn, id))
    }

    /// Every item of the named category in insertion order, regardless of length.
    pub fn items_in_category(&self, name: &str) -> Result<Vec<Item>, EpigramError> {
        self.read(|conn| {
            let category = queries::category_by_name(conn, name)?
                .ok_or_else(|| NotFoundError::Category(name.to_string()))?;
            queries::items_in_category(conn, category.id)
        })
    }

    /// Move an item to another category. Impressions already recorded keep
    /// the category the item had when it was shown.
    pub fn recategorize_item(&self, id: ItemId, category_name: &str) -> Result<Item, EpigramError> {
        self.write_transaction(|tx| {
            let category = queries::category_by_name(tx, category_name)?
                .ok_or_else(|| NotFoundError::Category(category_name.to_string()))?;
            if queries::move_item(tx, id, category.id)? == 0 {
                return Err(NotFoundError::Item(id).into());
            }
            queries::item_by_id(tx, id)?.ok_or_else(|| NotFoundError::Item(id).into())
        })
    }

    // Ingestion

    /// Import a lazy stream of records as one transaction.
    ///
    /// Categories are resolved by name and created with the default weight
    /// when missing. The first error, whether yielded by the producer or
    /// raised while storing, rolls back the whole batch.
    pub fn import<I>(&self, records: I) -> Result<ImportSummary, EpigramError>
    where
        I: IntoIterator<Item = Result<ImportRecord, EpigramError>>,
    {
        let summary = self.write_transaction(|tx| {
            let mut summary = ImportSummary::default();
            for record in records {
                import_record(tx, record?, &mut summary)?;
            }
            Ok(summary)
        })?;

        tracing::info!(
            items = summary.items,
            categories_created = summary.categories_created,
            "import complete"
        );
        Ok(summary)
    }

    /// Single-item insert: the import path with one record.
    pub fn insert(&self, content: &str, category: &str) -> Result<Item, EpigramError> {
        let record = ImportRecord::new(content, category);
        self.write_transaction(|tx| import_record(tx, record, &mut ImportSummary::default()))
    }

    // Impressions

    /// Record that `id` was shown: append an impression and stamp the item,
    /// atomically.
    pub fn record_impression(&self, id: ItemId) -> Result<Impression, EpigramError> {
        self.write_transaction(|tx| {
            let item = queries::item_by_id(tx, id)?.ok_or(NotFoundError::Item(id))?;
            let (impression, _) = queries::insert_impression(tx, &item)?;
            tracing::debug!(item = %id, impression = %impression.id, "impression tracked");
            Ok(impression)
        })
    }

    /// Total impressions, or only those recorded against `category_name`.
    pub fn count_impressions(&self, category_name: Option<&str>) -> Result<u64, EpigramError> {
        self.read(|conn| queries::count_impressions(conn, category_name))
    }

    pub fn get_impression(&self, id: ImpressionId) -> Result<Option<Impression>, EpigramError> {
        self.read(|conn| queries::impression_by_id(conn, id))
    }

    pub fn last_impression(&self) -> Result<Option<Impression>, EpigramError> {
        self.read(queries::last_impression)
    }

    /// Operator "keep this one" marker.
    pub fn mark_saved(&self, id: ImpressionId) -> Result<Impression, EpigramError> {
        self.write_transaction(|tx| {
            if queries::set_saved(tx, id)? == 0 {
                return Err(NotFoundError::Impression(id).into());
            }
            queries::impression_by_id(tx, id)?.ok_or_else(|| NotFoundError::Impression(id).into())
        })
    }

    /// Attach externally produced text to an impression.
    pub fn annotate_impression(&self, id: ImpressionId, text: &str) -> Result<Impression, EpigramError> {
        self.write_transaction(|tx| {
            if queries::set_annotation(tx, id, text)? == 0 {
                return Err(NotFoundError::Impression(id).into());
            }
            queries::impression_by_id(tx, id)?.ok_or_else(|| NotFoundError::Impression(id).into())
        })
    }

    // Reporting

    /// Every category's configured weight and observed share, most-shown first.
    pub fn category_report(&self) -> Result<Vec<CategoryShare>, EpigramError> {
        let tallies = self.read(queries::tallies)?;
        let mut shares = compute_shares(&tallies);
        shares.sort_by(|a, b| {
            b.actual_share
                .total_cmp(&a.actual_share)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(shares)
    }
}

fn import_record(tx: &Connection, record: ImportRecord, summary: &mut ImportSummary) -> Result<Item, EpigramError> {
    if record.category.trim().is_empty() {
        return Err(ValidationError::MissingCategory.into());
    }
    let (category, created) = queries::ensure_category(tx, &record.category, DEFAULT_WEIGHT)?;
    if created {
        tracing::debug!(name = %category.name, "created category");
        summary.categories_created += 1;
    }
    let item = Item::new(record.content, category.id)?;
    tracing::debug!(item = %item.id, category = %category.name, "inserting item");
    queries::insert_item(tx, &item, Utc::now())?;
    summary.items += 1;
    Ok(item)
}

fn foreign_key_to_not_found(e: EpigramError, category: &Category) -> EpigramError {
    match e {
        EpigramError::Store(StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            NotFoundError::Category(category.name.clone()).into()
        }
        e => e,
    }
}
