use rusqlite::Connection;

use crate::types::error::StoreError;

/// Bumped whenever a bootstrap step is added below.
pub const SCHEMA_VERSION: i32 = 1;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    weight INTEGER NOT NULL DEFAULT 1 CHECK (weight > 0)
);

CREATE TABLE IF NOT EXISTS item (
    item_id TEXT PRIMARY KEY,
    category_id INTEGER NOT NULL REFERENCES category(category_id),
    content TEXT NOT NULL CHECK (length(content) > 0),
    created_at INTEGER NOT NULL,
    last_shown_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_item_category_shown ON item(category_id, last_shown_at);
CREATE INDEX IF NOT EXISTS idx_item_shown ON item(last_shown_at);

CREATE TABLE IF NOT EXISTS impression (
    impression_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id TEXT NOT NULL REFERENCES item(item_id),
    category_id INTEGER NOT NULL REFERENCES category(category_id),
    shown_at INTEGER NOT NULL,
    saved INTEGER NOT NULL DEFAULT 0,
    annotation TEXT
);

CREATE INDEX IF NOT EXISTS idx_impression_category ON impression(category_id);
CREATE INDEX IF NOT EXISTS idx_impression_shown ON impression(shown_at);
"#;

/// Apply pragmas and create tables. Safe to run on every open.
pub fn bootstrap(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(PRAGMAS)?;

    let found: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    conn.execute_batch(SCHEMA)?;
    if found < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
        tracing::debug!(from = found, to = SCHEMA_VERSION, "schema version updated");
    }
    Ok(())
}
