//! Database schema definitions
//!
//! This module contains the SQL schema of the optional product store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track site runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    product_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_platform ON runs(platform);

-- Normalized product records, one row per canonical product URL
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    price TEXT NOT NULL,
    source_url TEXT NOT NULL UNIQUE,
    image_url TEXT,
    local_image_path TEXT NOT NULL,
    platform TEXT NOT NULL,
    category TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_platform ON products(platform);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
