//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::{NormalizedProduct, Platform};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, platform, started_at, finished_at, config_hash, status, product_count, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        platform: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
        product_count: row.get::<_, i64>(6)? as usize,
        error_message: row.get(7)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, platform: Platform, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (platform, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                platform.display_name(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self, platform: Platform) -> StorageResult<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM runs WHERE platform = ?1 ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&sql, params![platform.display_name()], run_from_row)
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        product_count: usize,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, product_count = ?3, error_message = ?4 WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                product_count as i64,
                error_message,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Products =====

    fn insert_products(&mut self, run_id: i64, products: &[NormalizedProduct]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO products
                    (title, price, source_url, image_url, local_image_path, platform, category, run_id, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for product in products {
                inserted += stmt.execute(params![
                    product.title,
                    product.price,
                    product.source_url,
                    product.image_url,
                    product.local_image_path.to_string_lossy().into_owned(),
                    product.platform.display_name(),
                    product.category,
                    run_id,
                    now
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn count_products(&self, platform: Option<Platform>) -> StorageResult<usize> {
        let count: i64 = match platform {
            Some(p) => self.conn.query_row(
                "SELECT COUNT(*) FROM products WHERE platform = ?1",
                params![p.display_name()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn product(title: &str, url: &str) -> NormalizedProduct {
        NormalizedProduct {
            title: title.to_string(),
            price: "450".to_string(),
            source_url: url.to_string(),
            image_url: None,
            local_image_path: PathBuf::from(format!("images/{}.jpg", title)),
            platform: Platform::SiteB,
            category: "accessories".to_string(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_create_and_finish_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run(Platform::SiteB, "hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_latest_run(Platform::SiteB).unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.platform, "SiteB");

        storage.finish_run(run_id, RunStatus::Completed, 2, None).unwrap();
        let run = storage.get_latest_run(Platform::SiteB).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.product_count, 2);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.finish_run(42, RunStatus::Failed, 0, Some("boom")),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_latest_run_per_platform() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run(Platform::SiteA).unwrap().is_none());

        storage.create_run(Platform::SiteA, "h").unwrap();
        let second = storage.create_run(Platform::SiteA, "h").unwrap();
        storage.create_run(Platform::SiteC, "h").unwrap();

        assert_eq!(storage.get_latest_run(Platform::SiteA).unwrap().unwrap().id, second);
    }

    #[test]
    fn test_insert_products_ignores_duplicates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run(Platform::SiteB, "hash").unwrap();

        let batch = vec![
            product("Wireless Mouse", "https://www.jumia.com.eg/p/123"),
            product("Keyboard", "https://www.jumia.com.eg/p/456"),
        ];
        assert_eq!(storage.insert_products(run_id, &batch).unwrap(), 2);
        assert_eq!(storage.insert_products(run_id, &batch[..1]).unwrap(), 0);
        assert_eq!(storage.count_products(None).unwrap(), 2);
        assert_eq!(storage.count_products(Some(Platform::SiteA)).unwrap(), 0);

        let (title, platform, stored_run): (String, String, i64) = storage
            .conn
            .query_row(
                "SELECT title, platform, run_id FROM products WHERE source_url = ?1",
                params!["https://www.jumia.com.eg/p/123"],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(title, "Wireless Mouse");
        assert_eq!(platform, "SiteB");
        assert_eq!(stored_run, run_id);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("products.db");
        let mut storage = SqliteStorage::new(&path).unwrap();
        storage.create_run(Platform::SiteC, "hash").unwrap();
        assert!(path.exists());
    }
}
