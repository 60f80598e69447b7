pub mod store;

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::StoreError;

pub use store::Store;

/// Fixed key of the single custom-structure row.
pub const CUSTOM_STRUCTURE_KEY: &str = "customStructure";

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_records.sql",
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/migrations/001_create_records.sql"
        )),
    ),
    (
        "002_create_custom_structure.sql",
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/migrations/002_create_custom_structure.sql"
        )),
    ),
    (
        "003_create_settings_and_amortized_expenses.sql",
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/migrations/003_create_settings_and_amortized_expenses.sql"
        )),
    ),
    (
        "004_drop_amortized_expenses.sql",
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/migrations/004_drop_amortized_expenses.sql"
        )),
    ),
];

/// Version of the on-disk layout; one step per migration.
pub const STORE_VERSION: i64 = MIGRATIONS.len() as i64;

/// Collections dropped by an earlier version that must never come back.
const RETIRED_COLLECTIONS: &[&str] = &["amortized_expenses"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Records,
    CustomStructure,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Records,
        Collection::CustomStructure,
        Collection::Settings,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Records => "records",
            Collection::CustomStructure => "custom_structure",
            Collection::Settings => "settings",
        }
    }
}

/// A stored document and its key.
pub type Doc = (String, String);

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        let mut db = Database { conn };
        db.run_migrations()?;
        db.reconcile_collections()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        for (name, sql) in MIGRATIONS {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
                tracing::info!(migration = name, "applied store migration");
            }
        }

        self.conn.pragma_update(None, "user_version", STORE_VERSION)?;
        Ok(())
    }

    /// Drops retired collections and checks every current one exists.
    /// Only collection existence changes here, never documents.
    fn reconcile_collections(&self) -> Result<(), StoreError> {
        for retired in RETIRED_COLLECTIONS {
            if self.collection_exists(retired)? {
                self.conn.execute_batch(&format!("DROP TABLE {retired};"))?;
                tracing::info!(collection = retired, "dropped retired collection");
            }
        }

        for collection in Collection::ALL {
            if !self.collection_exists(collection.table())? {
                return Err(StoreError::Schema(format!(
                    "collection {} missing after migrations",
                    collection.table()
                )));
            }
        }
        Ok(())
    }

    pub fn store_version(&self) -> Result<i64, StoreError> {
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    pub fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_all(&self, collection: Collection) -> Result<Vec<Doc>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, doc FROM {} ORDER BY id ASC",
            collection.table()
        ))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let docs = rows.collect::<Result<Vec<Doc>, _>>()?;
        Ok(docs)
    }

    pub fn get(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT doc FROM {} WHERE id = ?1", collection.table()))?;
        let doc = stmt.query_row(params![id], |row| row.get(0)).optional()?;
        Ok(doc)
    }

    pub fn put(&self, collection: Collection, id: &str, doc: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, doc, updated_at) VALUES (?1, ?2, datetime('now'))",
                collection.table()
            ),
            params![id, doc],
        )?;
        Ok(())
    }

    /// Returns whether a document was removed; an absent key is not an error.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            params![id],
        )?;
        Ok(removed > 0)
    }

    /// All documents land or none do.
    pub fn bulk_put(&mut self, collection: Collection, docs: &[Doc]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} (id, doc, updated_at) VALUES (?1, ?2, datetime('now'))",
                collection.table()
            ))?;
            for (id, doc) in docs {
                stmt.execute(params![id, doc])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn clear(&self, collection: Collection) -> Result<usize, StoreError> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", collection.table()), [])?;
        Ok(removed)
    }

    pub fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Clears the records collection, inserts `records`, and replaces the
    /// custom-structure row, all in one transaction.
    pub fn replace_all(&mut self, records: &[Doc], structure_doc: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", Collection::Records.table()), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (id, doc, updated_at) VALUES (?1, ?2, datetime('now'))",
                Collection::Records.table()
            ))?;
            for (id, doc) in records {
                stmt.execute(params![id, doc])?;
            }
        }
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, doc, updated_at) VALUES (?1, ?2, datetime('now'))",
                Collection::CustomStructure.table()
            ),
            params![CUSTOM_STRUCTURE_KEY, structure_doc],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("daybook.sqlite")).unwrap();
        (db, temp_dir)
    }

    #[test]
    fn fresh_store_has_current_collections_only() {
        let (db, _temp_dir) = setup_test_db();
        for collection in Collection::ALL {
            assert!(db.collection_exists(collection.table()).unwrap());
        }
        assert!(!db.collection_exists("amortized_expenses").unwrap());
        assert_eq!(db.store_version().unwrap(), STORE_VERSION);
    }

    #[test]
    fn upgrade_drops_retired_collection_and_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("daybook.sqlite");

        // Lay down a version-3 store by hand.
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE schema_migrations (name TEXT PRIMARY KEY, applied_at TEXT NOT NULL);",
            )
            .unwrap();
            for (name, sql) in &MIGRATIONS[..3] {
                conn.execute_batch(sql).unwrap();
                conn.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )
                .unwrap();
            }
            conn.execute(
                "INSERT INTO records (id, doc, updated_at) VALUES ('2024-07-01', '{}', datetime('now'))",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO amortized_expenses (id, doc, updated_at) VALUES ('a1', '{}', datetime('now'))",
                [],
            )
            .unwrap();
        }

        let db = Database::new(&path).unwrap();
        assert!(!db.collection_exists("amortized_expenses").unwrap());
        assert_eq!(db.count(Collection::Records).unwrap(), 1);
        drop(db);

        let reopened = Database::new(&path).unwrap();
        assert!(!reopened.collection_exists("amortized_expenses").unwrap());
        assert_eq!(reopened.store_version().unwrap(), STORE_VERSION);
    }

    #[test]
    fn reconcile_drops_retired_collection_without_migration_history() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("daybook.sqlite");
        {
            let db = Database::new(&path).unwrap();
            db.conn
                .execute_batch("CREATE TABLE amortized_expenses (id TEXT PRIMARY KEY);")
                .unwrap();
        }
        let db = Database::new(&path).unwrap();
        assert!(!db.collection_exists("amortized_expenses").unwrap());
    }

    #[test]
    fn put_replaces_and_delete_is_idempotent() {
        let (db, _temp_dir) = setup_test_db();
        db.put(Collection::Settings, "currency", "\"USD\"").unwrap();
        db.put(Collection::Settings, "currency", "\"EUR\"").unwrap();
        assert_eq!(
            db.get(Collection::Settings, "currency").unwrap().as_deref(),
            Some("\"EUR\"")
        );
        assert_eq!(db.count(Collection::Settings).unwrap(), 1);

        assert!(db.delete(Collection::Settings, "currency").unwrap());
        assert!(!db.delete(Collection::Settings, "currency").unwrap());
    }

    #[test]
    fn replace_all_swaps_records_and_structure() {
        let (mut db, _temp_dir) = setup_test_db();
        db.put(Collection::Records, "2024-01-01", "{}").unwrap();
        db.put(Collection::Records, "2024-01-02", "{}").unwrap();

        let incoming = vec![("2024-02-01".to_string(), "{\"a\":1}".to_string())];
        db.replace_all(&incoming, "{}").unwrap();

        assert_eq!(db.count(Collection::Records).unwrap(), 1);
        let all = db.get_all(Collection::Records).unwrap();
        assert_eq!(all, incoming);
        assert!(db
            .get(Collection::CustomStructure, CUSTOM_STRUCTURE_KEY)
            .unwrap()
            .is_some());
    }

    #[test]
    fn replace_all_rolls_back_on_failure() {
        let (mut db, _temp_dir) = setup_test_db();
        db.put(Collection::Records, "2024-01-01", "{}").unwrap();

        // Duplicate keys violate the primary key inside the transaction.
        let incoming = vec![
            ("2024-02-01".to_string(), "{}".to_string()),
            ("2024-02-01".to_string(), "{}".to_string()),
        ];
        assert!(db.replace_all(&incoming, "{}").is_err());

        let all = db.get_all(Collection::Records).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, "2024-01-01");
    }
}
