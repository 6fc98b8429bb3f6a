//! Durable record of recycled entries, backed by a single SQLite file.
//!
//! Writes go through [`CatalogTransaction`], which holds the database write
//! lock until it is committed or dropped. Dropping without committing rolls
//! every change back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, instrument};

use crate::errors::{CoreError, Result};
use crate::models::{Entry, EntryId, Millis, StorageKey};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid CHAR(32) NOT NULL UNIQUE,
    original_path TEXT NOT NULL,
    deletion_time INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS retired_uuid (
    uuid CHAR(32) PRIMARY KEY
);
"#;

const SELECT_ENTRY: &str = "SELECT id, uuid, original_path, deletion_time FROM entry";

/// Open handle on the catalog database.
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Catalog {
    /// Opens (creating if needed) the catalog at `path`.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| CoreError::io(parent, err))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a private catalog that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path })
    }

    /// Location of the database file, `None` for in-memory catalogs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Starts a write transaction.
    pub fn begin(&mut self) -> Result<CatalogTransaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(CatalogTransaction { tx })
    }

    pub fn find_by_id(&self, id: EntryId) -> Result<Entry> {
        self.conn
            .query_row(&format!("{SELECT_ENTRY} WHERE id = ?1"), params![id], entry_from_row)
            .optional()?
            .ok_or_else(|| CoreError::not_found(format!("entry with id {id}")))
    }

    /// Entries whose original path starts with `prefix`, oldest first.
    ///
    /// Matching is byte-exact and case-sensitive. An empty prefix matches
    /// nothing.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Vec<Entry>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_ENTRY} WHERE substr(original_path, 1, length(?1)) = ?1 ORDER BY id"
        ))?;
        let entries = stmt
            .query_map(params![prefix], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Closes the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| CoreError::Database(err))
    }
}

/// Write scope over the catalog.
pub struct CatalogTransaction<'c> {
    tx: Transaction<'c>,
}

impl CatalogTransaction<'_> {
    /// Records a new entry and returns its id.
    pub fn insert(
        &mut self,
        storage_key: &StorageKey,
        original_path: &str,
        deletion_time: Millis,
    ) -> Result<EntryId> {
        let retired: bool = self.tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM retired_uuid WHERE uuid = ?1)",
            params![storage_key.as_str()],
            |row| row.get(0),
        )?;
        if retired {
            return Err(CoreError::ConstraintViolation(format!(
                "storage key {storage_key} was already used"
            )));
        }

        self.tx
            .execute(
                "INSERT INTO entry (uuid, original_path, deletion_time) VALUES (?1, ?2, ?3)",
                params![storage_key.as_str(), original_path, deletion_time],
            )
            .map_err(|err| match err {
                rusqlite::Error::SqliteFailure(failure, _)
                    if failure.code == ErrorCode::ConstraintViolation =>
                {
                    CoreError::ConstraintViolation(format!("storage key {storage_key} already exists"))
                }
                other => CoreError::Database(other),
            })?;
        let id = self.tx.last_insert_rowid();
        debug!(id, key = %storage_key, path = original_path, "inserted catalog entry");
        Ok(id)
    }

    /// Removes an entry and retires its storage key.
    pub fn delete(&mut self, id: EntryId) -> Result<()> {
        let key: Option<String> = self
            .tx
            .query_row("SELECT uuid FROM entry WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let key = key.ok_or_else(|| CoreError::not_found(format!("entry with id {id}")))?;

        self.tx.execute("DELETE FROM entry WHERE id = ?1", params![id])?;
        self.tx
            .execute("INSERT INTO retired_uuid (uuid) VALUES (?1)", params![key])?;
        debug!(id, key = %key, "deleted catalog entry");
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        storage_key: StorageKey::from(row.get::<_, String>(1)?),
        original_path: row.get(2)?,
        deletion_time: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(catalog: &mut Catalog, paths: &[&str]) -> Vec<EntryId> {
        let mut tx = catalog.begin().unwrap();
        let ids = paths
            .iter()
            .map(|path| tx.insert(&StorageKey::generate(), path, 1_000).unwrap())
            .collect();
        tx.commit().unwrap();
        ids
    }

    #[test]
    fn insert_then_find_by_id() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let key = StorageKey::generate();
        let mut tx = catalog.begin().unwrap();
        let id = tx.insert(&key, "/a/b/x.txt", 42).unwrap();
        tx.commit().unwrap();

        let entry = catalog.find_by_id(id).unwrap();
        assert_eq!(entry.storage_key, key);
        assert_eq!(entry.original_path, "/a/b/x.txt");
        assert_eq!(entry.deletion_time, 42);
    }

    #[test]
    fn missing_id_is_not_found() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(matches!(catalog.find_by_id(9), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn prefix_query_matches_file_and_directory_targets() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let ids = seed(&mut catalog, &["/a/b/x.txt", "/a/b/y.txt", "/a/c/z.txt"]);

        let under_b: Vec<EntryId> = catalog
            .find_by_prefix("/a/b")
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(under_b, vec![ids[0], ids[1]]);
        assert_eq!(catalog.find_by_prefix("/a").unwrap().len(), 3);
        assert_eq!(catalog.find_by_prefix("/a/c/z.txt").unwrap().len(), 1);
    }

    #[test]
    fn empty_prefix_matches_nothing() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        seed(&mut catalog, &["/a/b/x.txt"]);
        assert!(catalog.find_by_prefix("").unwrap().is_empty());
    }

    #[test]
    fn prefix_is_literal_and_case_sensitive() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        seed(&mut catalog, &["/data/a_b.txt", "/data/axb.txt", "/DATA/upper.txt"]);

        assert_eq!(catalog.find_by_prefix("/data/a_").unwrap().len(), 1);
        assert!(catalog.find_by_prefix("/data/%").unwrap().is_empty());
        assert_eq!(catalog.find_by_prefix("/data").unwrap().len(), 2);
    }

    #[test]
    fn duplicate_key_is_a_constraint_violation() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let key = StorageKey::generate();
        let mut tx = catalog.begin().unwrap();
        tx.insert(&key, "/x", 1).unwrap();
        let err = tx.insert(&key, "/y", 2).unwrap_err();
        assert!(matches!(err, CoreError::ConstraintViolation(_)));
    }

    #[test]
    fn retired_key_cannot_come_back() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let key = StorageKey::generate();
        let mut tx = catalog.begin().unwrap();
        let id = tx.insert(&key, "/x", 1).unwrap();
        tx.commit().unwrap();

        let mut tx = catalog.begin().unwrap();
        tx.delete(id).unwrap();
        tx.commit().unwrap();

        let mut tx = catalog.begin().unwrap();
        let err = tx.insert(&key, "/x", 2).unwrap_err();
        assert!(matches!(err, CoreError::ConstraintViolation(_)));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let mut tx = catalog.begin().unwrap();
        assert!(matches!(tx.delete(1), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        {
            let mut tx = catalog.begin().unwrap();
            tx.insert(&StorageKey::generate(), "/a/x", 1).unwrap();
            tx.insert(&StorageKey::generate(), "/a/y", 1).unwrap();
        }
        assert!(catalog.find_by_prefix("/a").unwrap().is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let first = seed(&mut catalog, &["/a/x"])[0];
        let mut tx = catalog.begin().unwrap();
        tx.delete(first).unwrap();
        tx.commit().unwrap();

        let second = seed(&mut catalog, &["/a/y"])[0];
        assert!(second > first);
    }

    #[test]
    fn reopens_persisted_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("var/main.db");

        let mut catalog = Catalog::open(&path).unwrap();
        seed(&mut catalog, &["/a/x"]);
        catalog.close().unwrap();

        let catalog = Catalog::open(&path).unwrap();
        assert_eq!(catalog.path(), Some(path.as_path()));
        assert_eq!(catalog.find_by_prefix("/a").unwrap().len(), 1);
    }
}
