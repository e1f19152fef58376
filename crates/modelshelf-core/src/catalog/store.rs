//! SQLite-backed catalog store.

use super::{CatalogEntry, CatalogStats, ModelFileRecord, RefCategory, UNKNOWN_CREATOR};
use crate::error::{OrganizerError, Result};
use crate::hashing::is_content_hash;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Transactional catalog of model files.
///
/// The store is owned by a single organizer and accessed from one thread.
/// Writes require `&mut self` through [`CatalogStore::transaction`], so at
/// most one transaction is open at a time.
pub struct CatalogStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl CatalogStore {
    /// Open (or create) a catalog database at the given path.
    ///
    /// Creates the parent directory, the schema and the sentinel creator if
    /// they don't exist.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| OrganizerError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| OrganizerError::Database {
            message: format!("Failed to open catalog database: {}", e),
            source: Some(e),
        })?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;

        Self::from_connection(conn, Some(db_path.to_path_buf()))
    }

    /// Open a throwaway catalog held in memory.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::ensure_schema(&conn)?;
        conn.execute(
            "INSERT OR IGNORE INTO creators (name) VALUES (?1)",
            params![UNKNOWN_CREATOR],
        )?;

        Ok(Self { conn, db_path })
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS base_models (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS creators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type_id INTEGER NOT NULL REFERENCES types (id),
                base_model_id INTEGER NOT NULL REFERENCES base_models (id),
                creator_id INTEGER REFERENCES creators (id) DEFAULT NULL
            );

            CREATE TABLE IF NOT EXISTS model_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT UNIQUE NOT NULL,
                hash TEXT UNIQUE NOT NULL,
                entry_id INTEGER UNIQUE REFERENCES catalog_entries (id) DEFAULT NULL
            );
            "#,
        )
        .map_err(|e| OrganizerError::Database {
            message: format!("Failed to initialize catalog schema: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    /// Database file path, `None` for in-memory catalogs.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Begin staging writes for one file.
    pub fn transaction(&mut self) -> Result<CatalogTransaction<'_>> {
        Ok(CatalogTransaction {
            tx: self.conn.transaction()?,
        })
    }

    pub fn exists_by_path(&self, path: &str) -> Result<bool> {
        exists_by_path(&self.conn, path)
    }

    pub fn exists_by_hash(&self, hash: &str) -> Result<bool> {
        exists_by_hash(&self.conn, hash)
    }

    /// Look up a reference id without creating it.
    pub fn ref_id(&self, category: RefCategory, name: &str) -> Result<Option<i64>> {
        ref_id(&self.conn, category, name)
    }

    pub fn find_by_path(&self, path: &str) -> Result<Option<ModelFileRecord>> {
        self.conn
            .query_row(
                "SELECT id, path, hash, entry_id FROM model_files WHERE path = ?1",
                params![path],
                row_to_model_file,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_hash(&self, hash: &str) -> Result<Option<ModelFileRecord>> {
        self.conn
            .query_row(
                "SELECT id, path, hash, entry_id FROM model_files WHERE hash = ?1",
                params![hash],
                row_to_model_file,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a catalog entry with reference names resolved.
    pub fn entry(&self, entry_id: i64) -> Result<Option<CatalogEntry>> {
        self.conn
            .query_row(
                "SELECT e.id, t.name, b.name, c.name
                 FROM catalog_entries e
                 JOIN types t ON t.id = e.type_id
                 JOIN base_models b ON b.id = e.base_model_id
                 LEFT JOIN creators c ON c.id = e.creator_id
                 WHERE e.id = ?1",
                params![entry_id],
                |row| {
                    Ok(CatalogEntry {
                        id: row.get(0)?,
                        model_type: row.get(1)?,
                        base_model: row.get(2)?,
                        creator: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Catalog entry linked from the model file at `path`, if any.
    pub fn entry_for_path(&self, path: &str) -> Result<Option<CatalogEntry>> {
        match self.find_by_path(path)?.and_then(|record| record.entry_id) {
            Some(entry_id) => self.entry(entry_id),
            None => Ok(None),
        }
    }

    /// All model files ordered by path.
    pub fn model_files(&self) -> Result<Vec<ModelFileRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, path, hash, entry_id FROM model_files ORDER BY path")?;
        let records = stmt
            .query_map([], row_to_model_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        let count = |table: &str| -> Result<u64> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as u64)
        };

        Ok(CatalogStats {
            model_files: count("model_files")?,
            catalog_entries: count("catalog_entries")?,
            types: count(RefCategory::Type.table())?,
            base_models: count(RefCategory::BaseModel.table())?,
            creators: count(RefCategory::Creator.table())?,
        })
    }
}

/// Staged catalog writes for one file.
///
/// Dropping the transaction without calling [`commit`](Self::commit) rolls
/// every staged write back.
pub struct CatalogTransaction<'a> {
    tx: Transaction<'a>,
}

impl CatalogTransaction<'_> {
    /// Resolve a reference name to its id, inserting it if absent.
    ///
    /// Insert-ignoring-conflict followed by a select. The check-then-act
    /// window is only safe because the store has a single writer; shared
    /// access would need an upsert that returns the existing row.
    pub fn get_or_create_ref(&self, category: RefCategory, name: &str) -> Result<i64> {
        let table = category.table();
        let inserted = self.tx.execute(
            &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", table),
            params![name],
        )?;
        if inserted > 0 {
            debug!("Created {} reference {:?}", category, name);
        }

        ref_id(&self.tx, category, name)?.ok_or_else(|| {
            OrganizerError::Other(format!("{} reference {:?} vanished after insert", table, name))
        })
    }

    /// Create a catalog entry from already-resolved references.
    pub fn create_entry(
        &self,
        type_id: i64,
        base_model_id: i64,
        creator_id: Option<i64>,
    ) -> Result<i64> {
        self.tx
            .execute(
                "INSERT INTO catalog_entries (type_id, base_model_id, creator_id)
                 VALUES (?1, ?2, ?3)",
                params![type_id, base_model_id, creator_id],
            )
            .map_err(|e| map_insert_error("catalog_entries", e))?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Record a model file, optionally linked to a catalog entry.
    ///
    /// A path, hash or entry that is already linked is a
    /// [`OrganizerError::CatalogConflict`].
    pub fn link_model(&self, path: &str, hash: &str, entry_id: Option<i64>) -> Result<i64> {
        if !is_content_hash(hash) {
            return Err(OrganizerError::Other(format!(
                "Refusing to record {} with malformed hash {:?}",
                path, hash
            )));
        }
        self.tx
            .execute(
                "INSERT INTO model_files (path, hash, entry_id) VALUES (?1, ?2, ?3)",
                params![path, hash, entry_id],
            )
            .map_err(|e| map_insert_error("model_files", e))?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn exists_by_path(&self, path: &str) -> Result<bool> {
        exists_by_path(&self.tx, path)
    }

    pub fn exists_by_hash(&self, hash: &str) -> Result<bool> {
        exists_by_hash(&self.tx, hash)
    }

    /// Make every staged write durable.
    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(|e| OrganizerError::Database {
            message: format!("Failed to commit catalog transaction: {}", e),
            source: Some(e),
        })
    }

    /// Discard every staged write.
    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

fn exists_by_path(conn: &Connection, path: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM model_files WHERE path = ?1",
            params![path],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn exists_by_hash(conn: &Connection, hash: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM model_files WHERE hash = ?1",
            params![hash],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn ref_id(conn: &Connection, category: RefCategory, name: &str) -> Result<Option<i64>> {
    conn.query_row(
        &format!("SELECT id FROM {} WHERE name = ?1", category.table()),
        params![name],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

fn row_to_model_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModelFileRecord> {
    Ok(ModelFileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        hash: row.get(2)?,
        entry_id: row.get(3)?,
    })
}

/// Turn a UNIQUE violation into a catalog conflict; pass anything else through.
fn map_insert_error(table: &str, err: rusqlite::Error) -> OrganizerError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            OrganizerError::CatalogConflict {
                table: table.to_string(),
                message: message.clone().unwrap_or_else(|| failure.to_string()),
            }
        }
        _ => err.into(),
    }
}
