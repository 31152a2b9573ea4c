//! The durable index store.
//!
//! Wraps a `SQLite` connection over a `documents`/`file_metadata` schema:
//! an FTS5 virtual table for full-text search and a plain table tracking
//! `(size, mtime)` per path for cheap change detection. Opening a store
//! validates the existing file (size, magic header, a trial connection)
//! and transparently rebuilds from scratch if any check fails.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use crate::constants::APPLICATION_ID_I32;
use crate::error::{IndexerError, Result};
use crate::fs_utils::sync_parent_dir;

const MIN_SQLITE_FILE_SIZE: u64 = 100;
const SQLITE_HEADER_SIGNATURE: &[u8; 16] = b"SQLite format 3\0";

const SCHEMA_SQL: &str = r"
CREATE VIRTUAL TABLE IF NOT EXISTS documents USING fts5(
    path UNINDEXED,
    content,
    last_modified UNINDEXED,
    tokenize = 'porter unicode61'
);

CREATE TABLE IF NOT EXISTS file_metadata (
    path TEXT PRIMARY KEY,
    size INTEGER,
    mtime REAL,
    last_indexed REAL,
    encoding TEXT,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_mtime ON file_metadata(mtime);
";

/// A single row of `file_metadata`, as read back for change detection and
/// statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub path: String,
    pub size: i64,
    pub mtime: f64,
    pub last_indexed: f64,
    pub encoding: Option<String>,
    pub error: Option<String>,
}

/// The durable store: a single `SQLite` connection over the `documents` FTS5
/// table and its `file_metadata` side table.
///
/// A single connection (no pool) is used deliberately: write-ahead logging
/// allows concurrent readers while this connection writes, and
/// `busy_timeout` absorbs the rare write/write contention between a
/// tool-invoked refresh and the periodic scanner, which are additionally
/// serialized by `Core`'s mutex (see `facade`).
pub struct Store {
    conn: Connection,
    db_path: PathBuf,
}

impl Store {
    /// Open (creating if necessary) the store at `db_path`.
    ///
    /// If a file already exists at `db_path` but fails validation (too
    /// small, wrong header, or cannot execute a trivial query), it is
    /// removed along with its `-wal`/`-shm` siblings and recreated empty.
    ///
    /// # Errors
    /// Returns `IndexerError::Io` if the parent directory cannot be
    /// created, or `IndexerError::Database`/`IndexCorruption` if schema
    /// creation fails.
    pub fn open(db_path: &Path) -> Result<Self> {
        if db_path.exists() && !Self::is_valid_database_file(db_path) {
            tracing::warn!(path = %db_path.display(), "store: existing database invalid, recreating");
            Self::remove_database_files(db_path)?;
        }

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Self::open_connection(db_path)?;
        let store = Self { conn, db_path: db_path.to_path_buf() };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Platform-aware `mmap_size` default: `mmap` is unreliable on macOS's
    /// HFS+/APFS with `SQLite`, so it is disabled there; elsewhere a 256MB
    /// mapping gives a meaningful read speedup.
    #[cfg(target_os = "macos")]
    const fn default_mmap_size() -> i64 {
        0
    }

    #[cfg(not(target_os = "macos"))]
    const fn default_mmap_size() -> i64 {
        256 * 1024 * 1024
    }

    fn open_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "cache_size", -32000).map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "temp_store", "MEMORY").map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "mmap_size", Self::default_mmap_size()).map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "page_size", 4096).map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "foreign_keys", "ON").map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "trusted_schema", "OFF").map_err(IndexerError::from_sqlite)?;
        conn.pragma_update(None, "application_id", APPLICATION_ID_I32).map_err(IndexerError::from_sqlite)?;
        conn.busy_timeout(Duration::from_millis(5000)).map_err(IndexerError::from_sqlite)?;
        Ok(conn)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL).map_err(|e| {
            IndexerError::IndexCorruption { reason: format!("schema creation failed: {e}") }
        })
    }

    /// Validate an existing database file before trusting it: size, magic
    /// header, and a live test connection that can run `SELECT 1`.
    fn is_valid_database_file(db_path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(db_path) else { return false };
        if metadata.len() < MIN_SQLITE_FILE_SIZE {
            return false;
        }

        let Ok(bytes) = std::fs::read(db_path) else { return false };
        if bytes.len() < 16 || &bytes[..16] != SQLITE_HEADER_SIGNATURE {
            return false;
        }

        let Ok(conn) = Connection::open(db_path) else { return false };
        conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }

    fn remove_database_files(db_path: &Path) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let path = if suffix.is_empty() {
                db_path.to_path_buf()
            } else {
                PathBuf::from(format!("{}{suffix}", db_path.display()))
            };
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Run the engine's built-in integrity check.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` if the pragma itself cannot be run.
    pub fn check_integrity(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(IndexerError::from_sqlite)?;
        Ok(result == "ok")
    }

    /// If the store fails its integrity check, destroy and recreate it
    /// empty. Returns `true` if the store is (or was made) usable.
    ///
    /// # Errors
    /// Returns `IndexerError::Io` or `IndexerError::IndexCorruption` if
    /// recreation fails.
    pub fn rebuild_if_corrupted(&mut self) -> Result<bool> {
        if self.check_integrity().unwrap_or(false) {
            return Ok(true);
        }

        tracing::warn!(path = %self.db_path.display(), "store: integrity check failed, rebuilding");
        sync_parent_dir(&self.db_path).ok();
        // Drop the failing connection before touching the files on disk.
        let db_path = self.db_path.clone();
        self.conn = Connection::open_in_memory().map_err(IndexerError::from_sqlite)?;
        Self::remove_database_files(&db_path)?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.conn = Self::open_connection(&db_path)?;
        self.ensure_schema()?;
        self.db_path = db_path;
        Ok(true)
    }

    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Size in bytes of the primary database file on disk.
    ///
    /// # Errors
    /// Returns `IndexerError::Io` if the file's metadata cannot be read.
    pub fn size_bytes(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.db_path)?.len())
    }

    /// Replace (or insert) the `documents` and `file_metadata` rows for a
    /// successfully ingested file, within a single transaction.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn upsert_document(
        &mut self,
        path: &str,
        content: &str,
        last_modified: &str,
        size: i64,
        mtime: f64,
        last_indexed: f64,
        encoding: &str,
    ) -> Result<()> {
        let tx = self.conn.transaction().map_err(IndexerError::from_sqlite)?;
        tx.execute("DELETE FROM documents WHERE path = ?1", [path]).map_err(IndexerError::from_sqlite)?;
        tx.execute("DELETE FROM file_metadata WHERE path = ?1", [path])
            .map_err(IndexerError::from_sqlite)?;
        tx.execute(
            "INSERT INTO documents (path, content, last_modified) VALUES (?1, ?2, ?3)",
            rusqlite::params![path, content, last_modified],
        )
        .map_err(IndexerError::from_sqlite)?;
        tx.execute(
            "INSERT INTO file_metadata (path, size, mtime, last_indexed, encoding, error)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            rusqlite::params![path, size, mtime, last_indexed, encoding],
        )
        .map_err(IndexerError::from_sqlite)?;
        tx.commit().map_err(IndexerError::from_sqlite)?;
        Ok(())
    }

    /// Record a failed ingest attempt: no `documents` row, a
    /// `file_metadata` row with `error` set and `encoding` absent.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn record_failure(
        &mut self,
        path: &str,
        size: i64,
        mtime: f64,
        last_indexed: f64,
        error: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO file_metadata (path, size, mtime, last_indexed, encoding, error)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)
                 ON CONFLICT(path) DO UPDATE SET
                    size = excluded.size,
                    mtime = excluded.mtime,
                    last_indexed = excluded.last_indexed,
                    encoding = NULL,
                    error = excluded.error",
                rusqlite::params![path, size, mtime, last_indexed, error],
            )
            .map_err(IndexerError::from_sqlite)?;
        Ok(())
    }

    /// Delete the `documents` and `file_metadata` rows for every stored
    /// path not present in `current_paths`. Returns the number removed.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn prune_missing_files(&mut self, current_paths: &std::collections::HashSet<String>) -> Result<u64> {
        let stored: Vec<String> = {
            let mut stmt =
                self.conn.prepare("SELECT path FROM file_metadata").map_err(IndexerError::from_sqlite)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(IndexerError::from_sqlite)?;
            rows.collect::<std::result::Result<_, _>>().map_err(IndexerError::from_sqlite)?
        };

        let stale: Vec<&String> = stored.iter().filter(|p| !current_paths.contains(p.as_str())).collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction().map_err(IndexerError::from_sqlite)?;
        for path in &stale {
            tx.execute("DELETE FROM documents WHERE path = ?1", [path.as_str()])
                .map_err(IndexerError::from_sqlite)?;
            tx.execute("DELETE FROM file_metadata WHERE path = ?1", [path.as_str()])
                .map_err(IndexerError::from_sqlite)?;
        }
        tx.commit().map_err(IndexerError::from_sqlite)?;

        let count = stale.len() as u64;
        tracing::info!(pruned = count, "store: pruned missing files");
        Ok(count)
    }

    /// Look up stored `(size, mtime)` for a path, used for change detection.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure other than
    /// "no such row", which is reported as `Ok(None)`.
    pub fn get_metadata(&self, path: &str) -> Result<Option<FileMetadata>> {
        self.conn
            .query_row(
                "SELECT path, size, mtime, last_indexed, encoding, error
                 FROM file_metadata WHERE path = ?1",
                [path],
                |row| {
                    Ok(FileMetadata {
                        path: row.get(0)?,
                        size: row.get(1)?,
                        mtime: row.get(2)?,
                        last_indexed: row.get(3)?,
                        encoding: row.get(4)?,
                        error: row.get(5)?,
                    })
                },
            )
            .map(Some)
            .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(IndexerError::from_sqlite(e)) })
    }

    /// All known paths in `file_metadata`, used for the deleted-file sweep
    /// and statistics.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn known_paths(&self) -> Result<std::collections::HashSet<String>> {
        let mut stmt =
            self.conn.prepare("SELECT path FROM file_metadata").map_err(IndexerError::from_sqlite)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(IndexerError::from_sqlite)?;
        rows.collect::<std::result::Result<_, _>>().map_err(IndexerError::from_sqlite)
    }

    /// Number of indexed files (`file_metadata` rows with no error).
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn indexed_file_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM file_metadata WHERE error IS NULL", [], |row| row.get(0))
            .map_err(IndexerError::from_sqlite)
    }

    /// Number of `file_metadata` rows recording a failed ingest.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn error_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM file_metadata WHERE error IS NOT NULL", [], |row| row.get(0))
            .map_err(IndexerError::from_sqlite)
    }

    /// Latest `last_indexed` timestamp across all metadata rows, or `None`
    /// if the store has never indexed anything.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn last_scan_time(&self) -> Result<Option<f64>> {
        self.conn
            .query_row("SELECT MAX(last_indexed) FROM file_metadata", [], |row| row.get(0))
            .map_err(IndexerError::from_sqlite)
    }

    /// Count of rows in `documents`, used by `Search::get_document_count`.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` on any `SQLite` failure.
    pub fn document_count(&self) -> Result<i64> {
        self.conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0)).map_err(IndexerError::from_sqlite)
    }
}
