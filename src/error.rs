use thiserror::Error;

/// Centralized error types for the indexing core.
///
/// All errors are explicit enum variants (no `Box<dyn Error>`) for
/// actionable error messages and cheap matching at call sites. Variants are
/// grouped into the four kinds the rest of the crate reasons about:
/// configuration, file access, index corruption, and general indexing
/// failures.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration file missing, malformed, or failing validation.
    #[error("invalid configuration: {field}: {reason}")]
    Configuration { field: String, reason: String },

    /// A file could not be read, or its path escapes the source root.
    #[error("cannot access '{path}': {reason}")]
    FileAccess { path: String, reason: String },

    /// The on-disk index failed an integrity check or belongs to a
    /// different application and cannot be safely reused.
    #[error("index corrupted: {reason}")]
    IndexCorruption { reason: String },

    /// `SQLite` operation failed. Messages matching known corruption
    /// signatures are translated to `IndexCorruption` at the call site.
    #[error("database error: {source}")]
    Database {
        #[from]
        source: rusqlite::Error,
    },

    /// Filesystem I/O operation failed outside the per-file ingest path
    /// (directory walks, gitignore reads, store file removal).
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Configuration JSON could not be parsed.
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl IndexerError {
    /// True when the underlying `SQLite` error text matches one of the two
    /// signatures the store treats as index corruption rather than a
    /// transient failure.
    #[must_use]
    pub fn is_corruption_signature(message: &str) -> bool {
        message.contains("file is not a database")
            || message.contains("database disk image is malformed")
    }

    /// Wrap a `rusqlite::Error` as `IndexCorruption` if its message matches
    /// a known corruption signature, otherwise as a plain `Database` error.
    #[must_use]
    pub fn from_sqlite(source: rusqlite::Error) -> Self {
        let message = source.to_string();
        if Self::is_corruption_signature(&message) {
            Self::IndexCorruption { reason: message }
        } else {
            Self::Database { source }
        }
    }
}

/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Exit codes for the host binary.
///
/// Based on BSD sysexits.h conventions for meaningful exit statuses.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful execution
    Ok = 0,
    /// General software error (internal error, unexpected state)
    Software = 1,
    /// Invalid input data (malformed query, corrupted database)
    DataErr = 2,
    /// I/O error (file not found, permission denied on files)
    IoErr = 3,
    /// No input provided (missing required arguments)
    NoInput = 4,
    /// Permission denied (access control failure)
    NoPerm = 5,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
