//! Scan, classify, ingest, and sweep.
//!
//! Walks the source directory with `ignore::WalkBuilder` (respecting
//! `.gitignore`), classifies each candidate file, and ingests the ones
//! whose `(size, mtime)` pair changed since the last refresh. A full
//! refresh also sweeps stored paths no longer present on disk. Path
//! containment is checked by resolving against the canonicalized source
//! root without requiring the target to exist, which also rejects
//! traversal through symlinks that a plain string-prefix check would miss.
//! Every stored path, whether reached via a full scan or a single-file
//! refresh, is keyed by the same canonicalized absolute form so the two
//! paths can never disagree about a file's identity.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ignore::WalkBuilder;

use crate::classify::is_text_file;
use crate::config::ServerConfig;
use crate::encoding::{detect_encoding, read_text_file};
use crate::error::{IndexerError, Result};
use crate::store::Store;

/// Outcome of a single `refresh` call.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RefreshResult {
    pub success: bool,
    pub files_processed: u64,
    pub files_added: u64,
    pub files_updated: u64,
    pub files_removed: u64,
    pub duration_seconds: f64,
    pub errors: Vec<String>,
}

/// Orchestrates filesystem scanning and store ingestion for one source
/// directory.
pub struct Indexer {
    config: ServerConfig,
    source_canonical: PathBuf,
}

impl Indexer {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let source_canonical =
            config.source_directory.canonicalize().unwrap_or_else(|_| config.source_directory.clone());
        Self { config, source_canonical }
    }

    /// Resolve `input` (possibly relative to the source root) to an
    /// absolute, `.`/`..`-free path and verify it lies within the source
    /// root, without requiring the path to exist.
    ///
    /// Containment must be checked before the caller knows whether the file
    /// still exists (a deleted file is a valid `specific_path` whose
    /// non-existence is reported separately), so this cannot simply
    /// `canonicalize()` the whole path — that requires every component to
    /// exist. Instead it canonicalizes the longest existing ancestor (which
    /// also resolves any symlinks in the existing part of the tree) and
    /// appends the remaining, not-yet-existing components lexically.
    fn resolve_within_root(&self, input: &str) -> Option<PathBuf> {
        let candidate = Path::new(input);
        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.config.source_directory.join(candidate)
        };
        let resolved = Self::resolve_non_strict(&absolute);
        if resolved.starts_with(&self.source_canonical) { Some(resolved) } else { None }
    }

    /// Best-effort equivalent of resolving a path to its canonical form
    /// without requiring it to exist: canonicalize the longest existing
    /// ancestor, then push the remaining components back on lexically.
    fn resolve_non_strict(path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        };
        let mut existing = absolute.as_path();
        let mut tail: Vec<std::ffi::OsString> = Vec::new();
        loop {
            if let Ok(canonical) = existing.canonicalize() {
                let mut resolved = canonical;
                for component in tail.iter().rev() {
                    resolved.push(component);
                }
                return resolved;
            }
            let Some(parent) = existing.parent() else {
                return Self::normalize_lexically(&absolute);
            };
            if let Some(name) = existing.file_name() {
                tail.push(name.to_os_string());
            }
            existing = parent;
        }
    }

    /// Normalize `.`/`..` components without touching the filesystem, used
    /// only as a fallback when no ancestor of `path` can be canonicalized.
    fn normalize_lexically(path: &Path) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                std::path::Component::ParentDir => {
                    out.pop();
                }
                std::path::Component::CurDir => {}
                other => out.push(other.as_os_str()),
            }
        }
        out
    }

    fn now_secs() -> f64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }

    fn file_size_mtime(path: &Path) -> Result<(i64, f64)> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| IndexerError::FileAccess { path: path.display().to_string(), reason: e.to_string() })?;
        let size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map_or(0.0, |d| d.as_secs_f64());
        Ok((size, mtime))
    }

    /// Classify, detect encoding, read, and upsert (or record a failure).
    /// Returns `true` on a successful ingest, `false` if the file was
    /// skipped as non-text.
    fn ingest(&self, store: &mut Store, path: &Path, rel_path: &str) -> Result<bool> {
        if !is_text_file(path, true) {
            return Ok(false);
        }

        let (size, mtime) = Self::file_size_mtime(path)?;
        let now = Self::now_secs();

        let encoding = match detect_encoding(path) {
            Ok(enc) => enc,
            Err(e) => {
                tracing::warn!(path = rel_path, error = %e, "indexer: encoding detection failed");
                store.record_failure(rel_path, size, mtime, now, &e.to_string())?;
                return Ok(false);
            }
        };

        let content = match read_text_file(path, &encoding) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = rel_path, error = %e, "indexer: decode failed");
                store.record_failure(rel_path, size, mtime, now, &e.to_string())?;
                return Ok(false);
            }
        };

        let last_modified = chrono::DateTime::from_timestamp(mtime as i64, 0)
            .map_or_else(|| "unknown".to_string(), |dt| dt.to_rfc3339());

        store.upsert_document(rel_path, &content, &last_modified, size, mtime, now, &encoding)?;
        Ok(true)
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        else {
            return false;
        };
        if self.config.excluded_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return false;
        }
        self.config.included_extensions.is_empty()
            || self.config.included_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }

    fn scan(&self) -> Vec<PathBuf> {
        let max_size = self.config.max_file_size_bytes();
        let index_dir = self.config.index_output_directory.canonicalize().ok();

        let mut walker = WalkBuilder::new(&self.config.source_directory);
        walker.standard_filters(true).same_file_system(true).follow_links(false);

        let mut out = Vec::new();
        for entry in walker.build().filter_map(std::result::Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Some(ref idx) = index_dir
                && path.starts_with(idx)
            {
                continue;
            }
            if !self.extension_allowed(path) {
                continue;
            }
            let Ok(metadata) = std::fs::metadata(path) else { continue };
            if metadata.len() > max_size {
                continue;
            }
            out.push(path.to_path_buf());
        }
        out
    }

    /// The path's storage key: an absolute, resolved path, canonicalized
    /// where possible so the same file maps to the same key regardless of
    /// which refresh path (full scan or single-file) observed it first.
    ///
    /// Falls back to a lexically-absolute (not symlink-resolved) path if
    /// canonicalization fails, e.g. a race where the file is removed
    /// between being scanned and being keyed.
    fn store_key(&self, path: &Path) -> String {
        let resolved = path.canonicalize().unwrap_or_else(|_| Self::resolve_non_strict(path));
        resolved.display().to_string()
    }

    /// Full or single-file refresh.
    ///
    /// # Errors
    /// Returns `IndexerError::Database` if a store operation fails
    /// unrecoverably (per-file ingest failures are instead recorded in
    /// `RefreshResult.errors` and do not propagate).
    pub fn refresh(
        &self,
        store: &mut Store,
        specific_path: Option<&str>,
        force: bool,
    ) -> Result<RefreshResult> {
        let start = std::time::Instant::now();

        if let Some(input) = specific_path {
            return Ok(self.refresh_single(store, input, start));
        }

        let scanned = self.scan();
        let scanned_keys: HashSet<String> = scanned.iter().map(|p| self.store_key(p)).collect();

        let mut result = RefreshResult::default();

        for path in &scanned {
            let rel = self.store_key(path);
            let existing = store.get_metadata(&rel)?;

            let needs_ingest = force
                || match (&existing, Self::file_size_mtime(path).ok()) {
                    (Some(meta), Some((size, mtime))) => {
                        meta.error.is_some()
                            || meta.size != size
                            || (meta.mtime - mtime).abs() > f64::EPSILON
                    }
                    _ => true,
                };

            if !needs_ingest {
                continue;
            }

            match self.ingest(store, path, &rel) {
                Ok(true) => {
                    result.files_processed += 1;
                    if existing.is_some() {
                        result.files_updated += 1;
                    } else {
                        result.files_added += 1;
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    result.errors.push(format!("{rel}: {e}"));
                }
            }
        }

        let removed = store.prune_missing_files(&scanned_keys)?;
        result.files_removed = removed;
        result.success = result.errors.is_empty();
        result.duration_seconds = (start.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        Ok(result)
    }

    fn refresh_single(&self, store: &mut Store, input: &str, start: std::time::Instant) -> RefreshResult {
        let mut result = RefreshResult::default();

        let Some(resolved) = self.resolve_within_root(input) else {
            result.errors.push(format!("Path outside source directory: {input}"));
            result.success = false;
            return result;
        };

        if !resolved.is_file() {
            result.errors.push(format!("File not found: {input}"));
            result.success = false;
            return result;
        }

        let rel = self.store_key(&resolved);
        let existing = store.get_metadata(&rel).ok().flatten();

        match self.ingest(store, &resolved, &rel) {
            Ok(true) => {
                result.files_processed = 1;
                if existing.is_some() {
                    result.files_updated = 1;
                } else {
                    result.files_added = 1;
                }
                result.success = true;
            }
            Ok(false) => {
                result.success = true;
            }
            Err(e) => {
                result.errors.push(format!("{rel}: {e}"));
                result.success = false;
            }
        }

        result.duration_seconds = (start.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        result
    }
}
