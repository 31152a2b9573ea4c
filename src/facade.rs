//! The tool façade and the `Core` value it is a thin veneer over.
//!
//! `Core` owns the store, indexer, and optional background scheduler
//! behind the three operations external callers invoke: `search`,
//! `get_index_stats`, `refresh_index`. There is exactly one `Core` per
//! running instance, constructed once via `initialize`; whether the
//! periodic scheduler starts is controlled by an explicit
//! `auto_start_scheduler` argument rather than a hidden flag.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::indexer::Indexer;
use crate::scheduler::Scheduler;
use crate::search::Search;
use crate::store::Store;

/// The single owned value wiring the store, indexer, and search engine
/// together for one configured source directory.
pub struct Core {
    config: ServerConfig,
    store: Arc<Mutex<Store>>,
    indexer: Arc<Indexer>,
    scheduler: Option<Scheduler>,
}

impl Core {
    /// Build the core: open (and integrity-check) the store, run one
    /// synchronous full refresh, and optionally start the periodic
    /// scheduler.
    ///
    /// Pass `false` for `auto_start_scheduler` in tests that want to
    /// control refresh timing explicitly, `true` in the running service.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened/rebuilt or the
    /// initial refresh fails unrecoverably.
    pub async fn initialize(config: ServerConfig, auto_start_scheduler: bool) -> Result<Self> {
        let mut store = Store::open(&config.database_path())?;
        store.rebuild_if_corrupted()?;

        let indexer = Arc::new(Indexer::new(config.clone()));
        indexer.refresh(&mut store, None, false)?;

        let store = Arc::new(Mutex::new(store));

        let scheduler = if auto_start_scheduler {
            Some(Scheduler::start(
                Arc::clone(&indexer),
                Arc::clone(&store),
                config.scan_interval_seconds,
            ))
        } else {
            None
        };

        Ok(Self { config, store, indexer, scheduler })
    }

    /// Cancel the background scheduler, if running.
    pub async fn shutdown(self) {
        if let Some(scheduler) = self.scheduler {
            scheduler.shutdown().await;
        }
    }

    /// `search(query, limit)` tool operation.
    pub async fn search(&self, query: &str, limit: u32) -> String {
        let store = self.store.lock().await;
        let search = Search::new(&store);
        match search.search(query, limit) {
            Ok(results) if results.is_empty() => format!("No results found for: {query}"),
            Ok(results) => {
                let mut out = format!("Found {} results for '{query}':\n\n", results.len());
                for hit in &results {
                    out.push_str(&format!(
                        "- {}\n  Score: {:.4}\n  Modified: {}\n  Snippet: {}\n\n",
                        hit.path, hit.score, hit.last_modified, hit.snippet
                    ));
                }
                out
            }
            Err(e) => format!("Error: search failed: {e}"),
        }
    }

    /// `get_index_stats()` tool operation.
    pub async fn get_index_stats(&self) -> String {
        let store = self.store.lock().await;

        let indexed_files = store.indexed_file_count().unwrap_or(0);
        let errors_encountered = store.error_count().unwrap_or(0);
        let last_scan = store
            .last_scan_time()
            .ok()
            .flatten()
            .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
            .map_or_else(|| "Never".to_string(), |dt| dt.to_rfc3339());
        let size_mb = store.size_bytes().map(|b| b as f64 / (1024.0 * 1024.0)).unwrap_or(0.0);
        let total_documents = indexed_files;

        format!(
            "Index Statistics:\n\
             - Indexed Files: {indexed_files}\n\
             - Last Scan: {last_scan}\n\
             - Index Size: {size_mb:.2} MB\n\
             - Total Documents: {total_documents}\n\
             - Errors Encountered: {errors_encountered}\n"
        )
    }

    /// `refresh_index(filepath, force)` tool operation.
    pub async fn refresh_index(&self, filepath: Option<&str>, force: bool) -> String {
        let mut store = self.store.lock().await;
        match self.indexer.refresh(&mut store, filepath, force) {
            Ok(result) => {
                let mut out = format!(
                    "Refresh Result:\n\
                     - Success: {}\n\
                     - Duration: {:.2}s\n\
                     - Files Processed: {}\n\
                     - Files Added: {}\n\
                     - Files Updated: {}\n\
                     - Files Removed: {}\n",
                    result.success,
                    result.duration_seconds,
                    result.files_processed,
                    result.files_added,
                    result.files_updated,
                    result.files_removed,
                );
                if !result.errors.is_empty() {
                    out.push_str("- Errors:\n");
                    for (i, err) in result.errors.iter().enumerate() {
                        out.push_str(&format!("  {}. {err}\n", i + 1));
                    }
                }
                out
            }
            Err(e) => format!("Error: refresh failed: {e}"),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(source: &std::path::Path, index: &std::path::Path) -> ServerConfig {
        ServerConfig {
            source_directory: source.to_path_buf(),
            index_output_directory: index.to_path_buf(),
            included_extensions: vec![".txt".into()],
            excluded_extensions: vec![],
            scan_interval_seconds: 60,
            max_file_size_mb: 10,
        }
    }

    #[tokio::test]
    async fn test_search_reports_no_results() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let index = dir.path().join("idx");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&index).unwrap();

        let core = Core::initialize(config(&source, &index), false).await.unwrap();
        let response = core.search("nothing", 10).await;
        assert!(response.starts_with("No results found for:"));
        core.shutdown().await;
    }

    #[tokio::test]
    async fn test_search_and_stats_after_initial_refresh() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let index = dir.path().join("idx");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&index).unwrap();
        std::fs::write(source.join("a.txt"), "Python programming tutorial").unwrap();

        let core = Core::initialize(config(&source, &index), false).await.unwrap();

        let response = core.search("Python", 10).await;
        assert!(response.starts_with("Found 1 results"));
        assert!(response.contains("<mark>Python</mark>"));

        let stats = core.get_index_stats().await;
        assert!(stats.contains("Indexed Files: 1"));
        assert!(stats.contains("Total Documents: 1"));
        core.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_index_reports_path_traversal() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let index = dir.path().join("idx");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&index).unwrap();

        let core = Core::initialize(config(&source, &index), false).await.unwrap();
        let response = core.refresh_index(Some("../../etc/passwd"), false).await;
        assert!(response.contains("Success: false"));
        assert!(response.contains("Path outside source directory"));
        core.shutdown().await;
    }
}
