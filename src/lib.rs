//! localindex-core - a local full-text file indexing service.
//!
//! This library provides the indexing pipeline, durable store, search
//! engine, and background scheduler behind a small tool façade: `search`,
//! `get_index_stats`, and `refresh_index`. The façade is the only supported
//! entry point for callers; `Core::initialize` wires everything else
//! together.
//!
//! # Example
//!
//! ```no_run
//! use localindex_core::{Core, ServerConfig};
//! use std::path::PathBuf;
//!
//! # async fn run() -> localindex_core::Result<()> {
//! let config = ServerConfig {
//!     source_directory: PathBuf::from("."),
//!     index_output_directory: PathBuf::from("./indexes"),
//!     included_extensions: vec![".txt".into(), ".md".into()],
//!     excluded_extensions: vec![],
//!     scan_interval_seconds: 300,
//!     max_file_size_mb: 10,
//! };
//! let core = Core::initialize(config, true).await?;
//! println!("{}", core.search("hello", 10).await);
//! core.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod facade;
pub(crate) mod fs_utils;
pub mod indexer;
pub mod scheduler;
pub mod search;
pub mod store;

pub use config::{ServerConfig, load_config};
pub use error::{ExitCode, IndexerError, Result};
pub use facade::Core;
pub use indexer::{Indexer, RefreshResult};
pub use scheduler::Scheduler;
pub use search::{Search, SearchResult, escape_fts_query};
pub use store::{FileMetadata, Store};
