//! Server configuration: loading, defaulting, and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

fn default_index_output_directory() -> PathBuf {
    PathBuf::from("./indexes")
}

fn default_included_extensions() -> Vec<String> {
    vec![".txt".into(), ".md".into(), ".rst".into()]
}

const fn default_scan_interval_seconds() -> u64 {
    300
}

const fn default_max_file_size_mb() -> u64 {
    10
}

/// Typed, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub source_directory: PathBuf,

    #[serde(default = "default_index_output_directory")]
    pub index_output_directory: PathBuf,

    #[serde(default = "default_included_extensions")]
    pub included_extensions: Vec<String>,

    #[serde(default)]
    pub excluded_extensions: Vec<String>,

    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: u64,

    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl ServerConfig {
    /// Validate field values and cross-field constraints.
    ///
    /// # Errors
    /// Returns `IndexerError::Configuration` describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        if !self.source_directory.is_dir() {
            return Err(IndexerError::Configuration {
                field: "source_directory".into(),
                reason: format!("not a directory: {}", self.source_directory.display()),
            });
        }

        let source_resolved =
            self.source_directory.canonicalize().unwrap_or_else(|_| self.source_directory.clone());
        let index_resolved = self
            .index_output_directory
            .canonicalize()
            .unwrap_or_else(|_| self.index_output_directory.clone());
        if source_resolved == index_resolved {
            return Err(IndexerError::Configuration {
                field: "index_output_directory".into(),
                reason: "must differ from source_directory".into(),
            });
        }

        if self.scan_interval_seconds < 60 {
            return Err(IndexerError::Configuration {
                field: "scan_interval_seconds".into(),
                reason: "must be >= 60".into(),
            });
        }

        if self.max_file_size_mb == 0 || self.max_file_size_mb > 100 {
            return Err(IndexerError::Configuration {
                field: "max_file_size_mb".into(),
                reason: "must be in (0, 100]".into(),
            });
        }

        for ext in self.included_extensions.iter().chain(self.excluded_extensions.iter()) {
            if !ext.starts_with('.') {
                return Err(IndexerError::Configuration {
                    field: "included_extensions/excluded_extensions".into(),
                    reason: format!("extension must start with '.': {ext}"),
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.index_output_directory.join("search.db")
    }
}

/// Load and validate a configuration file.
///
/// Falls back to `config.example.json` next to `path` if `path` itself does
/// not exist, so a first run can ship a template without requiring a copy.
///
/// # Errors
/// Returns `IndexerError::Configuration` if the file is missing (and no
/// fallback exists), malformed JSON, or fails validation. Returns
/// `IndexerError::Json` if JSON parsing fails with a structural error.
pub fn load_config(path: &Path) -> Result<ServerConfig> {
    let candidate = if path.exists() {
        path.to_path_buf()
    } else {
        let fallback = path.with_file_name("config.example.json");
        if fallback.exists() {
            fallback
        } else {
            return Err(IndexerError::Configuration {
                field: "config_path".into(),
                reason: format!("no such file: {}", path.display()),
            });
        }
    };

    let contents = std::fs::read_to_string(&candidate).map_err(|e| IndexerError::Configuration {
        field: "config_path".into(),
        reason: format!("cannot read {}: {e}", candidate.display()),
    })?;

    let config: ServerConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        let body = format!(r#"{{"source_directory": "{}"}}"#, source.display());
        let path = write_config(dir.path(), &body);

        let config = load_config(&path).unwrap();
        assert_eq!(config.scan_interval_seconds, 300);
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.included_extensions, vec![".txt", ".md", ".rst"]);
        assert!(config.excluded_extensions.is_empty());
    }

    #[test]
    fn test_missing_source_directory_rejected() {
        let dir = tempdir().unwrap();
        let body = r#"{"source_directory": "/does/not/exist"}"#;
        let path = write_config(dir.path(), body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_scan_interval_too_low_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        let body =
            format!(r#"{{"source_directory": "{}", "scan_interval_seconds": 5}}"#, source.display());
        let path = write_config(dir.path(), &body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_extension_without_dot_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        let body = format!(
            r#"{{"source_directory": "{}", "included_extensions": ["txt"]}}"#,
            source.display()
        );
        let path = write_config(dir.path(), &body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_source_equals_index_directory_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        let body = format!(
            r#"{{"source_directory": "{}", "index_output_directory": "{}"}}"#,
            source.display(),
            source.display()
        );
        let path = write_config(dir.path(), &body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_example() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        let body = format!(r#"{{"source_directory": "{}"}}"#, source.display());
        std::fs::write(dir.path().join("config.example.json"), body).unwrap();

        let path = dir.path().join("config.json");
        assert!(load_config(&path).is_ok());
    }

    #[test]
    fn test_max_file_size_bytes() {
        let config = ServerConfig {
            source_directory: PathBuf::from("."),
            index_output_directory: PathBuf::from("./indexes"),
            included_extensions: vec![],
            excluded_extensions: vec![],
            scan_interval_seconds: 300,
            max_file_size_mb: 2,
        };
        assert_eq!(config.max_file_size_bytes(), 2 * 1024 * 1024);
    }
}
