/// Scan configuration: which roots to walk and which formats to validate.
///
/// Persisted as pretty-printed JSON so it can be edited by hand.
use crate::model::FormatMask;
use crate::platform::default_search_paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Roots walked in order. Missing roots are skipped at scan time.
    pub search_paths: Vec<PathBuf>,
    pub formats: FormatMask,
}

impl Default for ScanConfig {
    /// Platform default roots with every format enabled.
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            formats: FormatMask::ALL,
        }
    }
}

impl ScanConfig {
    /// A configuration with no roots and every format enabled.
    pub fn empty() -> Self {
        Self {
            search_paths: Vec::new(),
            formats: FormatMask::ALL,
        }
    }

    /// Append a root if it exists on disk. A root listed twice is walked
    /// twice.
    ///
    /// Returns whether the root was added.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !path.exists() {
            debug!("Ignoring missing search path {}", path.display());
            return false;
        }
        self.search_paths.push(path);
        true
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_roots_are_rejected_duplicates_kept() {
        let tmp = TempDir::new().unwrap();
        let mut config = ScanConfig::empty();

        assert!(!config.add_search_path(tmp.path().join("missing")));
        assert!(config.add_search_path(tmp.path()));
        assert!(config.add_search_path(tmp.path()));
        assert_eq!(
            config.search_paths,
            vec![tmp.path().to_path_buf(), tmp.path().to_path_buf()]
        );
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("ftbscan.json");
        let config = ScanConfig {
            search_paths: vec![PathBuf::from("/opt/plugins")],
            formats: FormatMask::new(true, false, true),
        };

        config.save(&file).unwrap();
        assert_eq!(ScanConfig::load(&file).unwrap(), config);
    }

    #[test]
    fn absent_fields_take_defaults() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("partial.json");
        std::fs::write(&file, r#"{ "search_paths": ["/x"] }"#).unwrap();

        let config = ScanConfig::load(&file).unwrap();
        assert_eq!(config.search_paths, vec![PathBuf::from("/x")]);
        assert_eq!(config.formats, FormatMask::ALL);
    }

    #[test]
    fn malformed_json_is_reported() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("bad.json");
        std::fs::write(&file, "{ nope").unwrap();

        assert!(matches!(ScanConfig::load(&file), Err(ConfigError::Json { .. })));
    }
}
