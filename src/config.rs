//! Database configuration
//!
//! Where the engine keeps its data. Without a data file everything lives in
//! memory and is lost when the process exits.

use std::path::{Path, PathBuf};

/// Environment variable naming the data file
pub const DATA_FILE_ENV: &str = "MYDB_DATA_FILE";

/// Suffix appended to the data file to get the catalog metadata file
pub const META_SUFFIX: &str = ".meta";

/// Database configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseConfig {
    /// JSON snapshot of all rows, if persistence is enabled
    pub data_file: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Create a new in-memory config
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory config, spelled out
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Set the data file
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    /// Read the data file from `MYDB_DATA_FILE`, in-memory if unset or empty
    pub fn from_env() -> Self {
        match std::env::var(DATA_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::new().data_file(path),
            _ => Self::new(),
        }
    }

    /// True when nothing is written to disk
    pub fn is_in_memory(&self) -> bool {
        self.data_file.is_none()
    }

    /// Catalog metadata file, next to the data file
    pub fn meta_file(&self) -> Option<PathBuf> {
        self.data_file.as_deref().map(meta_path)
    }
}

fn meta_path(data_file: &Path) -> PathBuf {
    let mut name = data_file.as_os_str().to_os_string();
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config() {
        let config = DatabaseConfig::new();
        assert!(config.is_in_memory());
        assert_eq!(config.meta_file(), None);

        let config = DatabaseConfig::new().data_file("/tmp/mydb.json");
        assert!(!config.is_in_memory());
        assert_eq!(
            config.meta_file(),
            Some(PathBuf::from("/tmp/mydb.json.meta"))
        );
    }
}
