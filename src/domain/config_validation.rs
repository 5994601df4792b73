//! Configuration validation.
//!
//! Resolves the `[storage]` section into a backend choice before any store
//! is opened.

use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "fxjournal-data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// One JSON file per key under a directory.
    File { dir: PathBuf },
    Sqlite { path: PathBuf, pool_size: u32 },
    Postgres { connection_string: String, pool_size: u32 },
}

pub fn validate_storage_config(config: &dyn ConfigPort) -> Result<StorageBackend, JournalError> {
    let backend = config
        .get_string("storage", "backend")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "file".to_string());

    match backend.as_str() {
        "file" => Ok(StorageBackend::File {
            dir: require_path(config)?,
        }),
        "sqlite" => Ok(StorageBackend::Sqlite {
            path: require_path(config)?,
            pool_size: pool_size(config)?,
        }),
        "postgres" => {
            let connection_string = config
                .get_string("postgres", "connection_string")
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| JournalError::ConfigMissing {
                    section: "postgres".to_string(),
                    key: "connection_string".to_string(),
                })?;
            Ok(StorageBackend::Postgres {
                connection_string,
                pool_size: pool_size(config)?,
            })
        }
        other => Err(JournalError::ConfigInvalid {
            section: "storage".to_string(),
            key: "backend".to_string(),
            reason: format!("unknown backend '{other}', expected file, sqlite or postgres"),
        }),
    }
}

fn pool_size(config: &dyn ConfigPort) -> Result<u32, JournalError> {
    let size = config.get_int("storage", "pool_size", 4);
    if size < 1 || size > i64::from(u32::MAX) {
        return Err(JournalError::ConfigInvalid {
            section: "storage".to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be at least 1".to_string(),
        });
    }
    Ok(size as u32)
}

fn require_path(config: &dyn ConfigPort) -> Result<PathBuf, JournalError> {
    match config.get_string("storage", "path") {
        Some(s) if !s.trim().is_empty() => Ok(PathBuf::from(s.trim())),
        _ => Err(JournalError::ConfigMissing {
            section: "storage".to_string(),
            key: "path".to_string(),
        }),
    }
}
