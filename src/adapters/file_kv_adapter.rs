//! Directory-backed key-value adapter: one `<key>.json` file per key.
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so a failed write never leaves a half-written document behind.

use crate::domain::error::JournalError;
use crate::ports::kv_port::KvPort;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct FileKvAdapter {
    dir: PathBuf,
}

impl FileKvAdapter {
    /// Open (creating if needed) the data directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, JournalError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("file storage opened at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, JournalError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(JournalError::persistence(key, "key must be alphanumeric, '-' or '_'"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvPort for FileKvAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(JournalError::persistence(
                key,
                format!("failed to read {}: {}", path.display(), e),
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|e| {
            JournalError::persistence(key, format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            JournalError::persistence(key, format!("failed to replace {}: {}", path.display(), e))
        })
    }

    fn remove(&self, key: &str) -> Result<(), JournalError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(JournalError::persistence(
                key,
                format!("failed to remove {}: {}", path.display(), e),
            )),
        }
    }
}
