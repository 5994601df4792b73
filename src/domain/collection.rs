//! Whole-collection (de)serialization through a [`KvPort`].

use super::error::JournalError;
use crate::ports::kv_port::KvPort;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Read the JSON array stored under `key`. `Ok(None)` when nothing is stored.
pub fn read_collection<P, T>(port: &P, key: &str) -> Result<Option<Vec<T>>, JournalError>
where
    P: KvPort + ?Sized,
    T: DeserializeOwned,
{
    let Some(raw) = port.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| JournalError::persistence(key, format!("unreadable data: {e}")))
}

pub fn write_collection<P, T>(port: &P, key: &str, items: &[T]) -> Result<(), JournalError>
where
    P: KvPort + ?Sized,
    T: Serialize,
{
    let raw = serde_json::to_string(items)
        .map_err(|e| JournalError::persistence(key, format!("serialization failed: {e}")))?;
    port.set(key, &raw)?;
    debug!(key, items = items.len(), bytes = raw.len(), "persisted collection");
    Ok(())
}
