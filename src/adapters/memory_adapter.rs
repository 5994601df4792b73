//! In-memory key-value adapter.
//!
//! Holds nothing beyond the life of the process. Reads and writes can be
//! switched to fail, which stands in for a full or disabled storage medium.

use crate::domain::error::JournalError;
use crate::ports::kv_port::KvPort;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryKvAdapter {
    values: RefCell<HashMap<String, String>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryKvAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful `set`/`remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl KvPort for MemoryKvAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError> {
        if self.fail_reads.get() {
            return Err(JournalError::persistence(key, "storage is unavailable"));
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError> {
        if self.fail_writes.get() {
            return Err(JournalError::persistence(key, "quota exceeded"));
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), JournalError> {
        if self.fail_writes.get() {
            return Err(JournalError::persistence(key, "storage is read-only"));
        }
        self.values.borrow_mut().remove(key);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
