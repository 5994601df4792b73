//! Key-value storage port.
//!
//! Every store persists its whole collection as one serialized document under
//! a single key. Implementations must be synchronous; a failed `set` must leave
//! the previously stored value in place.

use crate::domain::error::JournalError;
use std::rc::Rc;

pub const RECORDS_KEY: &str = "records";
pub const CURRENCY_PAIRS_KEY: &str = "currency-pairs";
pub const TIMEFRAMES_KEY: &str = "timeframes";
pub const PATTERNS_KEY: &str = "patterns";
pub const FILTER_PRESETS_KEY: &str = "filter-presets";

pub trait KvPort {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError>;

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError>;

    fn remove(&self, key: &str) -> Result<(), JournalError>;
}

impl<T: KvPort + ?Sized> KvPort for &T {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), JournalError> {
        (**self).remove(key)
    }
}

impl<T: KvPort + ?Sized> KvPort for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), JournalError> {
        (**self).remove(key)
    }
}

impl<T: KvPort + ?Sized> KvPort for Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, JournalError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JournalError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), JournalError> {
        (**self).remove(key)
    }
}
