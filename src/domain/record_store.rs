//! The record store: canonical collection of trade-opportunity records.
//!
//! Every mutation follows validate, mutate a copy, persist, commit. If the
//! write fails the in-memory collection is left exactly as it was, so memory
//! and storage never diverge.

use super::collection::{read_collection, write_collection};
use super::error::JournalError;
use super::record::{NewRecord, Record, RecordPatch};
use super::record_filter::{day_bounds, in_range, matches_term, sort_newest_first, RecordFilter};
use super::statistics::Statistics;
use crate::ports::clock_port::{Clock, SystemClock};
use crate::ports::kv_port::{KvPort, RECORDS_KEY};
use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};
use uuid::Uuid;

pub struct RecordStore<P: KvPort> {
    port: P,
    clock: Box<dyn Clock>,
    records: Vec<Record>,
    load_error: Option<JournalError>,
}

impl<P: KvPort> RecordStore<P> {
    pub fn open(port: P) -> Self {
        Self::open_with_clock(port, Box::new(SystemClock))
    }

    /// Build the store and load whatever is persisted. A failed load leaves
    /// the store empty but usable; the failure is kept in [`load_error`].
    ///
    /// [`load_error`]: RecordStore::load_error
    pub fn open_with_clock(port: P, clock: Box<dyn Clock>) -> Self {
        let mut store = Self {
            port,
            clock,
            records: Vec::new(),
            load_error: None,
        };
        // A failure is kept in `load_error`.
        let _ = store.load();
        store
    }

    /// Re-read the persisted collection, replacing the in-memory one.
    pub fn load(&mut self) -> Result<usize, JournalError> {
        match read_collection::<_, Record>(&self.port, RECORDS_KEY) {
            Ok(records) => {
                self.records = records.unwrap_or_default();
                self.load_error = None;
                Ok(self.records.len())
            }
            Err(e) => {
                warn!(error = %e, "record load failed, continuing with an empty journal");
                self.records.clear();
                self.load_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn load_error(&self) -> Option<&JournalError> {
        self.load_error.as_ref()
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn add(&mut self, input: NewRecord) -> Result<Record, JournalError> {
        let record = input.into_record(self.fresh_id(), self.clock.now())?;

        let mut next = self.records.clone();
        next.push(record.clone());
        self.commit(next)?;

        info!(id = %record.id, pair = %record.currency_pair, "record added");
        Ok(record)
    }

    pub fn update(&mut self, id: &str, patch: &RecordPatch) -> Result<Record, JournalError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| JournalError::NotFound { id: id.to_string() })?;

        let updated = patch.apply_to(&self.records[index], self.clock.now())?;

        let mut next = self.records.clone();
        next[index] = updated.clone();
        self.commit(next)?;

        Ok(updated)
    }

    /// Delete by id. An unknown id is a no-op and touches no storage.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, JournalError> {
        if !self.records.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let next: Vec<Record> = self.records.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(next)?;

        info!(id, "record removed");
        Ok(true)
    }

    /// Records matching every criterion in `filter`, newest first.
    pub fn query(&self, filter: &RecordFilter) -> Vec<Record> {
        self.collect_sorted(|r| filter.matches(r))
    }

    /// Records whose pair, pattern, or memo contains `term` (ignoring case),
    /// newest first. An empty term returns everything.
    pub fn search(&self, term: &str) -> Vec<Record> {
        if term.is_empty() {
            return self.collect_sorted(|_| true);
        }
        self.collect_sorted(|r| matches_term(r, term))
    }

    /// Records created within `start..=end`, newest first.
    pub fn records_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Record> {
        self.collect_sorted(|r| in_range(r, start, end))
    }

    /// Records created during the current local calendar day.
    pub fn todays_records(&self) -> Vec<Record> {
        let today = self.clock.now().with_timezone(&Local).date_naive();
        match day_bounds(&Local, today) {
            Some((start, end)) => self.records_in_range(start, end),
            None => Vec::new(),
        }
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::compute(&self.records)
    }

    fn collect_sorted(&self, keep: impl Fn(&Record) -> bool) -> Vec<Record> {
        let mut out: Vec<Record> = self.records.iter().filter(|r| keep(r)).cloned().collect();
        sort_newest_first(&mut out);
        out
    }

    fn commit(&mut self, next: Vec<Record>) -> Result<(), JournalError> {
        write_collection(&self.port, RECORDS_KEY, &next)?;
        self.records = next;
        Ok(())
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}
