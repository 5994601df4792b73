//! The filter preset store.
//!
//! Structurally parallel to the record store, in its own storage namespace.
//! Usage tracking is best effort: its failures are logged, never returned.

use super::collection::{read_collection, write_collection};
use super::error::{JournalError, ValidationError};
use super::filter_preset::{
    rank_by_recency, rank_by_usage, validate_name, ExportDocument, FilterPreset,
    EXPORT_FORMAT_VERSION, MAX_PRESETS,
};
use super::record_filter::RecordFilter;
use crate::ports::clock_port::{Clock, SystemClock};
use crate::ports::kv_port::{KvPort, FILTER_PRESETS_KEY};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub struct PresetStore<P: KvPort> {
    port: P,
    clock: Box<dyn Clock>,
    presets: Vec<FilterPreset>,
    load_error: Option<JournalError>,
}

impl<P: KvPort> PresetStore<P> {
    pub fn open(port: P) -> Self {
        Self::open_with_clock(port, Box::new(SystemClock))
    }

    pub fn open_with_clock(port: P, clock: Box<dyn Clock>) -> Self {
        let mut store = Self {
            port,
            clock,
            presets: Vec::new(),
            load_error: None,
        };
        // A failure is kept in `load_error`.
        let _ = store.load();
        store
    }

    pub fn load(&mut self) -> Result<usize, JournalError> {
        match read_collection::<_, FilterPreset>(&self.port, FILTER_PRESETS_KEY) {
            Ok(presets) => {
                self.presets = presets.unwrap_or_default();
                self.load_error = None;
                Ok(self.presets.len())
            }
            Err(e) => {
                warn!(error = %e, "preset load failed, continuing with no presets");
                self.presets.clear();
                self.load_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn load_error(&self) -> Option<&JournalError> {
        self.load_error.as_ref()
    }

    pub fn presets(&self) -> &[FilterPreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<&FilterPreset> {
        let folded = name.trim().to_lowercase();
        self.presets.iter().find(|p| p.name.to_lowercase() == folded)
    }

    pub fn save(&mut self, name: &str, filters: RecordFilter) -> Result<FilterPreset, JournalError> {
        let name = validate_name(name, self.presets.iter().map(|p| p.name.as_str()))?;
        if self.presets.len() >= MAX_PRESETS {
            return Err(ValidationError::PresetLimitReached { max: MAX_PRESETS }.into());
        }
        if filters.is_empty() {
            return Err(ValidationError::EmptyFilter.into());
        }

        let preset = FilterPreset {
            id: self.fresh_id(),
            name,
            filters,
            created_at: self.clock.now(),
            usage_count: 0,
            last_used_at: None,
            imported_at: None,
        };

        let mut next = self.presets.clone();
        next.push(preset.clone());
        self.commit(next)?;

        info!(id = %preset.id, name = %preset.name, "preset saved");
        Ok(preset)
    }

    /// Delete by id. An unknown id is a no-op. Returns whether anything was
    /// removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, JournalError> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next: Vec<FilterPreset> = self.presets.iter().filter(|p| p.id != id).cloned().collect();
        self.commit(next)?;
        Ok(true)
    }

    /// Count one application of the preset and return it. `None` for an
    /// unknown id. A failed write is logged and the preset is still returned,
    /// without the usage bump.
    pub fn apply_usage(&mut self, id: &str) -> Option<FilterPreset> {
        let index = self.presets.iter().position(|p| p.id == id)?;

        let mut next = self.presets.clone();
        next[index].usage_count += 1;
        next[index].last_used_at = Some(self.clock.now());

        if let Err(e) = self.commit(next) {
            warn!(id, error = %e, "preset usage was not recorded");
        }
        Some(self.presets[index].clone())
    }

    pub fn most_used(&self, limit: usize) -> Vec<FilterPreset> {
        rank_by_usage(&self.presets, limit)
    }

    pub fn most_recent(&self, limit: usize) -> Vec<FilterPreset> {
        rank_by_recency(&self.presets, limit)
    }

    /// Serialize every preset with an export timestamp and format version.
    pub fn export(&self) -> Result<String, JournalError> {
        let document = ExportDocument {
            filters: &self.presets,
            exported_at: self.clock.now(),
            version: EXPORT_FORMAT_VERSION,
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| JournalError::persistence(FILTER_PRESETS_KEY, e))
    }

    /// Import presets from an exported document and return how many were
    /// added.
    ///
    /// Entries without a usable name or filter object are skipped, as are
    /// names already in use and filters with no criterion. The import as a
    /// whole fails if nothing usable remains or the result would exceed
    /// [`MAX_PRESETS`].
    pub fn import(&mut self, document: &str) -> Result<usize, JournalError> {
        let parsed: Value = serde_json::from_str(document).map_err(|e| {
            ValidationError::InvalidImport {
                reason: format!("not valid JSON: {e}"),
            }
        })?;
        let entries = parsed
            .get("filters")
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::InvalidImport {
                reason: "'filters' must be a list".to_string(),
            })?;

        let now = self.clock.now();
        let mut accepted: Vec<FilterPreset> = Vec::new();

        for entry in entries {
            let Some(candidate) = self.parse_entry(entry, &accepted, now) else {
                continue;
            };
            accepted.push(candidate);
        }

        if accepted.is_empty() {
            return Err(ValidationError::NoValidPresets.into());
        }
        if self.presets.len() + accepted.len() > MAX_PRESETS {
            return Err(ValidationError::ImportExceedsLimit {
                existing: self.presets.len(),
                incoming: accepted.len(),
                max: MAX_PRESETS,
            }
            .into());
        }

        let count = accepted.len();
        let mut next = self.presets.clone();
        next.extend(accepted);
        self.commit(next)?;

        info!(count, skipped = entries.len() - count, "presets imported");
        Ok(count)
    }

    fn parse_entry(
        &self,
        entry: &Value,
        accepted: &[FilterPreset],
        now: DateTime<Utc>,
    ) -> Option<FilterPreset> {
        let raw_name = entry.get("name").and_then(Value::as_str)?;
        let raw_filters = entry.get("filters").filter(|v| v.is_object())?;

        let taken = self
            .presets
            .iter()
            .chain(accepted.iter())
            .map(|p| p.name.as_str());
        let name = validate_name(raw_name, taken).ok()?;

        let filters: RecordFilter = serde_json::from_value(raw_filters.clone()).ok()?;
        if filters.is_empty() {
            return None;
        }

        let created_at = entry
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);

        Some(FilterPreset {
            id: self.fresh_id_excluding(accepted),
            name,
            filters,
            created_at,
            usage_count: 0,
            last_used_at: None,
            imported_at: Some(now),
        })
    }

    fn commit(&mut self, next: Vec<FilterPreset>) -> Result<(), JournalError> {
        write_collection(&self.port, FILTER_PRESETS_KEY, &next)?;
        self.presets = next;
        Ok(())
    }

    fn fresh_id(&self) -> String {
        self.fresh_id_excluding(&[])
    }

    fn fresh_id_excluding(&self, pending: &[FilterPreset]) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() && pending.iter().all(|p| p.id != id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_adapter::MemoryKvAdapter;
    use chrono::TimeZone;
    use std::cell::Cell;

    struct StepClock(Cell<DateTime<Utc>>);

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let now = self.0.get();
            self.0.set(now + chrono::Duration::seconds(30));
            now
        }
    }

    fn store(kv: &MemoryKvAdapter) -> PresetStore<&MemoryKvAdapter> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        PresetStore::open_with_clock(kv, Box::new(StepClock(Cell::new(start))))
    }

    fn majors() -> RecordFilter {
        RecordFilter::default().currency_pair("USD/JPY")
    }

    #[test]
    fn save_assigns_id_and_zero_usage() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        let preset = s.save("Yen longs", majors()).unwrap();
        assert!(!preset.id.is_empty());
        assert_eq!(preset.usage_count, 0);
        assert_eq!(preset.last_used_at, None);
        assert!(kv.raw(FILTER_PRESETS_KEY).unwrap().contains("Yen longs"));
    }

    #[test]
    fn save_rejects_empty_filter() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        let neutral = RecordFilter::default().min_confidence(1);
        assert!(matches!(
            s.save("Nothing", neutral),
            Err(JournalError::Validation(ValidationError::EmptyFilter))
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn cap_is_checked_before_filter() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        for i in 0..MAX_PRESETS {
            s.save(&format!("P{i}"), majors()).unwrap();
        }
        assert!(matches!(
            s.save("Extra", RecordFilter::default()),
            Err(JournalError::Validation(ValidationError::PresetLimitReached { max: 10 }))
        ));
    }

    #[test]
    fn apply_usage_counts_and_stamps() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        let preset = s.save("Yen", majors()).unwrap();
        let applied = s.apply_usage(&preset.id).unwrap();
        assert_eq!(applied.usage_count, 1);
        assert!(applied.last_used_at.unwrap() > preset.created_at);
        assert!(s.apply_usage("missing").is_none());
    }

    #[test]
    fn apply_usage_failure_is_swallowed() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        let preset = s.save("Yen", majors()).unwrap();
        kv.set_fail_writes(true);
        let applied = s.apply_usage(&preset.id).unwrap();
        assert_eq!(applied.filters, majors());
        assert_eq!(s.get(&preset.id).unwrap().usage_count, 0);
    }

    #[test]
    fn failed_reload_records_error_and_empties() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        s.save("Majors", majors()).unwrap();

        kv.set_fail_reads(true);
        assert!(s.load().is_err());
        assert!(matches!(s.load_error(), Some(JournalError::Persistence { .. })));
        assert!(s.is_empty());

        kv.set_fail_reads(false);
        s.load().unwrap();
        assert!(s.load_error().is_none());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn find_by_name_ignores_case() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        let preset = s.save("Yen Longs", majors()).unwrap();
        assert_eq!(s.find_by_name("yen longs").map(|p| &p.id), Some(&preset.id));
        assert!(s.find_by_name("euro").is_none());
    }

    #[test]
    fn export_carries_version_and_presets() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        s.save("Yen", majors()).unwrap();
        let doc: Value = serde_json::from_str(&s.export().unwrap()).unwrap();
        assert_eq!(doc["version"], "1.0");
        assert!(doc["exportedAt"].is_string());
        assert_eq!(doc["filters"].as_array().unwrap().len(), 1);
        assert_eq!(doc["filters"][0]["name"], "Yen");
    }

    #[test]
    fn import_drops_invalid_entries() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        s.save("Existing", majors()).unwrap();
        let doc = r#"{"filters": [
            {"name": "Good", "filters": {"pattern": "Flag"}, "usageCount": 42},
            {"name": "", "filters": {"pattern": "Flag"}},
            {"name": "No filters"},
            {"name": "Array filters", "filters": []},
            {"name": "existing", "filters": {"pattern": "Flag"}},
            {"name": "Neutral", "filters": {"currencyPair": "", "minConfidence": 1}},
            {"name": "good", "filters": {"pattern": "Wedge"}}
        ]}"#;
        assert_eq!(s.import(doc).unwrap(), 1);
        let good = s.find_by_name("Good").unwrap();
        assert_eq!(good.usage_count, 0);
        assert!(good.imported_at.is_some());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn import_requires_a_list() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        for doc in [r#"{"filters": {}}"#, r#"{"presets": []}"#, "nope"] {
            assert!(matches!(
                s.import(doc),
                Err(JournalError::Validation(ValidationError::InvalidImport { .. }))
            ));
        }
        assert!(matches!(
            s.import(r#"{"filters": [{"name": "x"}]}"#),
            Err(JournalError::Validation(ValidationError::NoValidPresets))
        ));
    }

    #[test]
    fn import_respects_cap() {
        let kv = MemoryKvAdapter::new();
        let mut s = store(&kv);
        for i in 0..9 {
            s.save(&format!("P{i}"), majors()).unwrap();
        }
        let doc = r#"{"filters": [
            {"name": "A", "filters": {"pattern": "Flag"}},
            {"name": "B", "filters": {"pattern": "Flag"}}
        ]}"#;
        assert!(matches!(
            s.import(doc),
            Err(JournalError::Validation(ValidationError::ImportExceedsLimit {
                existing: 9,
                incoming: 2,
                max: 10
            }))
        ));
        assert_eq!(s.len(), 9);
    }

    #[test]
    fn export_then_import_into_fresh_store() {
        let source_kv = MemoryKvAdapter::new();
        let mut source = store(&source_kv);
        source.save("Yen", majors()).unwrap();
        source.save("Shorts", RecordFilter::default().trade_executed(false)).unwrap();
        let doc = source.export().unwrap();

        let target_kv = MemoryKvAdapter::new();
        let mut target = store(&target_kv);
        assert_eq!(target.import(&doc).unwrap(), 2);
        let shorts = target.find_by_name("Shorts").unwrap();
        assert_eq!(shorts.filters.trade_executed, Some(false));
        assert_ne!(shorts.id, source.find_by_name("Shorts").unwrap().id);
    }
}
