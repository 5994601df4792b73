//! Reference vocabularies: currency pairs, timeframes, and entry patterns.
//!
//! These are labeled lookup lists the journal reads for display and input
//! checks; the record and preset stores never modify them. Built-in defaults
//! are written on first read of an empty key.

use super::collection::{read_collection, write_collection};
use super::error::JournalError;
use crate::ports::kv_port::{CURRENCY_PAIRS_KEY, KvPort, PATTERNS_KEY, TIMEFRAMES_KEY};
use serde::{Deserialize, Serialize};
use tracing::info;

const MAJOR_PAIRS: &[&str] = &[
    "USD/JPY", "EUR/USD", "GBP/USD", "USD/CHF", "AUD/USD", "USD/CAD", "NZD/USD",
];

const CROSS_PAIRS: &[&str] = &[
    "EUR/JPY", "GBP/JPY", "CHF/JPY", "AUD/JPY", "CAD/JPY", "NZD/JPY", "EUR/GBP", "EUR/CHF",
];

const DEFAULT_PAIRS: &[&str] = &[
    "USD/JPY", "EUR/USD", "GBP/USD", "USD/CHF", "AUD/USD", "USD/CAD", "NZD/USD",
    "EUR/JPY", "GBP/JPY", "CHF/JPY", "AUD/JPY", "CAD/JPY", "NZD/JPY",
    "EUR/GBP", "EUR/CHF", "EUR/AUD", "EUR/CAD", "EUR/NZD",
    "GBP/CHF", "GBP/AUD", "GBP/CAD", "GBP/NZD",
    "AUD/CHF", "AUD/CAD", "AUD/NZD",
    "CHF/CAD", "CAD/CHF", "NZD/CAD",
];

// (name, display name, minutes)
const DEFAULT_TIMEFRAMES: &[(&str, &str, u32)] = &[
    ("15M", "15 minutes", 15),
    ("30M", "30 minutes", 30),
    ("1H", "1 hour", 60),
    ("4H", "4 hours", 240),
    ("1D", "Daily", 1440),
];

// (name, category)
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("Head and Shoulders", "Reversal"),
    ("Inverse Head and Shoulders", "Reversal"),
    ("Double Top", "Reversal"),
    ("Double Bottom", "Reversal"),
    ("Triple Top", "Reversal"),
    ("Triple Bottom", "Reversal"),
    ("Flag", "Continuation"),
    ("Pennant", "Continuation"),
    ("Wedge", "Continuation"),
    ("Triangle", "Continuation"),
    ("Rectangle", "Continuation"),
    ("N-Wave Up", "N-Wave"),
    ("N-Wave Down", "N-Wave"),
    ("W Bottom", "N-Wave"),
    ("M Top", "N-Wave"),
    ("Gartley", "Harmonic"),
    ("Bat", "Harmonic"),
    ("Butterfly", "Harmonic"),
    ("Crab", "Harmonic"),
    ("Breakout", "Other"),
    ("Pullback", "Other"),
    ("Buy the Dip", "Other"),
    ("Sell the Rally", "Other"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyKind {
    CurrencyPairs,
    Timeframes,
    Patterns,
}

impl VocabularyKind {
    pub fn key(&self) -> &'static str {
        match self {
            VocabularyKind::CurrencyPairs => CURRENCY_PAIRS_KEY,
            VocabularyKind::Timeframes => TIMEFRAMES_KEY,
            VocabularyKind::Patterns => PATTERNS_KEY,
        }
    }

    pub fn defaults(&self) -> Vec<VocabularyEntry> {
        match self {
            VocabularyKind::CurrencyPairs => DEFAULT_PAIRS
                .iter()
                .enumerate()
                .map(|(i, pair)| VocabularyEntry {
                    id: i as u32 + 1,
                    name: pair.to_string(),
                    display_name: None,
                    category: currency_category(pair).to_string(),
                    is_active: true,
                    display_order: i as u32 + 1,
                })
                .collect(),
            VocabularyKind::Timeframes => DEFAULT_TIMEFRAMES
                .iter()
                .enumerate()
                .map(|(i, (name, display, minutes))| VocabularyEntry {
                    id: i as u32 + 1,
                    name: name.to_string(),
                    display_name: Some(display.to_string()),
                    category: if *minutes < 1440 { "Intraday" } else { "Daily" }.to_string(),
                    is_active: true,
                    display_order: i as u32 + 1,
                })
                .collect(),
            VocabularyKind::Patterns => DEFAULT_PATTERNS
                .iter()
                .enumerate()
                .map(|(i, (name, category))| VocabularyEntry {
                    id: i as u32 + 1,
                    name: name.to_string(),
                    display_name: None,
                    category: category.to_string(),
                    is_active: true,
                    display_order: i as u32 + 1,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: u32,
}

fn default_active() -> bool {
    true
}

impl VocabularyEntry {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

pub fn currency_category(pair: &str) -> &'static str {
    if MAJOR_PAIRS.contains(&pair) {
        "Major"
    } else if CROSS_PAIRS.contains(&pair) {
        "Cross"
    } else {
        "Exotic"
    }
}

/// Read a vocabulary, writing the built-in defaults first if none is stored.
pub fn load_vocabulary<P>(port: &P, kind: VocabularyKind) -> Result<Vec<VocabularyEntry>, JournalError>
where
    P: KvPort + ?Sized,
{
    if let Some(entries) = read_collection(port, kind.key())? {
        return Ok(entries);
    }
    let defaults = kind.defaults();
    write_collection(port, kind.key(), &defaults)?;
    info!(key = kind.key(), entries = defaults.len(), "seeded default vocabulary");
    Ok(defaults)
}

/// Active entries in display order.
pub fn active_entries(entries: &[VocabularyEntry]) -> Vec<VocabularyEntry> {
    let mut active: Vec<VocabularyEntry> = entries.iter().filter(|e| e.is_active).cloned().collect();
    active.sort_by_key(|e| e.display_order);
    active
}

/// Whether `name` is one of the active entries, ignoring case.
pub fn is_known(entries: &[VocabularyEntry], name: &str) -> bool {
    entries
        .iter()
        .any(|e| e.is_active && e.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_adapter::MemoryKvAdapter;

    #[test]
    fn categories() {
        assert_eq!(currency_category("USD/JPY"), "Major");
        assert_eq!(currency_category("EUR/CHF"), "Cross");
        assert_eq!(currency_category("NZD/CAD"), "Exotic");
    }

    #[test]
    fn first_read_seeds_defaults() {
        let kv = MemoryKvAdapter::new();
        let pairs = load_vocabulary(&kv, VocabularyKind::CurrencyPairs).unwrap();
        assert_eq!(pairs.len(), 28);
        assert!(kv.raw(CURRENCY_PAIRS_KEY).is_some());
        assert_eq!(kv.write_count(), 1);

        let again = load_vocabulary(&kv, VocabularyKind::CurrencyPairs).unwrap();
        assert_eq!(again, pairs);
        assert_eq!(kv.write_count(), 1);
    }

    #[test]
    fn stored_entries_win_over_defaults() {
        let kv = MemoryKvAdapter::new().with_value(
            TIMEFRAMES_KEY,
            r#"[{"id":1,"name":"5M","displayName":"5 minutes","category":"Intraday","isActive":true,"displayOrder":1}]"#,
        );
        let tfs = load_vocabulary(&kv, VocabularyKind::Timeframes).unwrap();
        assert_eq!(tfs.len(), 1);
        assert_eq!(tfs[0].label(), "5 minutes");
    }

    #[test]
    fn active_entries_are_ordered() {
        let mut entries = VocabularyKind::Patterns.defaults();
        entries[0].is_active = false;
        entries[1].display_order = 100;
        let active = active_entries(&entries);
        assert_eq!(active.len(), entries.len() - 1);
        assert_eq!(active.last().unwrap().name, "Inverse Head and Shoulders");
        assert!(!is_known(&entries, "head and shoulders"));
        assert!(is_known(&entries, "double top"));
    }
}
