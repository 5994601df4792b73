//! Aggregate statistics over a record collection.
//!
//! Everything here is a pure function of the records passed in; nothing is
//! cached between calls.

use super::record::Record;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_records: usize,
    pub executed_trades: usize,
    pub successful_trades: usize,
    /// Percentage of executed trades that succeeded, rounded to one decimal.
    /// Zero when nothing has been executed.
    pub success_rate: f64,
    pub currency_pair_counts: BTreeMap<String, usize>,
    pub pattern_counts: BTreeMap<String, usize>,
    pub direction_counts: BTreeMap<String, usize>,
}

impl Statistics {
    pub fn compute(records: &[Record]) -> Self {
        let mut currency_pair_counts = BTreeMap::new();
        let mut pattern_counts = BTreeMap::new();
        let mut direction_counts = BTreeMap::new();
        let mut executed_trades = 0usize;
        let mut successful_trades = 0usize;

        for record in records {
            *currency_pair_counts
                .entry(record.currency_pair.clone())
                .or_insert(0) += 1;
            *pattern_counts.entry(record.pattern.clone()).or_insert(0) += 1;
            *direction_counts
                .entry(record.direction.as_str().to_string())
                .or_insert(0) += 1;

            if record.trade_executed {
                executed_trades += 1;
                if record.is_successful() {
                    successful_trades += 1;
                }
            }
        }

        let success_rate = if executed_trades > 0 {
            round1(successful_trades as f64 / executed_trades as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            total_records: records.len(),
            executed_trades,
            successful_trades,
            success_rate,
            currency_pair_counts,
            pattern_counts,
            direction_counts,
        }
    }

    /// Display form of the success rate: one decimal place, or a bare `0`
    /// when no trade has been executed.
    pub fn success_rate_label(&self) -> String {
        if self.executed_trades == 0 {
            "0".to_string()
        } else {
            format!("{:.1}", self.success_rate)
        }
    }
}

// `successRate` is written as its display label ("0", "100.0").
impl Serialize for Statistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Statistics", 7)?;
        state.serialize_field("totalRecords", &self.total_records)?;
        state.serialize_field("executedTrades", &self.executed_trades)?;
        state.serialize_field("successfulTrades", &self.successful_trades)?;
        state.serialize_field("successRate", &self.success_rate_label())?;
        state.serialize_field("currencyPairCounts", &self.currency_pair_counts)?;
        state.serialize_field("patternCounts", &self.pattern_counts)?;
        state.serialize_field("directionCounts", &self.direction_counts)?;
        state.end()
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// The `limit` most frequent entries, by count descending then name.
pub fn top_counts(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComparison {
    pub this_month: usize,
    pub last_month: usize,
    pub change: i64,
}

/// Record counts for the calendar month containing `today` and the one
/// before it, as seen in `tz`.
pub fn monthly_comparison<Tz: TimeZone>(
    records: &[Record],
    tz: &Tz,
    today: NaiveDate,
) -> MonthlyComparison {
    let this_key = (today.year(), today.month());
    let last_key = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };

    let month_of = |at: &DateTime<Utc>| {
        let local = at.with_timezone(tz);
        (local.year(), local.month())
    };

    let this_month = records
        .iter()
        .filter(|r| month_of(&r.created_at) == this_key)
        .count();
    let last_month = records
        .iter()
        .filter(|r| month_of(&r.created_at) == last_key)
        .count();

    MonthlyComparison {
        this_month,
        last_month,
        change: this_month as i64 - last_month as i64,
    }
}
