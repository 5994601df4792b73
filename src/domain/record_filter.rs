//! Record filter criteria, free-text search, and date-range selection.

use super::record::{Direction, Record, MIN_CONFIDENCE};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Conjunctive filter over records. `None` (or an empty string) leaves a
/// criterion unset. The same shape is stored inside filter presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFilter {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "blank_as_none")]
    pub currency_pair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "blank_as_none")]
    pub timeframe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "blank_as_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_direction")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_confidence")]
    pub min_confidence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub trade_executed: Option<bool>,
}

impl RecordFilter {
    pub fn currency_pair(mut self, pair: &str) -> Self {
        self.currency_pair = Some(pair.to_string());
        self
    }

    pub fn timeframe(mut self, timeframe: &str) -> Self {
        self.timeframe = Some(timeframe.to_string());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn min_confidence(mut self, confidence: u8) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    pub fn trade_executed(mut self, executed: bool) -> Self {
        self.trade_executed = Some(executed);
        self
    }

    /// Number of criteria that actually narrow the result. A minimum
    /// confidence at the floor value narrows nothing; an explicit
    /// `trade_executed = false` does.
    pub fn active_criteria(&self) -> usize {
        let text = [&self.currency_pair, &self.timeframe, &self.pattern]
            .iter()
            .filter(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
            .count();
        let confidence = self.min_confidence.is_some_and(|c| c > MIN_CONFIDENCE) as usize;
        text + self.direction.is_some() as usize + confidence + self.trade_executed.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.active_criteria() == 0
    }

    pub fn matches(&self, record: &Record) -> bool {
        fn text_ok(criterion: &Option<String>, value: &str) -> bool {
            match criterion.as_deref() {
                Some(c) if !c.is_empty() => c == value,
                _ => true,
            }
        }

        text_ok(&self.currency_pair, &record.currency_pair)
            && text_ok(&self.timeframe, &record.timeframe)
            && text_ok(&self.pattern, &record.pattern)
            && self.direction.is_none_or(|d| d == record.direction)
            && self.min_confidence.is_none_or(|c| record.confidence >= c)
            && self.trade_executed.is_none_or(|e| e == record.trade_executed)
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn lenient_direction<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some("ロング") => Ok(Some(Direction::Long)),
        Some("ショート") => Ok(Some(Direction::Short)),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let raw = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    raw.map(|n| Some(super::record::clamp_confidence(n)))
        .ok_or_else(|| serde::de::Error::custom("minConfidence must be an integer"))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b)),
        Some(serde_json::Value::String(s)) => match s.as_str() {
            "" => Ok(None),
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "tradeExecuted must be true or false, got '{other}'"
            ))),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "tradeExecuted must be a boolean, got {other}"
        ))),
    }
}

/// Case-insensitive substring match against pair, pattern, and memo.
pub fn matches_term(record: &Record, term: &str) -> bool {
    let term = term.to_lowercase();
    record.currency_pair.to_lowercase().contains(&term)
        || record.pattern.to_lowercase().contains(&term)
        || record.memo.to_lowercase().contains(&term)
}

pub fn in_range(record: &Record, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    record.created_at >= start && record.created_at <= end
}

/// Stable sort, most recently created first.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Inclusive bounds of a calendar day in `tz`, 00:00:00 through 23:59:59.
///
/// Returns `None` when midnight does not exist in `tz` on that date.
pub fn day_bounds<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = tz
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()?;
    let end = tz
        .from_local_datetime(&date.and_hms_opt(23, 59, 59)?)
        .latest()?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::NewRecord;
    use chrono::FixedOffset;

    fn record(pair: &str, pattern: &str, direction: &str, confidence: i64, memo: &str) -> Record {
        NewRecord::new(pair, "1H", pattern, direction)
            .with_confidence(confidence)
            .with_memo(memo)
            .into_record(
                format!("{pair}-{pattern}"),
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = RecordFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&record("USD/JPY", "Flag", "Long", 3, "")));
    }

    #[test]
    fn all_criteria_are_conjunctive() {
        let r = record("USD/JPY", "Flag", "Long", 4, "");
        let filter = RecordFilter::default()
            .currency_pair("USD/JPY")
            .direction(Direction::Long)
            .min_confidence(4);
        assert!(filter.matches(&r));
        assert!(!filter.clone().direction(Direction::Short).matches(&r));
        assert!(!filter.min_confidence(5).matches(&r));
    }

    #[test]
    fn explicit_false_executed_is_a_criterion() {
        let filter = RecordFilter::default().trade_executed(false);
        assert_eq!(filter.active_criteria(), 1);
        let mut r = record("USD/JPY", "Flag", "Long", 3, "");
        assert!(filter.matches(&r));
        r.trade_executed = true;
        assert!(!filter.matches(&r));
    }

    #[test]
    fn floor_confidence_and_blanks_are_neutral() {
        let filter = RecordFilter {
            currency_pair: Some(String::new()),
            min_confidence: Some(1),
            ..RecordFilter::default()
        };
        assert!(filter.is_empty());
    }

    #[test]
    fn lenient_form_values_deserialize() {
        let json = r#"{"currencyPair":"","timeframe":"4H","pattern":"","direction":"ショート",
                       "minConfidence":"3","tradeExecuted":"true","unknownKey":1}"#;
        let filter: RecordFilter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.currency_pair, None);
        assert_eq!(filter.timeframe.as_deref(), Some("4H"));
        assert_eq!(filter.direction, Some(Direction::Short));
        assert_eq!(filter.min_confidence, Some(3));
        assert_eq!(filter.trade_executed, Some(true));
    }

    #[test]
    fn serialization_skips_unset_criteria() {
        let filter = RecordFilter::default().pattern("Flag");
        assert_eq!(serde_json::to_string(&filter).unwrap(), r#"{"pattern":"Flag"}"#);
    }

    #[test]
    fn search_is_case_insensitive_over_three_fields() {
        let r = record("EUR/USD", "Head and Shoulders", "Short", 3, "Watch the NFP release");
        assert!(matches_term(&r, "eur"));
        assert!(matches_term(&r, "SHOULDERS"));
        assert!(matches_term(&r, "nfp"));
        assert!(!matches_term(&r, "1h"));
    }

    #[test]
    fn sort_is_newest_first_and_stable() {
        let mut a = record("A/B", "x", "Long", 3, "");
        let mut b = record("C/D", "y", "Long", 3, "");
        let c = record("E/F", "z", "Long", 3, "");
        a.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        b.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut records = vec![a, c.clone(), b, c];
        sort_newest_first(&mut records);
        let pairs: Vec<&str> = records.iter().map(|r| r.currency_pair.as_str()).collect();
        assert_eq!(pairs, vec!["C/D", "E/F", "E/F", "A/B"]);
    }

    #[test]
    fn day_bounds_in_offset_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let (start, end) = day_bounds(&tokyo, date).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 30, 15, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 1, 14, 59, 59).unwrap());
    }

    #[test]
    fn range_is_inclusive() {
        let r = record("USD/JPY", "Flag", "Long", 3, "");
        assert!(in_range(&r, r.created_at, r.created_at));
        assert!(!in_range(&r, r.created_at + chrono::Duration::seconds(1), r.created_at + chrono::Duration::hours(1)));
    }
}
