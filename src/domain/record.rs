//! Trading-opportunity records and their write-time validation.

use super::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MEMO_MAX_CHARS: usize = 200;
pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 5;
pub const DEFAULT_CONFIDENCE: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(alias = "ロング")]
    Long,
    #[serde(alias = "ショート")]
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Long" => Ok(Direction::Long),
            "Short" => Ok(Direction::Short),
            other => Err(ValidationError::InvalidDirection {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeResult {
    #[serde(alias = "成功")]
    Success,
    #[serde(alias = "失敗")]
    Failure,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Success => "Success",
            TradeResult::Failure => "Failure",
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(TradeResult::Success),
            "failure" => Ok(TradeResult::Failure),
            _ => Err(format!("unknown trade result '{s}', expected success or failure")),
        }
    }
}

/// Clamp a raw confidence value into `MIN_CONFIDENCE..=MAX_CONFIDENCE`.
pub fn clamp_confidence(value: i64) -> u8 {
    value.clamp(MIN_CONFIDENCE as i64, MAX_CONFIDENCE as i64) as u8
}

fn clamped_confidence<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(clamp_confidence(raw))
}

fn check_memo(memo: &str) -> Result<(), ValidationError> {
    let len = memo.chars().count();
    if len > MEMO_MAX_CHARS {
        return Err(ValidationError::MemoTooLong {
            len,
            max: MEMO_MAX_CHARS,
        });
    }
    Ok(())
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

/// One logged trading opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub currency_pair: String,
    pub timeframe: String,
    pub pattern: String,
    pub direction: Direction,
    #[serde(deserialize_with = "clamped_confidence")]
    pub confidence: u8,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub chart_url: String,
    #[serde(default)]
    pub trade_executed: bool,
    #[serde(default)]
    pub trade_result: Option<TradeResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn is_successful(&self) -> bool {
        self.trade_executed && self.trade_result == Some(TradeResult::Success)
    }
}

/// Caller-supplied fields for a new record, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecord {
    pub currency_pair: String,
    pub timeframe: String,
    pub pattern: String,
    pub direction: String,
    pub confidence: Option<i64>,
    pub memo: Option<String>,
    pub chart_url: Option<String>,
}

impl NewRecord {
    pub fn new(currency_pair: &str, timeframe: &str, pattern: &str, direction: &str) -> Self {
        Self {
            currency_pair: currency_pair.to_string(),
            timeframe: timeframe.to_string(),
            pattern: pattern.to_string(),
            direction: direction.to_string(),
            ..Self::default()
        }
    }

    pub fn with_confidence(mut self, confidence: i64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = Some(memo.to_string());
        self
    }

    pub fn with_chart_url(mut self, url: &str) -> Self {
        self.chart_url = Some(url.to_string());
        self
    }

    /// Validate and build the stored form. Nothing is clamped or trimmed
    /// until every check has passed.
    pub fn into_record(self, id: String, now: DateTime<Utc>) -> Result<Record, ValidationError> {
        let currency_pair = required(&self.currency_pair, "currencyPair")?;
        let timeframe = required(&self.timeframe, "timeframe")?;
        let pattern = required(&self.pattern, "pattern")?;
        let direction: Direction = required(&self.direction, "direction")?.parse()?;

        let memo = self.memo.unwrap_or_default();
        check_memo(&memo)?;

        Ok(Record {
            id,
            currency_pair,
            timeframe,
            pattern,
            direction,
            confidence: clamp_confidence(self.confidence.unwrap_or(DEFAULT_CONFIDENCE)),
            memo: memo.trim().to_string(),
            chart_url: self.chart_url.unwrap_or_default().trim().to_string(),
            trade_executed: false,
            trade_result: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; only `Some` fields overwrite the stored record.
///
/// `trade_result` is doubly optional so a patch can clear a result back to
/// `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub currency_pair: Option<String>,
    pub timeframe: Option<String>,
    pub pattern: Option<String>,
    pub direction: Option<Direction>,
    pub confidence: Option<i64>,
    pub memo: Option<String>,
    pub chart_url: Option<String>,
    pub trade_executed: Option<bool>,
    pub trade_result: Option<Option<TradeResult>>,
}

impl RecordPatch {
    pub fn with_confidence(mut self, confidence: i64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = Some(memo.to_string());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_executed(mut self, executed: bool) -> Self {
        self.trade_executed = Some(executed);
        self
    }

    pub fn with_result(mut self, result: Option<TradeResult>) -> Self {
        self.trade_result = Some(result);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into a copy of `record`. Either every field applies or none does.
    pub fn apply_to(&self, record: &Record, now: DateTime<Utc>) -> Result<Record, ValidationError> {
        let mut updated = record.clone();

        if let Some(pair) = &self.currency_pair {
            updated.currency_pair = required(pair, "currencyPair")?;
        }
        if let Some(timeframe) = &self.timeframe {
            updated.timeframe = required(timeframe, "timeframe")?;
        }
        if let Some(pattern) = &self.pattern {
            updated.pattern = required(pattern, "pattern")?;
        }
        if let Some(direction) = self.direction {
            updated.direction = direction;
        }
        if let Some(confidence) = self.confidence {
            updated.confidence = clamp_confidence(confidence);
        }
        if let Some(memo) = &self.memo {
            check_memo(memo)?;
            updated.memo = memo.trim().to_string();
        }
        if let Some(url) = &self.chart_url {
            updated.chart_url = url.trim().to_string();
        }
        if let Some(executed) = self.trade_executed {
            updated.trade_executed = executed;
        }
        if let Some(result) = self.trade_result {
            updated.trade_result = result;
        }

        updated.updated_at = now;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn sample_input() -> NewRecord {
        NewRecord::new("USD/JPY", "1H", "Double Bottom", "Long")
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_confidence(10), 5);
        assert_eq!(clamp_confidence(-1), 1);
        assert_eq!(clamp_confidence(0), 1);
        assert_eq!(clamp_confidence(3), 3);
        assert_eq!(clamp_confidence(i64::MAX), 5);
    }

    #[test]
    fn into_record_applies_defaults() {
        let record = sample_input().into_record("r1".into(), t0()).unwrap();
        assert_eq!(record.confidence, 3);
        assert_eq!(record.memo, "");
        assert_eq!(record.chart_url, "");
        assert!(!record.trade_executed);
        assert_eq!(record.trade_result, None);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn into_record_trims_memo_and_url() {
        let record = sample_input()
            .with_memo("  neckline break  ")
            .with_chart_url(" https://example.com/chart ")
            .into_record("r1".into(), t0())
            .unwrap();
        assert_eq!(record.memo, "neckline break");
        assert_eq!(record.chart_url, "https://example.com/chart");
    }

    #[test]
    fn blank_required_field_is_missing() {
        let mut input = sample_input();
        input.timeframe = "   ".into();
        assert_eq!(
            input.into_record("r1".into(), t0()),
            Err(ValidationError::MissingField { field: "timeframe" })
        );
    }

    #[test]
    fn direction_literals_only() {
        assert_eq!("Long".parse::<Direction>(), Ok(Direction::Long));
        assert_eq!("Short".parse::<Direction>(), Ok(Direction::Short));
        assert!("long".parse::<Direction>().is_err());
        assert!("Diagonal".parse::<Direction>().is_err());
    }

    #[test]
    fn memo_length_counts_characters() {
        let memo: String = "あ".repeat(200);
        assert!(sample_input().with_memo(&memo).into_record("r1".into(), t0()).is_ok());
        let memo: String = "あ".repeat(201);
        assert_eq!(
            sample_input().with_memo(&memo).into_record("r1".into(), t0()),
            Err(ValidationError::MemoTooLong { len: 201, max: 200 })
        );
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let record = sample_input().into_record("r1".into(), t0()).unwrap();
        let later = t0() + chrono::Duration::minutes(5);
        let patch = RecordPatch::default()
            .with_executed(true)
            .with_result(Some(TradeResult::Success));
        let updated = patch.apply_to(&record, later).unwrap();
        assert!(updated.trade_executed);
        assert_eq!(updated.trade_result, Some(TradeResult::Success));
        assert_eq!(updated.currency_pair, "USD/JPY");
        assert_eq!(updated.created_at, t0());
        assert_eq!(updated.updated_at, later);
    }

    #[test]
    fn patch_can_clear_result() {
        let mut record = sample_input().into_record("r1".into(), t0()).unwrap();
        record.trade_result = Some(TradeResult::Failure);
        let updated = RecordPatch::default()
            .with_result(None)
            .apply_to(&record, t0())
            .unwrap();
        assert_eq!(updated.trade_result, None);
    }

    #[test]
    fn patch_rejects_long_memo_without_partial_apply() {
        let record = sample_input().into_record("r1".into(), t0()).unwrap();
        let patch = RecordPatch::default()
            .with_confidence(1)
            .with_memo(&"x".repeat(201));
        assert!(patch.apply_to(&record, t0()).is_err());
        assert_eq!(record.confidence, 3);
    }

    #[test]
    fn serde_uses_camel_case_and_literals() {
        let record = sample_input().into_record("r1".into(), t0()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["currencyPair"], "USD/JPY");
        assert_eq!(json["direction"], "Long");
        assert_eq!(json["tradeExecuted"], false);
        assert!(json["tradeResult"].is_null());
    }

    #[test]
    fn legacy_literals_are_read() {
        let json = r#"{
            "id": "k1", "currencyPair": "EUR/USD", "timeframe": "4H",
            "pattern": "Flag", "direction": "ショート", "confidence": 9,
            "memo": "", "chartUrl": "", "tradeExecuted": true,
            "tradeResult": "成功",
            "createdAt": "2024-01-02T03:04:05.000Z",
            "updatedAt": "2024-01-02T03:04:05.000Z"
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.direction, Direction::Short);
        assert_eq!(record.trade_result, Some(TradeResult::Success));
        assert_eq!(record.confidence, 5);
        assert!(record.is_successful());
    }
}
