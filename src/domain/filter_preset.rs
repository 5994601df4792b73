//! Named, reusable record filters and their export document.

use super::error::ValidationError;
use super::record_filter::RecordFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_PRESETS: usize = 10;
pub const PRESET_NAME_MAX_CHARS: usize = 50;
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub filters: RecordFilter,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

impl FilterPreset {
    /// Timestamp used for recency ranking.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.last_used_at.unwrap_or(self.created_at)
    }
}

/// Transport form produced by export and consumed by import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub filters: &'a [FilterPreset],
    pub exported_at: DateTime<Utc>,
    pub version: &'static str,
}

/// Trim and check a candidate name against the length limit and the names
/// already in use (compared case-insensitively).
pub fn validate_name<'a, I>(name: &str, taken: I) -> Result<String, ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPresetName);
    }

    let len = trimmed.chars().count();
    if len > PRESET_NAME_MAX_CHARS {
        return Err(ValidationError::PresetNameTooLong {
            len,
            max: PRESET_NAME_MAX_CHARS,
        });
    }

    let folded = trimmed.to_lowercase();
    if taken.into_iter().any(|n| n.to_lowercase() == folded) {
        return Err(ValidationError::DuplicatePresetName {
            name: trimmed.to_string(),
        });
    }

    Ok(trimmed.to_string())
}

/// Most used first; ties keep their stored order.
pub fn rank_by_usage(presets: &[FilterPreset], limit: usize) -> Vec<FilterPreset> {
    let mut ranked = presets.to_vec();
    ranked.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
    ranked.truncate(limit);
    ranked
}

/// Most recently used (or created, if never used) first; ties keep their
/// stored order.
pub fn rank_by_recency(presets: &[FilterPreset], limit: usize) -> Vec<FilterPreset> {
    let mut ranked = presets.to_vec();
    ranked.sort_by(|a, b| b.last_touched().cmp(&a.last_touched()));
    ranked.truncate(limit);
    ranked
}
