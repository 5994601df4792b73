//! Domain error types.

/// A user-correctable rejection. The operation that raised it had no effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field '{field}' is missing")]
    MissingField { field: &'static str },

    #[error("direction must be Long or Short, got '{value}'")]
    InvalidDirection { value: String },

    #[error("memo must be at most {max} characters (got {len})")]
    MemoTooLong { len: usize, max: usize },

    #[error("preset name must not be empty")]
    EmptyPresetName,

    #[error("preset name must be at most {max} characters (got {len})")]
    PresetNameTooLong { len: usize, max: usize },

    #[error("a preset named '{name}' already exists")]
    DuplicatePresetName { name: String },

    #[error("at most {max} presets can be saved")]
    PresetLimitReached { max: usize },

    #[error("preset must set at least one filter criterion")]
    EmptyFilter,

    #[error("invalid preset document: {reason}")]
    InvalidImport { reason: String },

    #[error("no valid presets found in document")]
    NoValidPresets,

    #[error("importing {incoming} presets would exceed the limit of {max} (have {existing})")]
    ImportExceedsLimit {
        existing: usize,
        incoming: usize,
        max: usize,
    },
}

/// Top-level error type for fxjournal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no record with id {id}")]
    NotFound { id: String },

    #[error("storage error on '{key}': {reason}")]
    Persistence { key: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JournalError {
    pub fn persistence(key: &str, reason: impl ToString) -> Self {
        JournalError::Persistence {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, JournalError::Validation(_))
    }
}

// `std::io::Error` is not `Clone`; its copy keeps the kind and message.
impl Clone for JournalError {
    fn clone(&self) -> Self {
        match self {
            JournalError::Validation(e) => JournalError::Validation(e.clone()),
            JournalError::NotFound { id } => JournalError::NotFound { id: id.clone() },
            JournalError::Persistence { key, reason } => JournalError::Persistence {
                key: key.clone(),
                reason: reason.clone(),
            },
            JournalError::Database { reason } => JournalError::Database {
                reason: reason.clone(),
            },
            JournalError::ConfigParse { file, reason } => JournalError::ConfigParse {
                file: file.clone(),
                reason: reason.clone(),
            },
            JournalError::ConfigMissing { section, key } => JournalError::ConfigMissing {
                section: section.clone(),
                key: key.clone(),
            },
            JournalError::ConfigInvalid {
                section,
                key,
                reason,
            } => JournalError::ConfigInvalid {
                section: section.clone(),
                key: key.clone(),
                reason: reason.clone(),
            },
            JournalError::Io(e) => JournalError::Io(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

impl From<&JournalError> for std::process::ExitCode {
    fn from(err: &JournalError) -> Self {
        let code: u8 = match err {
            JournalError::Io(_) => 1,
            JournalError::ConfigParse { .. }
            | JournalError::ConfigMissing { .. }
            | JournalError::ConfigInvalid { .. } => 2,
            JournalError::Persistence { .. } | JournalError::Database { .. } => 3,
            JournalError::Validation(_) => 4,
            JournalError::NotFound { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
