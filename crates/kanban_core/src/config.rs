//! Runtime configuration for the kanban service.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `toastLimit` is at least 1 and `logLevel` is a known level.

use crate::logging::{default_log_level, normalize_level};
use crate::store::ui_store::DEFAULT_TOAST_LIMIT;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_STORAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KanbanConfig {
    /// Idle delay before dirty registries are written.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// `None` disables the quota.
    #[serde(default = "default_storage_quota_bytes")]
    pub storage_quota_bytes: Option<u64>,
    #[serde(default = "default_toast_limit")]
    pub toast_limit: usize,
    #[serde(default = "default_level")]
    pub log_level: String,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: default_save_debounce_ms(),
            storage_quota_bytes: default_storage_quota_bytes(),
            toast_limit: default_toast_limit(),
            log_level: default_level(),
        }
    }
}

impl KanbanConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(value).map_err(ConfigError::Parse)?;
        config.validate()
    }

    /// Normalizes the log level and rejects out-of-range values.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.toast_limit == 0 {
            return Err(ConfigError::Invalid("toastLimit must be at least 1".to_string()));
        }
        self.log_level = normalize_level(&self.log_level)
            .map_err(ConfigError::Invalid)?
            .to_string();
        Ok(self)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

fn default_save_debounce_ms() -> u64 {
    DEFAULT_SAVE_DEBOUNCE_MS
}

fn default_storage_quota_bytes() -> Option<u64> {
    Some(DEFAULT_STORAGE_QUOTA_BYTES)
}

fn default_toast_limit() -> usize {
    DEFAULT_TOAST_LIMIT
}

fn default_level() -> String {
    default_log_level().to_string()
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, KanbanConfig, DEFAULT_SAVE_DEBOUNCE_MS};

    #[test]
    fn empty_object_yields_defaults() {
        let config = KanbanConfig::from_json_str("{}").unwrap();
        assert_eq!(config, KanbanConfig::default());
        assert_eq!(config.save_debounce_ms, DEFAULT_SAVE_DEBOUNCE_MS);
    }

    #[test]
    fn null_quota_disables_limit_and_level_is_normalized() {
        let config = KanbanConfig::from_json_str(
            r#"{"storageQuotaBytes": null, "logLevel": " WARNING "}"#,
        )
        .unwrap();
        assert_eq!(config.storage_quota_bytes, None);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn rejects_zero_toast_limit_and_unknown_fields() {
        let err = KanbanConfig::from_json_str(r#"{"toastLimit": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = KanbanConfig::from_json_str(r#"{"theme": "dark"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
