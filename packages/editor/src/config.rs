//! Editor configuration

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::EditorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level editor configuration (`storefront.config.json` → `editor`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Maximum undo levels kept
    pub history_limit: usize,

    pub autosave: AutosaveConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            autosave: AutosaveConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(source: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutosaveConfig {
    pub enabled: bool,

    /// Quiet period after the last edit before saving
    pub debounce_ms: u64,

    /// Automatic retries after a failed save (0 = only explicit retry)
    pub max_retries: u32,

    /// First retry delay, doubled per attempt
    pub retry_backoff_ms: u64,

    pub max_backoff_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1500,
            max_retries: 2,
            retry_backoff_ms: 2000,
            max_backoff_ms: 30_000,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delay before automatic retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self
            .retry_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"autosave": {"debounceMs": 250}}"#).unwrap();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.autosave.debounce_ms, 250);
        assert_eq!(config.autosave.max_retries, 2);
        assert!(config.autosave.enabled);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = AutosaveConfig {
            retry_backoff_ms: 1000,
            max_backoff_ms: 5000,
            ..Default::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(1000));
        assert_eq!(config.backoff(2), Duration::from_millis(2000));
        assert_eq!(config.backoff(3), Duration::from_millis(4000));
        assert_eq!(config.backoff(4), Duration::from_millis(5000));
        assert_eq!(config.backoff(80), Duration::from_millis(5000));
    }
}
