//! Dialogue engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::dialogue::EngineConfig;

/// Dialogue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueConfig {
    /// Consecutive failed turns before a conversation moves to FAILED.
    /// Unset means retry forever.
    pub max_consecutive_failures: Option<u32>,

    /// Number of recent history entries rendered into the completion prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Deadline for one completion call, in seconds
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,
}

impl DialogueConfig {
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }

    /// Validate dialogue configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_window == 0 {
            return Err(ValidationError::InvalidHistoryWindow);
        }
        if self.completion_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(ValidationError::InvalidFailureCeiling);
        }
        Ok(())
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: None,
            history_window: default_history_window(),
            completion_timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_history_window() -> usize {
    10
}

fn default_completion_timeout() -> u64 {
    45
}
