//! Engine tuning knobs.
//!
//! [`EngineConfig`] is a plain value injected into the services that need
//! it. Every field has a default, so an empty TOML document is valid.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunable thresholds shared by the planning and analytics services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Multiplier applied to sprint capacity before a commitment is refused.
    pub overcommit_factor: f64,
    /// Relative burndown deviation from the ideal line treated as a risk.
    pub burndown_deviation_threshold: f64,
    /// Number of blocked tasks in a sprint treated as a risk.
    pub blocked_task_risk_threshold: usize,
    /// Maximum length of a parent chain, counting the task itself.
    pub max_parent_depth: usize,
    /// Minimum seconds between critical-path recomputations.
    pub critical_path_refresh_secs: u64,
    /// Width of one cycle/lead time trend bucket, in days.
    pub trend_bucket_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overcommit_factor: 1.0,
            burndown_deviation_threshold: 0.2,
            blocked_task_risk_threshold: 3,
            max_parent_depth: 5,
            critical_path_refresh_secs: 300,
            trend_bucket_days: 7,
        }
    }
}

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its accepted range.
    #[error("invalid engine configuration value for {field}: {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// Accepted range.
        reason: &'static str,
    },
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.overcommit_factor.is_finite() || self.overcommit_factor <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "overcommit_factor",
                reason: "must be a finite number greater than zero",
            });
        }
        if !self.burndown_deviation_threshold.is_finite() || self.burndown_deviation_threshold < 0.0
        {
            return Err(ConfigError::Invalid {
                field: "burndown_deviation_threshold",
                reason: "must be a finite, non-negative number",
            });
        }
        if self.max_parent_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_parent_depth",
                reason: "must be at least 1",
            });
        }
        if self.trend_bucket_days == 0 {
            return Err(ConfigError::Invalid {
                field: "trend_bucket_days",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Returns the critical-path refresh interval.
    #[must_use]
    pub fn critical_path_refresh(&self) -> TimeDelta {
        i64::try_from(self.critical_path_refresh_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Returns the trend bucket width.
    #[must_use]
    pub fn trend_bucket(&self) -> TimeDelta {
        TimeDelta::try_days(i64::from(self.trend_bucket_days)).unwrap_or(TimeDelta::MAX)
    }
}
