//! Tunables.
//!
//! The exemption length is an amount plus an explicit unit, so a grant of
//! "5" can never silently mean five seconds in one place and five minutes in
//! another.

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::FokusError;

/// Unit of [`FokusConfig::exemption_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExemptionUnit {
    Seconds,
    #[default]
    Minutes,
}

impl ExemptionUnit {
    /// Length of `amount` units in seconds.
    pub fn to_seconds(self, amount: u32) -> i64 {
        match self {
            Self::Seconds => i64::from(amount),
            Self::Minutes => i64::from(amount) * 60,
        }
    }

    fn noun(self, amount: u32) -> &'static str {
        match (self, amount) {
            (Self::Seconds, 1) => "second",
            (Self::Seconds, _) => "seconds",
            (Self::Minutes, 1) => "minute",
            (Self::Minutes, _) => "minutes",
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FokusConfig {
    /// How long a single grant lasts, in `exemption_unit`s.
    pub exemption_amount: u32,
    pub exemption_unit: ExemptionUnit,
    /// Countdown refresh period.
    pub tick_period_ms: u64,
    /// Remaining seconds at or below which the countdown is flagged urgent.
    pub urgent_threshold_secs: i64,
}

impl Default for FokusConfig {
    fn default() -> Self {
        Self {
            exemption_amount: 5,
            exemption_unit: ExemptionUnit::Minutes,
            tick_period_ms: 1000,
            urgent_threshold_secs: 15,
        }
    }
}

impl FokusConfig {
    /// Parse a JSON object; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, FokusError> {
        let config: Self = serde_json::from_str(text).map_err(|e| FokusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FokusError> {
        if self.exemption_amount == 0 {
            return Err(FokusError::Config("exemption_amount must be positive".to_string()));
        }
        if self.tick_period_ms == 0 {
            return Err(FokusError::Config("tick_period_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn exemption_duration(&self) -> Duration {
        Duration::seconds(self.exemption_unit.to_seconds(self.exemption_amount))
    }

    pub fn tick_period(&self) -> StdDuration {
        StdDuration::from_millis(self.tick_period_ms)
    }

    /// Label of the grant action, e.g. `Enable for 5 minutes`.
    pub fn grant_label(&self) -> String {
        format!(
            "Enable for {} {}",
            self.exemption_amount,
            self.exemption_unit.noun(self.exemption_amount)
        )
    }
}
