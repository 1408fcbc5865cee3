// Politeness Delay Policy

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Shape of the delay curve across a batch of requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayAlgorithm {
    Constant,
    #[default]
    Linear,
    Sigmoid,
}

/// How requests to a source are paced (durations in seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayPolicy {
    #[serde(default)]
    pub algorithm: DelayAlgorithm,
    pub max_duration: f64,
    #[serde(default)]
    pub min_duration: f64,
    /// Sample each delay uniformly around the curve
    #[serde(default)]
    pub random: bool,
    /// With `random`, the curve is the lower bound instead of the upper bound
    #[serde(default)]
    pub converge: bool,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            algorithm: DelayAlgorithm::Linear,
            max_duration: 10.0,
            min_duration: 1.0,
            random: false,
            converge: false,
        }
    }
}

impl DelayPolicy {
    pub fn constant(max_duration: f64) -> Self {
        Self {
            algorithm: DelayAlgorithm::Constant,
            max_duration,
            min_duration: 0.0,
            random: false,
            converge: false,
        }
    }

    /// `max_duration > 0` and `0 <= min_duration < max_duration`
    pub fn validate(&self) -> Result<()> {
        if !self.max_duration.is_finite() || self.max_duration <= 0.0 {
            return Err(DomainError::InvalidDelayPolicy(format!(
                "max_duration must be > 0 (got {})",
                self.max_duration
            )));
        }
        if !self.min_duration.is_finite()
            || self.min_duration < 0.0
            || self.min_duration >= self.max_duration
        {
            return Err(DomainError::InvalidDelayPolicy(format!(
                "min_duration must be in [0, {}) (got {})",
                self.max_duration, self.min_duration
            )));
        }
        Ok(())
    }
}
