//! Analysis configuration

use serde::{Deserialize, Serialize};

use crate::classifier::{Threshold, DEFAULT_CLOSENESS_THRESHOLD};
use crate::detection::DEFAULT_MIN_CONFIDENCE;
use crate::error::AnalysisError;

/// Tunable parameters of an analysis build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Closeness above which a frame counts as an interaction (0-1)
    pub closeness_threshold: f64,
    /// Detector confidence cut-off used when collapsing raw detections (0-1)
    pub min_confidence: f64,
    /// Compute closeness series on the rayon pool
    pub parallel_closeness: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            closeness_threshold: DEFAULT_CLOSENESS_THRESHOLD,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            parallel_closeness: true,
        }
    }
}

impl AnalysisConfig {
    /// Check every parameter and return the validated threshold
    pub fn validate(&self) -> Result<Threshold, AnalysisError> {
        let threshold = Threshold::new(self.closeness_threshold)?;
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(AnalysisError::InvalidConfidence(self.min_confidence));
        }
        Ok(threshold)
    }

    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
