//! Interaction classification
//!
//! An interaction is predicted for a frame when the closeness of a pair is
//! strictly greater than the configured threshold. Undetermined closeness is
//! classified as no interaction.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::types::{Closeness, ClosenessSeries, InteractionSeries, PairMap};

/// Default closeness threshold
pub const DEFAULT_CLOSENESS_THRESHOLD: f64 = 0.6;

/// Closeness threshold, validated to lie in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, AnalysisError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AnalysisError::InvalidThreshold(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_CLOSENESS_THRESHOLD)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = AnalysisError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

/// Thresholds closeness series into interaction series
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionClassifier {
    threshold: Threshold,
}

impl InteractionClassifier {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn classify(&self, closeness: &[Closeness]) -> InteractionSeries {
        let threshold = self.threshold.value();
        closeness.iter().map(|c| c.exceeds(threshold)).collect()
    }

    pub fn classify_all(&self, closeness: &PairMap<ClosenessSeries>) -> PairMap<InteractionSeries> {
        closeness.map(|_, series| self.classify(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActorPair;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_threshold_bounds() {
        assert!(Threshold::new(0.0).is_ok());
        assert!(Threshold::new(1.0).is_ok());
        assert!(Threshold::new(0.6).is_ok());

        assert!(matches!(
            Threshold::new(1.2),
            Err(AnalysisError::InvalidThreshold(v)) if v == 1.2
        ));
        assert!(Threshold::new(-0.1).is_err());
        assert!(Threshold::new(f64::NAN).is_err());
    }

    #[test]
    fn test_threshold_deserialization_validates() {
        let t: Threshold = serde_json::from_str("0.4").unwrap();
        assert_eq!(t.value(), 0.4);
        assert!(serde_json::from_str::<Threshold>("2.0").is_err());
    }

    #[test]
    fn test_classify_strict_and_undetermined() {
        let classifier = InteractionClassifier::new(Threshold::new(0.6).unwrap());
        let closeness = vec![
            Closeness::Measured(0.0),
            Closeness::Measured(0.6),
            Closeness::Measured(0.600001),
            Closeness::Measured(1.0),
            Closeness::Undetermined,
        ];

        assert_eq!(
            classifier.classify(&closeness),
            vec![false, false, true, true, false]
        );
    }

    #[test]
    fn test_flags_match_comparison_for_every_frame() {
        let classifier = InteractionClassifier::default();
        let closeness: Vec<Closeness> = (0..=20)
            .map(|i| {
                if i % 5 == 0 {
                    Closeness::Undetermined
                } else {
                    Closeness::Measured(i as f64 / 20.0)
                }
            })
            .collect();

        let flags = classifier.classify(&closeness);
        assert_eq!(flags.len(), closeness.len());
        for (c, flag) in closeness.iter().zip(&flags) {
            let expected = c.value().map_or(false, |v| v > DEFAULT_CLOSENESS_THRESHOLD);
            assert_eq!(*flag, expected);
        }
    }

    #[test]
    fn test_classify_all_keeps_pairs_apart() {
        let closeness = PairMap::from_fn(|pair| match pair {
            ActorPair::ChildCaretaker => vec![Closeness::Measured(0.9)],
            ActorPair::ChildDevice => vec![Closeness::Measured(0.1)],
            ActorPair::CaretakerDevice => vec![Closeness::Undetermined],
        });

        let flags = InteractionClassifier::default().classify_all(&closeness);
        assert_eq!(flags[ActorPair::ChildCaretaker], vec![true]);
        assert_eq!(flags[ActorPair::ChildDevice], vec![false]);
        assert_eq!(flags[ActorPair::CaretakerDevice], vec![false]);
    }
}
