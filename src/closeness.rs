//! Frame closeness
//!
//! Turns an ordered detection trace into one closeness series per actor
//! pair. Every output slot is written exactly once into storage sized to the
//! trace length; the parallel path fans out over frames with rayon.

use rayon::prelude::*;
use tracing::debug;

use crate::detection::FramePrediction;
use crate::types::{ActorPair, Closeness, ClosenessSeries, PairMap};

/// Calculator for per-pair closeness series
#[derive(Debug, Clone, Copy)]
pub struct ClosenessCalculator {
    parallel: bool,
}

impl Default for ClosenessCalculator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ClosenessCalculator {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Compute closeness for every pair and frame of `trace`
    ///
    /// `trace` must be in playback order; output index `i` always refers to
    /// frame `i`.
    pub fn compute(&self, trace: &[FramePrediction]) -> PairMap<ClosenessSeries> {
        let closeness = PairMap::from_fn(|pair| {
            if self.parallel {
                compute_parallel(trace, pair)
            } else {
                compute_sequential(trace, pair)
            }
        });

        for (pair, series) in closeness.iter() {
            let undetermined = series.iter().filter(|c| c.is_undetermined()).count();
            debug!(
                pair = %pair,
                frames = series.len(),
                undetermined,
                "Closeness series computed"
            );
        }

        closeness
    }
}

fn compute_sequential(trace: &[FramePrediction], pair: ActorPair) -> ClosenessSeries {
    let mut series = vec![Closeness::Undetermined; trace.len()];
    for (slot, frame) in series.iter_mut().zip(trace) {
        *slot = frame.closeness(pair);
    }
    series
}

fn compute_parallel(trace: &[FramePrediction], pair: ActorPair) -> ClosenessSeries {
    let mut series = Vec::with_capacity(trace.len());
    trace
        .par_iter()
        .map(|frame| frame.closeness(pair))
        .collect_into_vec(&mut series);
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoundingBox;
    use crate::types::ActorClass;
    use pretty_assertions::assert_eq;

    fn frame(child_x: Option<f64>, caretaker_x: Option<f64>, device_x: Option<f64>) -> FramePrediction {
        let make = |class, x: Option<f64>| match x {
            Some(x) => BoundingBox::detected(class, x, 0.5, 0.2, 0.2, 0.9),
            None => BoundingBox::absent(class),
        };
        FramePrediction::from_boxes([
            make(ActorClass::Child, child_x),
            make(ActorClass::Caretaker, caretaker_x),
            make(ActorClass::Device, device_x),
        ])
    }

    fn sample_trace() -> Vec<FramePrediction> {
        vec![
            frame(Some(0.5), Some(0.5), Some(0.9)),
            frame(Some(0.5), Some(0.6), None),
            frame(None, Some(0.2), Some(0.2)),
            frame(Some(0.1), Some(0.8), Some(0.45)),
        ]
    }

    #[test]
    fn test_series_length_matches_trace() {
        let closeness = ClosenessCalculator::default().compute(&sample_trace());
        for (_, series) in closeness.iter() {
            assert_eq!(series.len(), 4);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let trace: Vec<FramePrediction> = (0..500)
            .map(|i| {
                let t = i as f64 / 500.0;
                let device = if i % 7 == 0 { None } else { Some(1.0 - t) };
                frame(Some(t), Some(0.5), device)
            })
            .collect();

        let parallel = ClosenessCalculator::new(true).compute(&trace);
        let sequential = ClosenessCalculator::new(false).compute(&trace);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_values_in_unit_range_or_undetermined() {
        let closeness = ClosenessCalculator::default().compute(&sample_trace());
        for (_, series) in closeness.iter() {
            for c in series {
                if let Some(v) = c.value() {
                    assert!((0.0..=1.0).contains(&v));
                }
            }
        }
    }

    #[test]
    fn test_missing_actor_yields_undetermined() {
        let closeness = ClosenessCalculator::default().compute(&sample_trace());

        assert_eq!(
            closeness[ActorPair::ChildDevice][1],
            Closeness::Undetermined
        );
        assert_eq!(
            closeness[ActorPair::CaretakerDevice][1],
            Closeness::Undetermined
        );
        assert_eq!(
            closeness[ActorPair::ChildCaretaker][2],
            Closeness::Undetermined
        );
        // identical boxes
        assert_eq!(
            closeness[ActorPair::CaretakerDevice][2],
            Closeness::Measured(1.0)
        );
        // disjoint boxes
        assert_eq!(
            closeness[ActorPair::ChildCaretaker][3],
            Closeness::Measured(0.0)
        );
    }

    #[test]
    fn test_empty_trace() {
        let closeness = ClosenessCalculator::default().compute(&[]);
        for (_, series) in closeness.iter() {
            assert!(series.is_empty());
        }
    }
}
