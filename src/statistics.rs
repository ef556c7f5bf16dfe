//! Interaction run statistics
//!
//! A single left-to-right scan splits an interaction series into maximal
//! runs; only interacting runs are kept. Statistics are derived from those
//! runs and are all unavailable when there are none.

use crate::error::AnalysisError;
use crate::types::{InteractionRun, InteractionSeries, InteractionStatistics, PairMap};

/// Duration of one frame in seconds
pub fn frame_time(fps: f64) -> Result<f64, AnalysisError> {
    if fps.is_finite() && fps > 0.0 {
        Ok(1.0 / fps)
    } else {
        Err(AnalysisError::InvalidFrameRate(fps))
    }
}

/// Maximal runs of `true` in `series`, in order of appearance
pub fn interaction_runs(series: &[bool], frame_time: f64) -> Vec<InteractionRun> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;

    for (idx, &interacting) in series.iter().enumerate() {
        match (interacting, run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                runs.push(InteractionRun::new(start, idx - start, frame_time));
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        runs.push(InteractionRun::new(start, series.len() - start, frame_time));
    }

    runs
}

/// Aggregator turning interaction series into statistics
pub struct RunStatistics;

impl RunStatistics {
    /// Statistics of one interaction series
    pub fn aggregate(series: &[bool], frame_time: f64) -> InteractionStatistics {
        let runs = interaction_runs(series, frame_time);
        Self::from_runs(&runs, frame_time)
    }

    pub fn aggregate_all(
        interactions: &PairMap<InteractionSeries>,
        frame_time: f64,
    ) -> PairMap<InteractionStatistics> {
        interactions.map(|_, series| Self::aggregate(series, frame_time))
    }

    /// Statistics of already extracted runs
    pub fn from_runs(runs: &[InteractionRun], frame_time: f64) -> InteractionStatistics {
        let (Some(shortest), Some(longest)) = (
            runs.iter().map(|r| r.length).min(),
            runs.iter().map(|r| r.length).max(),
        ) else {
            return InteractionStatistics::unavailable();
        };

        let n_interactions = runs.len();
        let interacting_frames: usize = runs.iter().map(|r| r.length).sum();
        let total_time = interacting_frames as f64 * frame_time;

        InteractionStatistics {
            n_interactions: Some(n_interactions),
            total_time: Some(total_time),
            min_time: Some(shortest as f64 * frame_time),
            max_time: Some(longest as f64 * frame_time),
            mean_time: Some(total_time / n_interactions as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPS: f64 = 1e-9;

    fn series(pattern: &str) -> Vec<bool> {
        pattern.chars().map(|c| c == 'T').collect()
    }

    /// Independent run-length encoder used as a reference
    fn reference_rle(series: &[bool]) -> Vec<(bool, usize)> {
        let mut out: Vec<(bool, usize)> = Vec::new();
        for &v in series {
            match out.last_mut() {
                Some((last, len)) if *last == v => *len += 1,
                _ => out.push((v, 1)),
            }
        }
        out
    }

    #[test]
    fn test_two_runs_scenario() {
        let s = series("TTTFFTTF");
        let runs = interaction_runs(&s, 0.1);

        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].start, runs[0].length), (0, 3));
        assert_eq!((runs[1].start, runs[1].length), (5, 2));
        assert!((runs[0].duration - 0.3).abs() < EPS);
        assert!((runs[1].duration - 0.2).abs() < EPS);

        let stats = RunStatistics::aggregate(&s, 0.1);
        assert_eq!(stats.n_interactions, Some(2));
        assert!((stats.total_time.unwrap() - 0.5).abs() < EPS);
        assert!((stats.min_time.unwrap() - 0.2).abs() < EPS);
        assert!((stats.max_time.unwrap() - 0.3).abs() < EPS);
        assert!((stats.mean_time.unwrap() - 0.25).abs() < EPS);
    }

    #[test]
    fn test_no_interactions_means_no_statistics() {
        let s = vec![false; 10];
        assert!(interaction_runs(&s, 0.1).is_empty());

        let stats = RunStatistics::aggregate(&s, 0.1);
        assert_eq!(stats, InteractionStatistics::unavailable());
        assert!(!stats.is_available());
    }

    #[test]
    fn test_empty_series() {
        assert!(interaction_runs(&[], 0.04).is_empty());
        assert!(!RunStatistics::aggregate(&[], 0.04).is_available());
    }

    #[test]
    fn test_run_reaching_the_end() {
        let runs = interaction_runs(&series("FFTT"), 0.5);
        assert_eq!(runs, vec![InteractionRun::new(2, 2, 0.5)]);
        assert_eq!(runs[0].end(), 4);

        let runs = interaction_runs(&series("TTTT"), 0.5);
        assert_eq!(runs, vec![InteractionRun::new(0, 4, 0.5)]);
    }

    #[test]
    fn test_runs_agree_with_reference_encoder() {
        let patterns = [
            "T",
            "F",
            "TF",
            "FT",
            "TFTFTFT",
            "TTFFTTTFFFTTTT",
            "FFFFTFFFFFFTTTTTTTTF",
        ];

        for pattern in patterns {
            let s = series(pattern);
            let runs = interaction_runs(&s, 1.0);
            let reference: Vec<usize> = reference_rle(&s)
                .into_iter()
                .filter(|(v, _)| *v)
                .map(|(_, len)| len)
                .collect();

            let lengths: Vec<usize> = runs.iter().map(|r| r.length).collect();
            assert_eq!(lengths, reference, "pattern {pattern}");

            let true_count = s.iter().filter(|v| **v).count();
            assert_eq!(lengths.iter().sum::<usize>(), true_count);

            let stats = RunStatistics::from_runs(&runs, 1.0);
            if reference.is_empty() {
                assert!(!stats.is_available());
            } else {
                assert_eq!(stats.n_interactions, Some(reference.len()));
                assert!((stats.total_time.unwrap() - true_count as f64).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let s = series("TTFTFFTTTF");
        let first = RunStatistics::aggregate(&s, 1.0 / 30.0);
        for _ in 0..5 {
            assert_eq!(RunStatistics::aggregate(&s, 1.0 / 30.0), first);
        }
    }

    #[test]
    fn test_frame_time() {
        assert!((frame_time(25.0).unwrap() - 0.04).abs() < EPS);
        assert!(matches!(
            frame_time(0.0),
            Err(AnalysisError::InvalidFrameRate(_))
        ));
        assert!(frame_time(-30.0).is_err());
        assert!(frame_time(f64::NAN).is_err());
        assert!(frame_time(f64::INFINITY).is_err());
    }
}
