//! Pipeline orchestration
//!
//! This module provides the public entry points for analysing a video.
//! [`VideoAnalysisBuilder`] drives the detector frame by frame, then pipes the
//! detection trace through closeness, classification and run statistics, and
//! assembles the immutable [`VideoAnalysis`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::classifier::InteractionClassifier;
use crate::closeness::ClosenessCalculator;
use crate::config::AnalysisConfig;
use crate::detection::FramePrediction;
use crate::error::AnalysisError;
use crate::source::{Detector, VideoSource};
use crate::statistics::{frame_time, RunStatistics};
use crate::trace::{DetectionTrace, ReplayDetector};
use crate::types::VideoAnalysis;

/// Stages of a build, in the only order they can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    NotStarted,
    DetectingFrames,
    ComputingCloseness,
    ComputingInteractions,
    ComputingStatistics,
    Built,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::NotStarted => "not_started",
            BuildStage::DetectingFrames => "detecting_frames",
            BuildStage::ComputingCloseness => "computing_closeness",
            BuildStage::ComputingInteractions => "computing_interactions",
            BuildStage::ComputingStatistics => "computing_statistics",
            BuildStage::Built => "built",
        };
        f.write_str(name)
    }
}

/// Shared flag used to cancel a running build between frames
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type StageObserver = Box<dyn FnMut(BuildStage) + Send>;

/// One-shot builder for a [`VideoAnalysis`]
///
/// Configuration is validated when the builder is created, before any frame
/// is requested. `build` consumes the builder; a failed or cancelled build
/// leaves nothing behind.
pub struct VideoAnalysisBuilder {
    config: AnalysisConfig,
    classifier: InteractionClassifier,
    cancellation: CancellationFlag,
    stage: BuildStage,
    observer: Option<StageObserver>,
}

impl VideoAnalysisBuilder {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let threshold = config.validate()?;
        Ok(Self {
            config,
            classifier: InteractionClassifier::new(threshold),
            cancellation: CancellationFlag::new(),
            stage: BuildStage::NotStarted,
            observer: None,
        })
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Call `observer` on every stage transition
    pub fn with_stage_observer(mut self, observer: impl FnMut(BuildStage) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Flag that cancels this builder's build when set
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Run the detector over every frame of `source` and analyse the trace
    pub fn build<S, D>(
        mut self,
        source: &mut S,
        detector: &mut D,
    ) -> Result<Arc<VideoAnalysis>, AnalysisError>
    where
        S: VideoSource,
        D: Detector<Frame = S::Frame>,
    {
        let total_frames = source.frame_count();
        if total_frames == 0 {
            return Err(AnalysisError::EmptyVideo);
        }
        let fps = source.fps();
        frame_time(fps)?;

        info!(
            source = source.source_id(),
            total_frames,
            fps,
            "Starting video analysis"
        );

        self.advance(BuildStage::DetectingFrames);
        let trace = self.detect_frames(source, detector, total_frames)?;

        self.analyse(source.source_id().to_string(), fps, trace)
    }

    /// Analyse an already collected detection trace, in playback order
    pub fn build_from_predictions(
        mut self,
        source_id: impl Into<String>,
        fps: f64,
        predictions: Vec<FramePrediction>,
    ) -> Result<Arc<VideoAnalysis>, AnalysisError> {
        if predictions.is_empty() {
            return Err(AnalysisError::EmptyVideo);
        }
        frame_time(fps)?;

        self.advance(BuildStage::DetectingFrames);
        self.analyse(source_id.into(), fps, predictions)
    }

    fn detect_frames<S, D>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        total_frames: usize,
    ) -> Result<Vec<FramePrediction>, AnalysisError>
    where
        S: VideoSource,
        D: Detector<Frame = S::Frame>,
    {
        let mut trace = Vec::with_capacity(total_frames);

        for idx in 0..total_frames {
            if self.cancellation.is_cancelled() {
                warn!(frame = idx, "Video analysis cancelled");
                return Err(AnalysisError::Cancelled { frame: idx });
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    return Err(AnalysisError::FrameCountMismatch {
                        expected: total_frames,
                        actual: idx,
                    })
                }
                Err(e) => {
                    return Err(AnalysisError::DetectionUnavailable {
                        frame: Some(idx),
                        reason: e.to_string(),
                    })
                }
            };

            let prediction =
                detector
                    .detect(&frame)
                    .map_err(|e| AnalysisError::DetectionUnavailable {
                        frame: Some(idx),
                        reason: e.to_string(),
                    })?;
            trace.push(prediction);
        }

        // a cancel raised during the last detector call still counts
        if self.cancellation.is_cancelled() {
            warn!(frame = total_frames, "Video analysis cancelled");
            return Err(AnalysisError::Cancelled {
                frame: total_frames,
            });
        }

        Ok(trace)
    }

    fn analyse(
        mut self,
        source_id: String,
        fps: f64,
        trace: Vec<FramePrediction>,
    ) -> Result<Arc<VideoAnalysis>, AnalysisError> {
        let frame_time = frame_time(fps)?;

        // Stage 1: Closeness per pair and frame
        self.advance(BuildStage::ComputingCloseness);
        let closeness = ClosenessCalculator::new(self.config.parallel_closeness).compute(&trace);
        drop(trace);

        // Stage 2: Threshold into interaction flags
        self.advance(BuildStage::ComputingInteractions);
        let interactions = self.classifier.classify_all(&closeness);

        // Stage 3: Run statistics
        self.advance(BuildStage::ComputingStatistics);
        let statistics = RunStatistics::aggregate_all(&interactions, frame_time);

        for (pair, stats) in statistics.iter() {
            debug!(
                pair = %pair,
                n_interactions = ?stats.n_interactions,
                total_time = ?stats.total_time,
                "Interaction statistics computed"
            );
        }

        let analysis = VideoAnalysis::new(
            source_id,
            fps,
            self.classifier.threshold(),
            closeness,
            interactions,
            statistics,
        );
        self.advance(BuildStage::Built);

        info!(
            source = analysis.source_id(),
            frames = analysis.frame_count(),
            "Video analysis built"
        );

        Ok(Arc::new(analysis))
    }

    fn advance(&mut self, next: BuildStage) {
        debug_assert!(next > self.stage, "stage {} after {}", next, self.stage);
        debug!(from = %self.stage, to = %next, "Build stage transition");
        self.stage = next;
        if let Some(observer) = self.observer.as_mut() {
            observer(next);
        }
    }
}

/// Analyse a recorded detection trace (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let trace = DetectionTrace::from_json(&trace_json)?;
/// let analysis = analyze_trace(&trace, &AnalysisConfig::default())?;
/// ```
pub fn analyze_trace(
    trace: &DetectionTrace,
    config: &AnalysisConfig,
) -> Result<Arc<VideoAnalysis>, AnalysisError> {
    let builder = VideoAnalysisBuilder::new(config.clone())?;
    let mut detector = ReplayDetector::new(config.min_confidence);
    builder.build(&mut trace.reader(), &mut detector)
}
