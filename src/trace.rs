//! Recorded detection traces
//!
//! A [`DetectionTrace`] stores the raw detector rows of every frame of a
//! session. Reading it back through a [`TraceReader`] and a
//! [`ReplayDetector`] replays the session without running a model.

use serde::{Deserialize, Serialize};

use crate::detection::{FramePrediction, RawDetection, DEFAULT_MIN_CONFIDENCE};
use crate::error::{AnalysisError, DetectorError, SourceError};
use crate::source::{Detector, VideoSource};
use crate::types::ActorClass;

/// Raw detections of a whole recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionTrace {
    pub source_id: String,
    pub fps: f64,
    /// Raw detector rows, one entry per frame in playback order
    pub frames: Vec<Vec<RawDetection>>,
}

impl DetectionTrace {
    pub fn new(source_id: impl Into<String>, fps: f64, frames: Vec<Vec<RawDetection>>) -> Self {
        Self {
            source_id: source_id.into(),
            fps,
            frames,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        serde_json::from_str(json)
            .map_err(|e| AnalysisError::ParseError(format!("Failed to parse detection trace: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Forward-only reader over the recorded frames
    pub fn reader(&self) -> TraceReader<'_> {
        TraceReader {
            trace: self,
            cursor: 0,
        }
    }

    /// Check the trace for problems that would fail or distort an analysis
    pub fn validate(&self) -> TraceReport {
        let mut issues = Vec::new();

        if self.frames.is_empty() {
            issues.push(TraceIssue {
                frame: None,
                message: "trace has no frames".to_string(),
            });
        }

        if !(self.fps.is_finite() && self.fps > 0.0) {
            issues.push(TraceIssue {
                frame: None,
                message: format!("invalid fps {}", self.fps),
            });
        }

        let mut detections = 0;
        for (idx, rows) in self.frames.iter().enumerate() {
            for row in rows {
                detections += 1;
                if ActorClass::from_class_id(row.class_id).is_none() {
                    issues.push(TraceIssue {
                        frame: Some(idx),
                        message: format!("unknown class id {}", row.class_id),
                    });
                }
                if !(0.0..=1.0).contains(&row.confidence) {
                    issues.push(TraceIssue {
                        frame: Some(idx),
                        message: format!("confidence {} outside [0, 1]", row.confidence),
                    });
                }
                if ![row.w, row.h].iter().all(|v| (0.0..=1.0).contains(v)) {
                    issues.push(TraceIssue {
                        frame: Some(idx),
                        message: format!("size {}x{} outside [0, 1]", row.w, row.h),
                    });
                }
                if ![row.x, row.y].iter().all(|v| (0.0..=1.0).contains(v)) {
                    issues.push(TraceIssue {
                        frame: Some(idx),
                        message: format!("center ({}, {}) outside the frame", row.x, row.y),
                    });
                }
            }
        }

        TraceReport {
            source_id: self.source_id.clone(),
            frames: self.frames.len(),
            detections,
            issues,
        }
    }
}

/// Outcome of [`DetectionTrace::validate`]
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub source_id: String,
    pub frames: usize,
    pub detections: usize,
    pub issues: Vec<TraceIssue>,
}

impl TraceReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<usize>,
    pub message: String,
}

/// [`VideoSource`] yielding the recorded rows of each frame
#[derive(Debug)]
pub struct TraceReader<'a> {
    trace: &'a DetectionTrace,
    cursor: usize,
}

impl<'a> VideoSource for TraceReader<'a> {
    type Frame = Vec<RawDetection>;

    fn source_id(&self) -> &str {
        &self.trace.source_id
    }

    fn frame_count(&self) -> usize {
        self.trace.frames.len()
    }

    fn fps(&self) -> f64 {
        self.trace.fps
    }

    fn next_frame(&mut self) -> Result<Option<Self::Frame>, SourceError> {
        let frame = self.trace.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }
}

/// [`Detector`] that collapses recorded rows instead of running a model
#[derive(Debug, Clone, Copy)]
pub struct ReplayDetector {
    min_confidence: f64,
}

impl Default for ReplayDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl ReplayDetector {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

impl Detector for ReplayDetector {
    type Frame = Vec<RawDetection>;

    fn detect(&mut self, frame: &Self::Frame) -> Result<FramePrediction, DetectorError> {
        Ok(FramePrediction::from_raw_detections(frame, self.min_confidence))
    }
}
