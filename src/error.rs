//! Error types for the interaction pipeline

use thiserror::Error;

use crate::types::ActorClass;

/// Errors that abort an analysis build or a configuration step
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Detections unavailable{}: {reason}", frame_suffix(.frame))]
    DetectionUnavailable {
        frame: Option<usize>,
        reason: String,
    },

    #[error("Video has no frames")]
    EmptyVideo,

    #[error("Invalid closeness threshold: {0} (expected a value in [0, 1])")]
    InvalidThreshold(f64),

    #[error("Invalid confidence cut-off: {0} (expected a value in [0, 1])")]
    InvalidConfidence(f64),

    #[error("Invalid frame rate: {0} (expected a finite, positive fps)")]
    InvalidFrameRate(f64),

    #[error("Frame count mismatch: expected {expected} frames, source produced {actual}")]
    FrameCountMismatch { expected: usize, actual: usize },

    #[error("Build cancelled before frame {frame}")]
    Cancelled { frame: usize },

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Inconsistent analysis: {0}")]
    InconsistentAnalysis(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn frame_suffix(frame: &Option<usize>) -> String {
    match frame {
        Some(idx) => format!(" at frame {idx}"),
        None => String::new(),
    }
}

/// One of the two boxes handed to a geometry operation had no detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No {class} detection in this frame")]
pub struct MissingDetection {
    pub class: ActorClass,
}

/// Failure reported by a detector collaborator for a single frame
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

/// Failure reported by a video source collaborator
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Video source unreadable: {0}")]
    Unreadable(String),

    #[error("Frame decode failed: {0}")]
    DecodeFailed(String),
}
