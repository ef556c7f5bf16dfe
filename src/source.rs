//! Collaborator contracts
//!
//! The pipeline depends only on these traits: a forward-only video source,
//! a per-frame detector and a sink that persists finished analyses.

use std::sync::{Arc, Mutex};

use crate::detection::FramePrediction;
use crate::error::{AnalysisError, DetectorError, SourceError};
use crate::types::VideoAnalysis;

/// Forward-only, ordered source of decoded frames
pub trait VideoSource {
    type Frame;

    /// Identifier recorded in the analysis (path, URL, ...)
    fn source_id(&self) -> &str;

    /// Number of frames the source announces
    fn frame_count(&self) -> usize;

    /// Frames per second
    fn fps(&self) -> f64;

    /// Next frame in playback order, or `None` once exhausted
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, SourceError>;
}

/// Object detector producing one prediction per frame
pub trait Detector {
    type Frame;

    fn detect(&mut self, frame: &Self::Frame) -> Result<FramePrediction, DetectorError>;
}

/// Persistence collaborator receiving finished analyses
pub trait AnalysisSink {
    fn persist(&mut self, analysis: Arc<VideoAnalysis>) -> Result<(), AnalysisError>;
}

/// Sink keeping analyses in memory, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    analyses: Arc<Mutex<Vec<Arc<VideoAnalysis>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far
    pub fn analyses(&self) -> Vec<Arc<VideoAnalysis>> {
        match self.analyses.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn find(&self, source_id: &str) -> Option<Arc<VideoAnalysis>> {
        self.analyses()
            .into_iter()
            .find(|a| a.source_id() == source_id)
    }
}

impl AnalysisSink for MemorySink {
    fn persist(&mut self, analysis: Arc<VideoAnalysis>) -> Result<(), AnalysisError> {
        let mut guard = match self.analyses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // one record per source: re-analysing a video replaces the old record
        guard.retain(|a| a.source_id() != analysis.source_id());
        guard.push(analysis);
        Ok(())
    }
}
