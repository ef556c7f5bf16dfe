//! Therapy Interactions - interaction extraction for recorded therapy sessions
//!
//! Turns per-frame object detections of three actors (a child, a caretaker and
//! a therapeutic device) into a quantitative account of their interactions
//! through a deterministic pipeline: detection collapsing → bounding box
//! geometry → per-frame closeness → interaction thresholding → run statistics.
//!
//! ## Modules
//!
//! - **Geometry**: [`bbox`] overlap, intersection and normalized IoU
//! - **Pipeline stages**: [`closeness`], [`classifier`], [`statistics`]
//! - **Orchestration**: [`pipeline`] builds an immutable [`VideoAnalysis`]
//! - **Collaborators**: [`source`] traits, [`trace`] replay of recorded detections

pub mod bbox;
pub mod classifier;
pub mod closeness;
pub mod config;
pub mod detection;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod statistics;
pub mod trace;
pub mod types;

pub use bbox::BoundingBox;
pub use config::AnalysisConfig;
pub use detection::{FramePrediction, RawDetection};
pub use encoder::{AnalysisEncoder, AnalysisRecord};
pub use error::{AnalysisError, MissingDetection};
pub use pipeline::{analyze_trace, BuildStage, CancellationFlag, VideoAnalysisBuilder};
pub use source::{AnalysisSink, Detector, VideoSource};
pub use trace::DetectionTrace;
pub use types::{
    ActorClass, ActorPair, Closeness, InteractionRun, InteractionStatistics, PairMap,
    VideoAnalysis,
};

/// Crate version embedded in analysis records
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for analysis records
pub const PRODUCER_NAME: &str = "therapy-interactions";
