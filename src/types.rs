//! Core types for the interaction pipeline
//!
//! This module defines the data structures that flow between pipeline stages:
//! actor classes and pairs, per-pair series, interaction runs, statistics and
//! the assembled video analysis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::classifier::{InteractionClassifier, Threshold};
use crate::error::AnalysisError;
use crate::statistics::{frame_time, RunStatistics};

/// One of the three tracked actor classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorClass {
    Child,
    Caretaker,
    Device,
}

impl ActorClass {
    pub const ALL: [ActorClass; 3] = [ActorClass::Child, ActorClass::Caretaker, ActorClass::Device];

    /// Detector class id (0 = child, 1 = caretaker, 2 = device)
    pub fn from_class_id(class_id: u32) -> Option<Self> {
        match class_id {
            0 => Some(ActorClass::Child),
            1 => Some(ActorClass::Caretaker),
            2 => Some(ActorClass::Device),
            _ => None,
        }
    }

    pub fn class_id(&self) -> u32 {
        match self {
            ActorClass::Child => 0,
            ActorClass::Caretaker => 1,
            ActorClass::Device => 2,
        }
    }

    pub(crate) fn slot(&self) -> usize {
        self.class_id() as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorClass::Child => "child",
            ActorClass::Caretaker => "caretaker",
            ActorClass::Device => "device",
        }
    }
}

impl fmt::Display for ActorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unordered pair of actor classes whose proximity is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorPair {
    ChildCaretaker,
    ChildDevice,
    CaretakerDevice,
}

impl ActorPair {
    pub const ALL: [ActorPair; 3] = [
        ActorPair::ChildCaretaker,
        ActorPair::ChildDevice,
        ActorPair::CaretakerDevice,
    ];

    /// The two classes making up this pair
    pub fn classes(&self) -> (ActorClass, ActorClass) {
        match self {
            ActorPair::ChildCaretaker => (ActorClass::Child, ActorClass::Caretaker),
            ActorPair::ChildDevice => (ActorClass::Child, ActorClass::Device),
            ActorPair::CaretakerDevice => (ActorClass::Caretaker, ActorClass::Device),
        }
    }

    pub fn involves(&self, class: ActorClass) -> bool {
        let (a, b) = self.classes();
        a == class || b == class
    }

    fn slot(&self) -> usize {
        match self {
            ActorPair::ChildCaretaker => 0,
            ActorPair::ChildDevice => 1,
            ActorPair::CaretakerDevice => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorPair::ChildCaretaker => "child_caretaker",
            ActorPair::ChildDevice => "child_device",
            ActorPair::CaretakerDevice => "caretaker_device",
        }
    }
}

impl fmt::Display for ActorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed per-pair storage, one slot for each [`ActorPair`]
///
/// Serializes as an object keyed by pair name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PairFields<T>", into = "PairFields<T>")]
#[serde(bound(serialize = "T: Clone + Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct PairMap<T> {
    slots: [T; 3],
}

impl<T> PairMap<T> {
    /// Build a map by evaluating `f` once per pair, in [`ActorPair::ALL`] order
    pub fn from_fn(mut f: impl FnMut(ActorPair) -> T) -> Self {
        Self {
            slots: ActorPair::ALL.map(&mut f),
        }
    }

    pub fn get(&self, pair: ActorPair) -> &T {
        &self.slots[pair.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorPair, &T)> {
        ActorPair::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(ActorPair, &T) -> U) -> PairMap<U> {
        PairMap::from_fn(|pair| f(pair, self.get(pair)))
    }
}

impl<T> Index<ActorPair> for PairMap<T> {
    type Output = T;

    fn index(&self, pair: ActorPair) -> &T {
        self.get(pair)
    }
}

impl<T> IndexMut<ActorPair> for PairMap<T> {
    fn index_mut(&mut self, pair: ActorPair) -> &mut T {
        &mut self.slots[pair.slot()]
    }
}

#[derive(Serialize, Deserialize)]
struct PairFields<T> {
    child_caretaker: T,
    child_device: T,
    caretaker_device: T,
}

impl<T> From<PairFields<T>> for PairMap<T> {
    fn from(fields: PairFields<T>) -> Self {
        Self {
            slots: [
                fields.child_caretaker,
                fields.child_device,
                fields.caretaker_device,
            ],
        }
    }
}

impl<T> From<PairMap<T>> for PairFields<T> {
    fn from(map: PairMap<T>) -> Self {
        let [child_caretaker, child_device, caretaker_device] = map.slots;
        Self {
            child_caretaker,
            child_device,
            caretaker_device,
        }
    }
}

/// Proximity of two actors in one frame
///
/// `Undetermined` means at least one of the two actors was not detected.
/// Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Closeness {
    Measured(f64),
    Undetermined,
}

impl Closeness {
    pub fn value(&self) -> Option<f64> {
        match self {
            Closeness::Measured(v) => Some(*v),
            Closeness::Undetermined => None,
        }
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self, Closeness::Undetermined)
    }

    /// Strictly greater than `threshold`; undetermined never exceeds
    pub fn exceeds(&self, threshold: f64) -> bool {
        match self {
            Closeness::Measured(v) => *v > threshold,
            Closeness::Undetermined => false,
        }
    }
}

impl From<Option<f64>> for Closeness {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Closeness::Measured(v),
            None => Closeness::Undetermined,
        }
    }
}

impl From<Closeness> for Option<f64> {
    fn from(value: Closeness) -> Self {
        value.value()
    }
}

/// Per-frame closeness for one pair, in playback order
pub type ClosenessSeries = Vec<Closeness>;

/// Per-frame interaction flags for one pair, in playback order
pub type InteractionSeries = Vec<bool>;

/// Maximal contiguous span of interacting frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionRun {
    /// Index of the first frame of the run
    pub start: usize,
    /// Number of frames in the run (always >= 1)
    pub length: usize,
    /// Run duration in seconds (`length * frame_time`)
    pub duration: f64,
}

impl InteractionRun {
    pub fn new(start: usize, length: usize, frame_time: f64) -> Self {
        Self {
            start,
            length,
            duration: length as f64 * frame_time,
        }
    }

    /// Index one past the last frame of the run
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Summary of the interaction runs for one pair
///
/// Every field is `None` when no interaction occurred; this is distinct
/// from zero interactions of zero length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionStatistics {
    /// Number of interaction runs
    pub n_interactions: Option<usize>,
    /// Total interaction time (seconds)
    pub total_time: Option<f64>,
    /// Shortest run (seconds)
    pub min_time: Option<f64>,
    /// Longest run (seconds)
    pub max_time: Option<f64>,
    /// Mean run duration (seconds)
    pub mean_time: Option<f64>,
}

impl InteractionStatistics {
    /// Statistics for a series without any interaction
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.n_interactions.is_some()
    }

    /// Equal counts and durations within floating point noise
    fn approx_eq(&self, other: &Self) -> bool {
        fn close(a: Option<f64>, b: Option<f64>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
                (None, None) => true,
                _ => false,
            }
        }

        self.n_interactions == other.n_interactions
            && close(self.total_time, other.total_time)
            && close(self.min_time, other.min_time)
            && close(self.max_time, other.max_time)
            && close(self.mean_time, other.mean_time)
    }
}

/// Immutable result of analysing one video
///
/// Only the builder creates one directly. Deserialized analyses go through
/// [`VideoAnalysis::try_from_parts`] and must be internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnalysisParts")]
pub struct VideoAnalysis {
    source_id: String,
    fps: f64,
    closeness_threshold: Threshold,
    closeness: PairMap<ClosenessSeries>,
    interactions: PairMap<InteractionSeries>,
    statistics: PairMap<InteractionStatistics>,
}

/// Unchecked wire form of a [`VideoAnalysis`]
#[derive(Deserialize)]
struct AnalysisParts {
    source_id: String,
    fps: f64,
    closeness_threshold: Threshold,
    closeness: PairMap<ClosenessSeries>,
    interactions: PairMap<InteractionSeries>,
    statistics: PairMap<InteractionStatistics>,
}

impl TryFrom<AnalysisParts> for VideoAnalysis {
    type Error = AnalysisError;

    fn try_from(parts: AnalysisParts) -> Result<Self, Self::Error> {
        VideoAnalysis::try_from_parts(
            parts.source_id,
            parts.fps,
            parts.closeness_threshold,
            parts.closeness,
            parts.interactions,
            parts.statistics,
        )
    }
}

impl VideoAnalysis {
    pub(crate) fn new(
        source_id: String,
        fps: f64,
        closeness_threshold: Threshold,
        closeness: PairMap<ClosenessSeries>,
        interactions: PairMap<InteractionSeries>,
        statistics: PairMap<InteractionStatistics>,
    ) -> Self {
        Self {
            source_id,
            fps,
            closeness_threshold,
            closeness,
            interactions,
            statistics,
        }
    }

    /// Reassemble a stored analysis, checking it against its own closeness data
    ///
    /// Every series must have the same, non-zero length. Closeness values must
    /// lie in [0, 1], the interaction flags must be the thresholded closeness
    /// and the statistics must match the runs of the flags.
    pub fn try_from_parts(
        source_id: String,
        fps: f64,
        closeness_threshold: Threshold,
        closeness: PairMap<ClosenessSeries>,
        interactions: PairMap<InteractionSeries>,
        statistics: PairMap<InteractionStatistics>,
    ) -> Result<Self, AnalysisError> {
        let frame_time = frame_time(fps)?;

        let frames = closeness[ActorPair::ChildCaretaker].len();
        if frames == 0 {
            return Err(AnalysisError::EmptyVideo);
        }
        for pair in ActorPair::ALL {
            let (c, i) = (closeness[pair].len(), interactions[pair].len());
            if c != frames || i != frames {
                return Err(AnalysisError::InconsistentAnalysis(format!(
                    "{pair} series have {c} closeness and {i} interaction values, expected {frames}"
                )));
            }
            if let Some(idx) = closeness[pair]
                .iter()
                .position(|c| c.value().is_some_and(|v| !(0.0..=1.0).contains(&v)))
            {
                return Err(AnalysisError::InconsistentAnalysis(format!(
                    "{pair} closeness at frame {idx} is outside [0, 1]"
                )));
            }
        }

        let expected = InteractionClassifier::new(closeness_threshold).classify_all(&closeness);
        for pair in ActorPair::ALL {
            if expected[pair] != interactions[pair] {
                return Err(AnalysisError::InconsistentAnalysis(format!(
                    "{pair} interactions do not match closeness at threshold {}",
                    closeness_threshold.value()
                )));
            }
        }

        let expected = RunStatistics::aggregate_all(&interactions, frame_time);
        for pair in ActorPair::ALL {
            if !expected[pair].approx_eq(&statistics[pair]) {
                return Err(AnalysisError::InconsistentAnalysis(format!(
                    "{pair} statistics do not match the interaction runs"
                )));
            }
        }

        Ok(Self::new(
            source_id,
            fps,
            closeness_threshold,
            closeness,
            interactions,
            statistics,
        ))
    }

    /// Identifier of the analysed video (path, URL or caller-chosen key)
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Closeness threshold the interactions were derived with
    pub fn threshold(&self) -> Threshold {
        self.closeness_threshold
    }

    /// Number of analysed frames, shared by every per-pair series
    pub fn frame_count(&self) -> usize {
        self.closeness[ActorPair::ChildCaretaker].len()
    }

    pub fn closeness(&self, pair: ActorPair) -> &[Closeness] {
        &self.closeness[pair]
    }

    pub fn interactions(&self, pair: ActorPair) -> &[bool] {
        &self.interactions[pair]
    }

    pub fn statistics(&self, pair: ActorPair) -> &InteractionStatistics {
        &self.statistics[pair]
    }

    pub fn all_closeness(&self) -> &PairMap<ClosenessSeries> {
        &self.closeness
    }

    pub fn all_interactions(&self) -> &PairMap<InteractionSeries> {
        &self.interactions
    }

    pub fn all_statistics(&self) -> &PairMap<InteractionStatistics> {
        &self.statistics
    }

    /// Interaction runs for a pair, recovered from its interaction series
    pub fn runs(&self, pair: ActorPair) -> Vec<InteractionRun> {
        crate::statistics::interaction_runs(&self.interactions[pair], 1.0 / self.fps)
    }

    pub fn pairs(&self) -> impl Iterator<Item = ActorPair> {
        ActorPair::ALL.into_iter()
    }
}
