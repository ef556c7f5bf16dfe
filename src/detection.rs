//! Detector output
//!
//! A detector reports any number of raw rows per frame. The pipeline keeps
//! the single best row per actor class, which yields one [`FramePrediction`]
//! per frame.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::types::{ActorClass, ActorPair, Closeness};

/// Default detector confidence cut-off
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.75;

/// One raw detector row in normalized center form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub confidence: f64,
    pub class_id: u32,
}

/// Best bounding box of every actor class in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePrediction {
    boxes: [BoundingBox; 3],
}

impl Default for FramePrediction {
    fn default() -> Self {
        Self::empty()
    }
}

impl FramePrediction {
    /// A frame where no actor was detected
    pub fn empty() -> Self {
        Self {
            boxes: ActorClass::ALL.map(BoundingBox::absent),
        }
    }

    /// Build from one box per class; boxes are slotted by their own class
    pub fn from_boxes(boxes: impl IntoIterator<Item = BoundingBox>) -> Self {
        let mut prediction = Self::empty();
        for bbox in boxes {
            prediction.boxes[bbox.class().slot()] = bbox;
        }
        prediction
    }

    /// Collapse raw detector rows into one prediction
    ///
    /// For each class, keeps the highest-confidence row whose confidence is
    /// strictly above `min_confidence`. Rows with an unknown class id are ignored.
    /// On equal confidence the earlier row wins.
    pub fn from_raw_detections(rows: &[RawDetection], min_confidence: f64) -> Self {
        let mut best: [Option<&RawDetection>; 3] = [None; 3];

        for row in rows {
            let Some(class) = ActorClass::from_class_id(row.class_id) else {
                continue;
            };
            if !(row.confidence > min_confidence) {
                continue;
            }
            let slot = &mut best[class.slot()];
            if slot.map_or(true, |current| row.confidence > current.confidence) {
                *slot = Some(row);
            }
        }

        Self {
            boxes: ActorClass::ALL.map(|class| match best[class.slot()] {
                Some(r) => BoundingBox::detected(class, r.x, r.y, r.w, r.h, r.confidence),
                None => BoundingBox::absent(class),
            }),
        }
    }

    pub fn get(&self, class: ActorClass) -> &BoundingBox {
        &self.boxes[class.slot()]
    }

    pub fn detected_classes(&self) -> impl Iterator<Item = ActorClass> + '_ {
        self.boxes
            .iter()
            .filter(|b| b.is_present())
            .map(|b| b.class())
    }

    /// Closeness of a pair in this frame; undetermined when either actor is missing
    pub fn closeness(&self, pair: ActorPair) -> Closeness {
        let (a, b) = pair.classes();
        match self.get(a).normalized_iou(self.get(b)) {
            Ok(niou) => Closeness::Measured(niou),
            Err(_) => Closeness::Undetermined,
        }
    }
}
