//! Bounding box geometry
//!
//! A [`BoundingBox`] is either a detected region in normalized center form or
//! an explicit absence ("this class had no qualifying detection in this
//! frame"). Overlap tests are strict: boxes that only share an edge do not
//! overlap.

use serde::{Deserialize, Serialize};

use crate::error::MissingDetection;
use crate::types::ActorClass;

/// Detected region in normalized frame coordinates, with derived corners
///
/// Serializes in center form only; corners are recomputed on read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionFields", into = "RegionFields")]
pub struct Region {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    confidence: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

#[derive(Serialize, Deserialize)]
struct RegionFields {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    confidence: f64,
}

impl From<RegionFields> for Region {
    fn from(f: RegionFields) -> Self {
        Region::from_center(f.x, f.y, f.w, f.h, f.confidence)
    }
}

impl From<Region> for RegionFields {
    fn from(r: Region) -> Self {
        Self {
            x: r.x,
            y: r.y,
            w: r.w,
            h: r.h,
            confidence: r.confidence,
        }
    }
}

impl Region {
    pub fn from_center(x: f64, y: f64, w: f64, h: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence,
            x1: x - w / 2.0,
            x2: x + w / 2.0,
            y1: y - h / 2.0,
            y2: y + h / 2.0,
        }
    }

    /// Center x (0-1)
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Center y (0-1)
    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.w
    }

    pub fn height(&self) -> f64 {
        self.h
    }

    /// Detector confidence (0-1)
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    pub fn area(&self) -> f64 {
        rectangular_area(self.x1, self.x2, self.y1, self.y2)
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.x1 < other.x2 && self.y1 < other.y2 && other.x1 < self.x2 && other.y1 < self.y2
    }

    /// Area shared with `other`; zero when the shared rectangle is degenerate
    pub fn intersection_area(&self, other: &Region) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }
        rectangular_area(x1, x2, y1, y2)
    }

    /// Intersection over the smaller of the two areas, always within [0, 1]
    pub fn normalized_iou(&self, other: &Region) -> f64 {
        if !self.overlaps(other) {
            return 0.0;
        }

        let min_area = self.area().min(other.area());
        if !(min_area.is_finite() && min_area > 0.0) {
            return 0.0;
        }
        let niou = self.intersection_area(other) / min_area;
        if niou.is_nan() {
            return 0.0;
        }
        niou.clamp(0.0, 1.0)
    }
}

fn rectangular_area(x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    (x2 - x1) * (y2 - y1)
}

/// Best detection of one actor class in one frame, possibly absent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    class: ActorClass,
    region: Option<Region>,
}

impl BoundingBox {
    /// A detected box from normalized center coordinates
    pub fn detected(class: ActorClass, x: f64, y: f64, w: f64, h: f64, confidence: f64) -> Self {
        Self {
            class,
            region: Some(Region::from_center(x, y, w, h, confidence)),
        }
    }

    /// No qualifying detection for `class` in this frame
    pub fn absent(class: ActorClass) -> Self {
        Self {
            class,
            region: None,
        }
    }

    pub fn class(&self) -> ActorClass {
        self.class
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.region.is_some()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.region.map(|r| r.confidence())
    }

    pub fn area(&self) -> Option<f64> {
        self.region.map(|r| r.area())
    }

    /// True only when both boxes are present and strictly overlap
    pub fn is_overlapping(&self, other: &BoundingBox) -> bool {
        match (&self.region, &other.region) {
            (Some(a), Some(b)) => a.overlaps(b),
            _ => false,
        }
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> Result<f64, MissingDetection> {
        let (a, b) = self.both_regions(other)?;
        Ok(a.intersection_area(b))
    }

    /// Normalized IoU: intersection area divided by the smaller box area
    ///
    /// Returns 0 for present, non-overlapping boxes and fails when either
    /// box is absent.
    pub fn normalized_iou(&self, other: &BoundingBox) -> Result<f64, MissingDetection> {
        let (a, b) = self.both_regions(other)?;
        Ok(a.normalized_iou(b))
    }

    fn both_regions<'a>(
        &'a self,
        other: &'a BoundingBox,
    ) -> Result<(&'a Region, &'a Region), MissingDetection> {
        match (&self.region, &other.region) {
            (Some(a), Some(b)) => Ok((a, b)),
            (None, _) => Err(MissingDetection { class: self.class }),
            (_, None) => Err(MissingDetection { class: other.class }),
        }
    }
}
