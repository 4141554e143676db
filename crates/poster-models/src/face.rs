//! Face detection models.
//!
//! Detection collaborators report faces as four-corner polygons; the
//! pipeline works with axis-aligned [`FaceRegion`] boxes derived from them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A polygon vertex in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A face as reported by a detection service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedFace {
    /// Bounding polygon corners, usually clockwise from top-left.
    pub corners: [Point; 4],
    /// Detection confidence score (0.0-1.0)
    pub confidence: f64,
}

impl DetectedFace {
    /// Create a detection from an axis-aligned box.
    pub fn from_box(x: f64, y: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            corners: [
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
            confidence,
        }
    }

    /// Axis-aligned bounding box over all four corners.
    pub fn region(&self) -> FaceRegion {
        let x_min = self.corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let x_max = self.corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let y_min = self.corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let y_max = self.corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        FaceRegion {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
            confidence: Some(self.confidence),
        }
    }

    /// Bounding-box area, `(xmax - xmin) * (ymax - ymin)`.
    pub fn area(&self) -> f64 {
        self.region().area()
    }
}

/// Axis-aligned face box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceRegion {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
    /// Detection confidence, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl FaceRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: None,
        }
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}
