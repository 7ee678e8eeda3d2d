use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Axis-aligned box in model input coordinate space (not display space).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection-over-union with another box. Returns 0 for
    /// degenerate (zero-area) inputs.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);

        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A labeled, localized, confidence-scored object proposal from the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounds: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bounds: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounds,
        }
    }
}

/// Ordered, bounded sequence of detections that survived confidence
/// thresholding and non-max suppression. Produced only by
/// [`filter_detections`](crate::detect::filter_detections); downstream
/// consumers (gate, overlay) trust it as given and do not re-filter.
#[derive(Clone, Debug, Default)]
pub struct FilteredDetections {
    detections: Vec<Detection>,
}

impl FilteredDetections {
    pub(crate) fn from_vec(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Empty set, used when upstream produced nothing (or failed).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }
}

impl Deref for FilteredDetections {
    type Target = [Detection];

    fn deref(&self) -> &[Detection] {
        &self.detections
    }
}

impl<'a> IntoIterator for &'a FilteredDetections {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}
