//! Detection post-filter: confidence threshold, non-max suppression,
//! bounded count. This is the upstream contract the notification gate
//! trusts — the gate never re-filters.

use crate::detect::result::{Detection, FilteredDetections};

/// IoU above which two boxes are considered the same object.
const NMS_IOU_THRESHOLD: f32 = 0.5;

/// Filter parameters. Defaults match the reference model pipeline:
/// at most 5 boxes, confidence at least 0.5.
#[derive(Clone, Copy, Debug)]
pub struct FilterConfig {
    pub confidence_threshold: f32,
    pub max_boxes: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            max_boxes: 5,
        }
    }
}

/// Reduce raw backend output to a bounded, ordered detection set:
///
/// 1. drop detections below the confidence threshold (NaN never passes)
/// 2. sort by confidence, descending
/// 3. greedy non-max suppression at IoU > 0.5 between same-label boxes
/// 4. truncate to `max_boxes`
pub fn filter_detections(mut raw: Vec<Detection>, config: &FilterConfig) -> FilteredDetections {
    raw.retain(|d| d.confidence >= config.confidence_threshold);
    raw.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in raw {
        if kept.len() >= config.max_boxes {
            break;
        }
        let duplicate = kept.iter().any(|k| {
            k.label == candidate.label && k.bounds.iou(&candidate.bounds) > NMS_IOU_THRESHOLD
        });
        if !duplicate {
            kept.push(candidate);
        }
    }

    FilteredDetections::from_vec(kept)
}
