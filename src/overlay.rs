//! Overlay planning.
//!
//! Turns filtered detections into draw-ready boxes in display space.
//! Purely computational: the actual drawing surface sits behind
//! [`OverlayRenderer`], so the pipeline stays free of GUI concerns.

use crate::detect::FilteredDetections;

/// Solid color for a box stroke / label background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Fixed palette cycled per label, so a label keeps its color across
/// frames.
const PALETTE: [Rgb; 8] = [
    Rgb { r: 255, g: 99, b: 71 },
    Rgb { r: 65, g: 105, b: 225 },
    Rgb { r: 50, g: 205, b: 50 },
    Rgb { r: 255, g: 165, b: 0 },
    Rgb { r: 186, g: 85, b: 211 },
    Rgb { r: 0, g: 206, b: 209 },
    Rgb { r: 255, g: 215, b: 0 },
    Rgb { r: 220, g: 20, b: 60 },
];

/// One box ready to draw, in display coordinates.
#[derive(Clone, Debug)]
pub struct OverlayBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub confidence: f32,
    pub color: Rgb,
}

impl OverlayBox {
    /// Label text with confidence, e.g. `phone (81%)`.
    pub fn description(&self) -> String {
        format!("{} ({:.0}%)", self.label, self.confidence * 100.0)
    }
}

fn label_color(label: &str) -> Rgb {
    let sum: usize = label.bytes().map(|b| b as usize).sum();
    PALETTE[sum % PALETTE.len()]
}

/// Scale detections from model input space to a display surface.
///
/// Box origins are clamped to >= 0 and extents clipped to the model
/// bounds before scaling, so a box hanging off the frame edge draws as a
/// partial box instead of escaping the canvas.
pub fn plan_overlay(
    detections: &FilteredDetections,
    display_width: f64,
    display_height: f64,
    model_width: f64,
    model_height: f64,
) -> Vec<OverlayBox> {
    if display_width <= 0.0 || display_height <= 0.0 || model_width <= 0.0 || model_height <= 0.0 {
        return Vec::new();
    }

    let scale_x = display_width / model_width;
    let scale_y = display_height / model_height;

    detections
        .iter()
        .map(|d| {
            let x = f64::from(d.bounds.x).max(0.0);
            let y = f64::from(d.bounds.y).max(0.0);
            let width = f64::from(d.bounds.width).min(model_width - x);
            let height = f64::from(d.bounds.height).min(model_height - y);

            OverlayBox {
                x: x * scale_x,
                y: y * scale_y,
                width: (width * scale_x).max(0.0),
                height: (height * scale_y).max(0.0),
                label: d.label.clone(),
                confidence: d.confidence,
                color: label_color(&d.label),
            }
        })
        .collect()
}

/// Display surface boundary. A GUI shell implements this; the daemon
/// ships null and log renderers.
pub trait OverlayRenderer: Send {
    fn render(&mut self, boxes: &[OverlayBox], display_width: f64, display_height: f64);
}

/// Discards overlays. Used in headless runs.
pub struct NullRenderer;

impl OverlayRenderer for NullRenderer {
    fn render(&mut self, _boxes: &[OverlayBox], _display_width: f64, _display_height: f64) {}
}

/// Logs each planned box at debug level.
pub struct LogRenderer;

impl OverlayRenderer for LogRenderer {
    fn render(&mut self, boxes: &[OverlayBox], _display_width: f64, _display_height: f64) {
        for b in boxes {
            log::debug!(
                "overlay {} at ({:.0},{:.0}) {:.0}x{:.0}",
                b.description(),
                b.x,
                b.y,
                b.width,
                b.height
            );
        }
    }
}
