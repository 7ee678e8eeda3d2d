#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Candidates scoring below this are not worth carrying to the filter.
const NOISE_FLOOR: f32 = 0.1;

/// Output layout of a YOLO v2 style grid model.
#[derive(Clone, Debug)]
pub struct YoloLayout {
    pub labels: Vec<String>,
    /// (width, height) anchor pairs, in grid cell units.
    pub anchors: Vec<(f32, f32)>,
    pub grid: usize,
    pub cell_size: u32,
}

impl YoloLayout {
    /// Layout of the reference TinyYolo2_model.onnx (Pascal VOC classes).
    pub fn tiny_yolo_v2() -> Self {
        let labels = [
            "aeroplane",
            "bicycle",
            "bird",
            "boat",
            "bottle",
            "bus",
            "car",
            "cat",
            "chair",
            "cow",
            "diningtable",
            "dog",
            "horse",
            "motorbike",
            "person",
            "pottedplant",
            "sheep",
            "sofa",
            "train",
            "tvmonitor",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            labels,
            anchors: vec![
                (1.08, 1.19),
                (3.42, 4.41),
                (6.63, 11.38),
                (9.42, 5.11),
                (16.62, 10.52),
            ],
            grid: 13,
            cell_size: 32,
        }
    }

    /// Custom-trained exports ship their own label list but keep the
    /// TinyYOLO anchor set and grid.
    pub fn custom(labels: Vec<String>) -> Self {
        Self {
            labels,
            ..Self::tiny_yolo_v2()
        }
    }

    fn channels_per_anchor(&self) -> usize {
        5 + self.labels.len()
    }

    fn input_pixels(&self) -> u32 {
        (self.grid as u32) * self.cell_size
    }
}

/// Tract-based backend for ONNX inference.
///
/// Loads a local model file, resizes frames to the model input size, and
/// decodes the YOLO v2 output grid into labeled detections in model input
/// coordinates. No network I/O, no disk writes beyond model loading.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    layout: YoloLayout,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, layout: YoloLayout) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = layout.input_pixels() as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, layout })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let side = self.layout.input_pixels();
        let rgb = image::RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("frame buffer is not a valid {}x{} RGB image", width, height))?;
        let resized = image::imageops::resize(&rgb, side, side, image::imageops::FilterType::Nearest);

        let side = side as usize;
        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
                resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
            });

        Ok(input.into_tensor())
    }

    fn decode_grid(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .get(0)
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let grid = self.layout.grid;
        let per_anchor = self.layout.channels_per_anchor();
        let expected = self.layout.anchors.len() * per_anchor * grid * grid;
        if view.len() != expected {
            return Err(anyhow!(
                "model output has {} values, expected {} (is the label list right?)",
                view.len(),
                expected
            ));
        }
        let view = view
            .into_shape((self.layout.anchors.len() * per_anchor, grid, grid))
            .context("model output does not match the YOLO grid shape")?;

        let cell = self.layout.cell_size as f32;
        let mut detections = Vec::new();

        for cy in 0..grid {
            for cx in 0..grid {
                for (anchor_idx, &(anchor_w, anchor_h)) in self.layout.anchors.iter().enumerate() {
                    let base = anchor_idx * per_anchor;
                    let tx = view[[base, cy, cx]];
                    let ty = view[[base + 1, cy, cx]];
                    let tw = view[[base + 2, cy, cx]];
                    let th = view[[base + 3, cy, cx]];
                    let objectness = sigmoid(view[[base + 4, cy, cx]]);

                    if objectness < NOISE_FLOOR {
                        continue;
                    }

                    let class_scores: Vec<f32> = (0..self.layout.labels.len())
                        .map(|c| view[[base + 5 + c, cy, cx]])
                        .collect();
                    let probs = softmax(&class_scores);
                    let (class_id, class_prob) = probs
                        .iter()
                        .copied()
                        .enumerate()
                        .max_by(|(_, a), (_, b)| a.total_cmp(b))
                        .ok_or_else(|| anyhow!("model has no classes"))?;

                    let confidence = objectness * class_prob;
                    if confidence < NOISE_FLOOR {
                        continue;
                    }

                    let center_x = (cx as f32 + sigmoid(tx)) * cell;
                    let center_y = (cy as f32 + sigmoid(ty)) * cell;
                    let box_w = anchor_w * tw.exp() * cell;
                    let box_h = anchor_h * th.exp() * cell;

                    detections.push(Detection::new(
                        self.layout.labels[class_id].clone(),
                        confidence,
                        BoundingBox::new(
                            center_x - box_w / 2.0,
                            center_y - box_h / 2.0,
                            box_w,
                            box_h,
                        ),
                    ));
                }
            }
        }

        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_size(&self) -> (u32, u32) {
        (self.layout.input_pixels(), self.layout.input_pixels())
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_grid(outputs)
    }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum.max(f32::MIN_POSITIVE)).collect()
}
