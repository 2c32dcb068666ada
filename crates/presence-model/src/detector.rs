//! UltraFace (version-RFB-320) face detector via ONNX Runtime.
//!
//! The model emits per-anchor class scores `[1, N, 2]` and corner boxes
//! `[1, N, 4]` normalized to the input plane; post-processing is a
//! confidence filter plus IoU-based non-maximum suppression.

use crate::tensor::{image_to_nchw, ort_err};
use image::imageops::FilterType;
use image::RgbImage;
use ort::session::Session;
use ort::value::TensorRef;
use presence_core::{AnalyzerError, FaceRegion};
use std::path::Path;

pub const MODEL_FILE: &str = "version-RFB-320.onnx";

const INPUT_WIDTH: u32 = 320;
const INPUT_HEIGHT: u32 = 240;
const INPUT_MEAN: f32 = 127.0;
const INPUT_STD: f32 = 128.0;
const CONFIDENCE_THRESHOLD: f32 = 0.7;
const NMS_IOU_THRESHOLD: f32 = 0.3;

/// One scored detection, corner coordinates in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// UltraFace-based face detector.
pub struct FaceDetector {
    session: Session,
    scores_idx: usize,
    boxes_idx: usize,
}

impl FaceDetector {
    /// Load the UltraFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, AnalyzerError> {
        if !model_path.exists() {
            return Err(AnalyzerError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(ort_err)?;

        let names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        // UltraFace exports name these "scores" and "boxes"; fall back to
        // positional order for re-exported models.
        let scores_idx = names.iter().position(|n| n == "scores").unwrap_or(0);
        let boxes_idx = names.iter().position(|n| n == "boxes").unwrap_or(1);

        tracing::info!(
            path = %model_path.display(),
            outputs = ?names,
            "loaded UltraFace model"
        );

        Ok(Self {
            session,
            scores_idx,
            boxes_idx,
        })
    }

    /// Detect faces, most confident first.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, AnalyzerError> {
        let resized = image::imageops::resize(image, INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle);
        let input = image_to_nchw(&resized, INPUT_MEAN, INPUT_STD);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view()).map_err(ort_err)?])
            .map_err(ort_err)?;

        let (_, scores) = outputs[self.scores_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[self.boxes_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("boxes: {e}")))?;

        let (width, height) = image.dimensions();
        let candidates = decode_candidates(scores, boxes, CONFIDENCE_THRESHOLD, width, height);
        let kept = nms(candidates, NMS_IOU_THRESHOLD);

        Ok(kept
            .into_iter()
            .map(|c| to_region(&c, width, height))
            .collect())
    }
}

/// Filter anchors by face-class score and scale boxes to source pixels.
fn decode_candidates(
    scores: &[f32],
    boxes: &[f32],
    threshold: f32,
    width: u32,
    height: u32,
) -> Vec<Candidate> {
    let n = scores.len() / 2;
    let mut out = Vec::new();

    for i in 0..n {
        // Per anchor: [background_score, face_score].
        let score = scores[i * 2 + 1];
        if score <= threshold {
            continue;
        }
        let off = i * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        out.push(Candidate {
            score,
            x1: boxes[off] * width as f32,
            y1: boxes[off + 1] * height as f32,
            x2: boxes[off + 2] * width as f32,
            y2: boxes[off + 3] * height as f32,
        });
    }

    out
}

/// Non-maximum suppression: keep the best-scoring box of each overlap group.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for c in candidates {
        if kept.iter().all(|k| iou(k, &c) <= iou_threshold) {
            kept.push(c);
        }
    }
    kept
}

/// Intersection-over-union of two corner-form boxes.
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Clamp a candidate into image bounds and round to pixel coordinates.
fn to_region(c: &Candidate, width: u32, height: u32) -> FaceRegion {
    let clamp_w = |v: f32| v.round().clamp(0.0, width as f32) as u32;
    let clamp_h = |v: f32| v.round().clamp(0.0, height as f32) as u32;
    FaceRegion {
        top: clamp_h(c.y1),
        right: clamp_w(c.x2),
        bottom: clamp_h(c.y2),
        left: clamp_w(c.x1),
    }
}
