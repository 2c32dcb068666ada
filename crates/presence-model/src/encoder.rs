//! MobileFaceNet face encoder via ONNX Runtime.
//!
//! Crops a detected face region, resizes it to the 112×112 model input,
//! and extracts a 128-dimensional L2-normalized descriptor.

use crate::tensor::{image_to_nchw, ort_err};
use image::imageops::FilterType;
use image::RgbImage;
use ort::session::Session;
use ort::value::TensorRef;
use presence_core::{AnalyzerError, Descriptor, FaceRegion};
use std::path::Path;

pub const MODEL_FILE: &str = "mobilefacenet.onnx";

const INPUT_SIZE: u32 = 112;
const INPUT_MEAN: f32 = 127.5;
const INPUT_STD: f32 = 128.0;
const DESCRIPTOR_DIM: usize = 128;

/// MobileFaceNet-based descriptor extractor.
pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    /// Load the MobileFaceNet ONNX model from the given path.
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

        tracing::info!(path = %model_path.display(), "loaded MobileFaceNet model");

        Ok(Self { session })
    }

    /// Extract a descriptor for one detected face.
    pub fn encode(
        &mut self,
        image: &RgbImage,
        region: &FaceRegion,
    ) -> Result<Descriptor, AnalyzerError> {
        let crop = crop_face(image, region)?;
        let input = image_to_nchw(&crop, INPUT_MEAN, INPUT_STD);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view()).map_err(ort_err)?])
            .map_err(ort_err)?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzerError::InferenceFailed(format!("descriptor extraction: {e}")))?;

        if raw.len() != DESCRIPTOR_DIM {
            return Err(AnalyzerError::InferenceFailed(format!(
                "expected {DESCRIPTOR_DIM}-dim descriptor, got {}",
                raw.len()
            )));
        }

        Ok(Descriptor::new(l2_normalize(raw)))
    }
}

/// Crop the face region and resize it to the model input plane.
fn crop_face(image: &RgbImage, region: &FaceRegion) -> Result<RgbImage, AnalyzerError> {
    let (width, height) = image.dimensions();
    let in_bounds = region.left < region.right
        && region.top < region.bottom
        && region.right <= width
        && region.bottom <= height;
    if !in_bounds {
        return Err(AnalyzerError::out_of_bounds(region));
    }

    let crop = image::imageops::crop_imm(
        image,
        region.left,
        region.top,
        region.width(),
        region.height(),
    )
    .to_image();
    Ok(image::imageops::resize(
        &crop,
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::Triangle,
    ))
}

/// Scale a vector to unit length. A zero vector is returned unchanged.
fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
