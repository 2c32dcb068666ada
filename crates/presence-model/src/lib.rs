//! presence-model — the shipped face analyzer.
//!
//! UltraFace (version-RFB-320) locates faces; MobileFaceNet turns one face
//! crop into a 128-dimensional descriptor. Both run on CPU via ONNX
//! Runtime. Any other model pair can stand in behind the
//! [`presence_core::FaceAnalyzer`] seam.

pub mod detector;
pub mod encoder;
mod tensor;

use detector::FaceDetector;
use encoder::FaceEncoder;
use image::RgbImage;
use presence_core::{AnalyzerError, Descriptor, FaceAnalyzer, FaceRegion};
use std::path::Path;

/// Default analyzer: UltraFace detection plus MobileFaceNet embedding.
pub struct OnnxAnalyzer {
    detector: FaceDetector,
    encoder: FaceEncoder,
}

impl OnnxAnalyzer {
    /// Load both models from `model_dir`. Fails fast when either file is
    /// missing or refuses to load.
    pub fn load(model_dir: &Path) -> Result<Self, AnalyzerError> {
        let detector = FaceDetector::load(&model_dir.join(detector::MODEL_FILE))?;
        let encoder = FaceEncoder::load(&model_dir.join(encoder::MODEL_FILE))?;
        Ok(Self { detector, encoder })
    }
}

impl FaceAnalyzer for OnnxAnalyzer {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, AnalyzerError> {
        self.detector.detect(image)
    }

    fn embed(
        &mut self,
        image: &RgbImage,
        region: &FaceRegion,
    ) -> Result<Descriptor, AnalyzerError> {
        self.encoder.encode(image, region)
    }
}
