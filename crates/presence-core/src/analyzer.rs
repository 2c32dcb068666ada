//! The opaque face-model seam.

use crate::types::{Descriptor, FaceRegion};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face region ({0}, {1}, {2}, {3}) lies outside the image")]
    RegionOutOfBounds(u32, u32, u32, u32),
}

impl AnalyzerError {
    pub fn out_of_bounds(region: &FaceRegion) -> Self {
        AnalyzerError::RegionOutOfBounds(region.top, region.right, region.bottom, region.left)
    }
}

/// Face model abstraction: locate faces, then turn one face into a
/// descriptor.
///
/// Implementations own their inference state and generally need `&mut` for
/// a forward pass, so the daemon drives an analyzer from a dedicated thread
/// rather than sharing it across tasks.
pub trait FaceAnalyzer: Send {
    /// Detect faces in the image, most confident first.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, AnalyzerError>;

    /// Extract a descriptor for one detected face.
    fn embed(&mut self, image: &RgbImage, region: &FaceRegion)
        -> Result<Descriptor, AnalyzerError>;
}
