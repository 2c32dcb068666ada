//! Single-subject enrollment guard.
//!
//! The match engine assumes one descriptor per identity; this guard is
//! where that invariant is enforced, before anything touches the registry.

use crate::types::FaceRegion;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollError {
    #[error("no face detected in the image")]
    NoFaceDetected,
    #[error("{count} faces detected; enrollment requires exactly one subject")]
    MultipleFacesDetected { count: usize },
    #[error("could not encode the detected face")]
    EncodingFailed,
}

/// Accept the detection result only if it contains exactly one face.
pub fn require_single_face(regions: &[FaceRegion]) -> Result<&FaceRegion, EnrollError> {
    match regions {
        [] => Err(EnrollError::NoFaceDetected),
        [only] => Ok(only),
        many => Err(EnrollError::MultipleFacesDetected { count: many.len() }),
    }
}
