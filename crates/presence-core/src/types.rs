use serde::{Deserialize, Serialize};

/// Fixed-dimension face descriptor produced by an embedding model.
///
/// Descriptors from different model families are not comparable with each
/// other; the dimension is fixed by whichever model produced them (128 for
/// the default MobileFaceNet encoder). Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to another descriptor. Lower = more alike.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Cosine similarity to another descriptor, in [-1, 1]. Higher = more
    /// alike. Always walks every dimension; a zero vector compares as 0.0.
    pub fn cosine_similarity(&self, other: &Descriptor) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// Pixel bounding box for a detected face.
///
/// Field order matches the wire format the service reports: top, right,
/// bottom, left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceRegion {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Descriptor::new(vec![1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = Descriptor::new(vec![1.0, 0.0, 0.0]);
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = Descriptor::new(vec![1.0, 0.0]);
        let b = Descriptor::new(vec![0.0, 1.0]);
        assert!(a.cosine_similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![1.0, 0.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_region_dimensions() {
        let r = FaceRegion {
            top: 10,
            right: 110,
            bottom: 130,
            left: 30,
        };
        assert_eq!(r.width(), 80);
        assert_eq!(r.height(), 120);
    }

    #[test]
    fn test_descriptor_serde_roundtrip() {
        let a = Descriptor::new(vec![0.25, -0.5, 1.0]);
        let json = serde_json::to_string(&a).unwrap();
        let back: Descriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
