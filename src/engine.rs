//! Boundary to the face detection and encoding models.

use image::RgbImage;

use crate::error::Result;
use crate::frame::FaceBox;

/// Identity signature of one face (128 values for the dlib ResNet model).
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEncoding(Vec<f64>);

impl FaceEncoding {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance. Vectors of different length never match.
    pub fn distance(&self, other: &FaceEncoding) -> f64 {
        if self.0.len() != other.0.len() {
            return f64::INFINITY;
        }
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f64>> for FaceEncoding {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Face detection and encoding capability.
///
/// Images are RGB. Implementations must be usable from the capture thread and
/// the UI thread at the same time.
pub trait FaceEngine: Send + Sync {
    fn face_locations(&self, image: &RgbImage) -> Result<Vec<FaceBox>>;

    /// One encoding per box, in the same order.
    fn face_encodings(&self, image: &RgbImage, faces: &[FaceBox]) -> Result<Vec<FaceEncoding>>;
}
