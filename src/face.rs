//! dlib-backed [`FaceEngine`]: HOG detector, 68-point landmarks and the
//! ResNet face encoder.

use dlib_face_recognition::{
    FaceDetector, FaceDetectorTrait,
    FaceEncoderNetwork, FaceEncoderTrait,
    ImageMatrix, LandmarkPredictor, LandmarkPredictorTrait, Rectangle,
};
use image::RgbImage;
use log::{debug, info};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::engine::{FaceEncoding, FaceEngine};
use crate::error::{Error, Result};
use crate::frame::FaceBox;
use crate::models;

const NUM_JITTERS: u32 = 0;

struct FaceProcessor {
    detector: FaceDetector,
    predictor: LandmarkPredictor,
    encoder: FaceEncoderNetwork,
}

impl FaceProcessor {
    fn open(models_dir: &Path) -> Result<Self> {
        info!("Initializing face processor with models from {:?}", models_dir);

        let shape_predictor_path = models_dir.join(models::SHAPE_PREDICTOR.name);
        let predictor = LandmarkPredictor::open(&shape_predictor_path)
            .map_err(|e| Error::Models(format!("shape predictor {:?}: {}", shape_predictor_path, e)))?;

        let face_rec_path = models_dir.join(models::FACE_RECOGNITION.name);
        let encoder = FaceEncoderNetwork::open(&face_rec_path)
            .map_err(|e| Error::Models(format!("face encoder {:?}: {}", face_rec_path, e)))?;

        Ok(Self {
            detector: FaceDetector::new(),
            predictor,
            encoder,
        })
    }
}

/// Thread-safe wrapper; dlib calls are serialised through a mutex.
pub struct DlibEngine {
    inner: Mutex<FaceProcessor>,
}

impl std::fmt::Debug for DlibEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DlibEngine").finish_non_exhaustive()
    }
}

impl DlibEngine {
    /// Opens the models in `models_dir`, or in the default location
    /// (downloading them first if they are missing).
    pub fn new(models_dir: Option<&Path>) -> Result<Self> {
        let dir = match models_dir {
            Some(dir) => dir.to_path_buf(),
            None => {
                let dir = models::get_models_dir();
                if !models::models_exist_in(&dir) {
                    models::download_models(None)?;
                }
                dir
            }
        };

        Ok(Self {
            inner: Mutex::new(FaceProcessor::open(&dir)?),
        })
    }

    fn processor(&self) -> std::sync::MutexGuard<'_, FaceProcessor> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_matrix(image: &RgbImage) -> ImageMatrix {
    // ImageMatrix copies the pixels; `image` is contiguous packed RGB.
    unsafe {
        ImageMatrix::new(
            image.width() as usize,
            image.height() as usize,
            image.as_raw().as_ptr(),
        )
    }
}

impl FaceEngine for DlibEngine {
    fn face_locations(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        let matrix = to_matrix(image);
        let processor = self.processor();
        let faces: Vec<FaceBox> = processor
            .detector
            .face_locations(&matrix)
            .iter()
            .map(|rect| FaceBox::new(rect.top as i32, rect.right as i32, rect.bottom as i32, rect.left as i32))
            .collect();

        debug!("Detected {} face(s)", faces.len());
        Ok(faces)
    }

    fn face_encodings(&self, image: &RgbImage, faces: &[FaceBox]) -> Result<Vec<FaceEncoding>> {
        if faces.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = to_matrix(image);
        let processor = self.processor();
        let landmarks: Vec<_> = faces
            .iter()
            .map(|face| {
                let rect = Rectangle {
                    left: face.left as i64,
                    top: face.top as i64,
                    right: face.right as i64,
                    bottom: face.bottom as i64,
                };
                processor.predictor.face_landmarks(&matrix, &rect)
            })
            .collect();

        let encodings = processor.encoder.get_face_encodings(&matrix, &landmarks, NUM_JITTERS);
        if encodings.len() != faces.len() {
            return Err(Error::Engine(format!(
                "expected {} encodings, got {}",
                faces.len(),
                encodings.len()
            )));
        }

        Ok(encodings
            .iter()
            .map(|encoding| FaceEncoding::new(encoding.as_ref().to_vec()))
            .collect())
    }
}
