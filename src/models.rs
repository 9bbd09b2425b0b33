//! Locating and downloading the dlib model files.

use bzip2::read::BzDecoder;
use log::info;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct ModelInfo {
    pub name: &'static str,
    pub url: &'static str,
    pub size_mb: u32,
}

pub const SHAPE_PREDICTOR: ModelInfo = ModelInfo {
    name: "shape_predictor_68_face_landmarks.dat",
    url: "http://dlib.net/files/shape_predictor_68_face_landmarks.dat.bz2",
    size_mb: 100,
};

pub const FACE_RECOGNITION: ModelInfo = ModelInfo {
    name: "dlib_face_recognition_resnet_model_v1.dat",
    url: "http://dlib.net/files/dlib_face_recognition_resnet_model_v1.dat.bz2",
    size_mb: 22,
};

pub type ProgressCallback = Box<dyn Fn(f64, &str) + Send>;

/// System install first, then the user data directory (also the download
/// target).
pub fn get_models_dir() -> PathBuf {
    let system_dir = PathBuf::from("/usr/share/facereco/models");
    if models_exist_in(&system_dir) {
        return system_dir;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("facereco").join("models");
    }

    PathBuf::from("./models")
}

pub fn models_exist_in(dir: &Path) -> bool {
    dir.join(SHAPE_PREDICTOR.name).exists() && dir.join(FACE_RECOGNITION.name).exists()
}

pub fn download_models(progress_callback: Option<ProgressCallback>) -> Result<()> {
    let models_dir = get_models_dir();
    info!("Installing face models into {:?}", models_dir);

    fs::create_dir_all(&models_dir)?;

    for (index, model) in [&SHAPE_PREDICTOR, &FACE_RECOGNITION].into_iter().enumerate() {
        if models_dir.join(model.name).exists() {
            continue;
        }
        let base = index as f64 * 0.5;
        let message = format!("Downloading {} ({} MB)...", model.name, model.size_mb);
        download_and_extract_model(model, &models_dir, |p| {
            if let Some(cb) = &progress_callback {
                cb(base + p * 0.5, &message);
            }
        })?;
    }

    if let Some(cb) = &progress_callback {
        cb(1.0, "Face models ready");
    }
    info!("All face models present in {:?}", models_dir);
    Ok(())
}

/// Counts compressed bytes as the decoder pulls them.
struct ProgressReader<R, F> {
    inner: R,
    read: usize,
    total: usize,
    progress: F,
}

impl<R: Read, F: Fn(f64)> Read for ProgressReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n;
        (self.progress)((self.read as f64 / self.total as f64).min(1.0));
        Ok(n)
    }
}

fn download_and_extract_model<F>(model: &ModelInfo, dest_dir: &Path, progress: F) -> Result<()>
where
    F: Fn(f64),
{
    info!("Fetching {} from {}", model.name, model.url);

    let response = ureq::get(model.url)
        .call()
        .map_err(|e| Error::Models(format!("Failed to download {}: {}", model.name, e)))?;

    let total = response
        .header("content-length")
        .and_then(|len| len.parse::<usize>().ok())
        .filter(|&len| len > 0)
        .unwrap_or(model.size_mb as usize * 1024 * 1024);

    let source = ProgressReader {
        inner: response.into_reader(),
        read: 0,
        total,
        progress,
    };

    // Decompress into a side file so an interrupted download never looks
    // like an installed model.
    let partial = dest_dir.join(format!("{}.part", model.name));
    let written = io::copy(&mut BzDecoder::new(source), &mut File::create(&partial)?)
        .map_err(|e| Error::Models(format!("Failed to unpack {}: {}", model.name, e)))?;

    let target = dest_dir.join(model.name);
    fs::rename(&partial, &target)?;
    info!("Installed {} ({} bytes) at {:?}", model.name, written, target);

    Ok(())
}
