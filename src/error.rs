use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to open camera {device}")]
    CameraUnavailable { device: i32 },

    #[error("camera error: {0}")]
    Camera(String),

    #[error("face engine error: {0}")]
    Engine(String),

    #[error("No frame available")]
    NoFrame,

    #[error("Make sure exactly one face is visible (found {found})")]
    FaceCount { found: usize },

    #[error("Invalid name {0:?}")]
    InvalidLabel(String),

    #[error("Camera is already running")]
    AlreadyRunning,

    #[error("Previous capture is still shutting down")]
    CaptureBusy,

    #[error("Cannot read gallery directory {path:?}: {source}")]
    GalleryDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("model error: {0}")]
    Models(String),
}

impl Error {
    /// Errors the user should see as a warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::FaceCount { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
