use crate::error::Result;
use crate::frame::Frame;

/// An open camera. Dropping it releases the device.
pub trait Camera: Send {
    /// Errors here are transient; the caller simply tries again.
    fn read_frame(&mut self) -> Result<Frame>;
}

pub trait CameraBackend: Send + Sync {
    fn open(&self, device: i32) -> Result<Box<dyn Camera>>;
}

#[cfg(feature = "opencv")]
pub use self::opencv_backend::{OpenCvBackend, OpenCvCamera};

#[cfg(feature = "opencv")]
mod opencv_backend {
    use log::{info, warn};
    use opencv::prelude::*;
    use opencv::videoio::{VideoCapture, CAP_ANY};

    use super::{Camera, CameraBackend};
    use crate::error::{Error, Result};
    use crate::frame::Frame;

    #[derive(Debug, Default, Clone, Copy)]
    pub struct OpenCvBackend;

    impl CameraBackend for OpenCvBackend {
        fn open(&self, device: i32) -> Result<Box<dyn Camera>> {
            Ok(Box::new(OpenCvCamera::new(device)?))
        }
    }

    pub struct OpenCvCamera {
        cap: VideoCapture,
        device: i32,
    }

    impl OpenCvCamera {
        pub fn new(device: i32) -> Result<Self> {
            let cap = VideoCapture::new(device, CAP_ANY).map_err(|e| {
                warn!("Failed to open camera {}: {}", device, e);
                Error::CameraUnavailable { device }
            })?;

            if !cap.is_opened().unwrap_or(false) {
                return Err(Error::CameraUnavailable { device });
            }

            info!("Opened camera {}", device);
            Ok(Self { cap, device })
        }
    }

    impl Camera for OpenCvCamera {
        fn read_frame(&mut self) -> Result<Frame> {
            let mut mat = opencv::core::Mat::default();
            let grabbed = self
                .cap
                .read(&mut mat)
                .map_err(|e| Error::Camera(format!("Failed to read frame: {}", e)))?;

            if !grabbed || mat.empty() {
                return Err(Error::Camera("Empty frame".to_string()));
            }
            if mat.channels() != 3 {
                return Err(Error::Camera(format!("Unsupported channel count {}", mat.channels())));
            }

            let width = mat.cols() as u32;
            let height = mat.rows() as u32;
            let data = if mat.is_continuous() {
                mat.data_bytes()
                    .map_err(|e| Error::Camera(format!("Failed to get frame data: {}", e)))?
                    .to_vec()
            } else {
                mat.try_clone()
                    .and_then(|m| m.data_bytes().map(|b| b.to_vec()))
                    .map_err(|e| Error::Camera(format!("Failed to get frame data: {}", e)))?
            };

            Frame::from_bgr(width, height, data)
                .ok_or_else(|| Error::Camera("Frame size mismatch".to_string()))
        }
    }

    impl Drop for OpenCvCamera {
        fn drop(&mut self) {
            let _ = self.cap.release();
            info!("Released camera {}", self.device);
        }
    }
}
