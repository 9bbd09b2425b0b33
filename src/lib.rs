//! Live face recognition against a directory of known faces.
//!
//! A [`Controller`] owns a [`capture::CaptureSession`] whose background
//! thread reads camera frames, matches faces against the [`Gallery`] and
//! publishes annotated frames through a single-slot display channel.
//! Camera and recognition models sit behind the [`CameraBackend`] and
//! [`FaceEngine`] traits; OpenCV and dlib implementations are available
//! behind the `opencv` and `dlib` features.

pub mod annotate;
pub mod camera;
pub mod capture;
pub mod config;
pub mod controller;
pub mod display;
pub mod engine;
pub mod error;
#[cfg(feature = "dlib")]
pub mod face;
pub mod frame;
pub mod gallery;
pub mod matcher;
#[cfg(feature = "dlib")]
pub mod models;
pub mod registration;

#[cfg(test)]
mod test_support;

pub use camera::{Camera, CameraBackend};
pub use config::AppConfig;
pub use controller::Controller;
pub use display::{latest_frame_channel, DisplayReceiver, DisplaySink, DisplayUpdate};
pub use engine::{FaceEncoding, FaceEngine};
pub use error::{Error, Result};
pub use frame::{FaceBox, Frame};
pub use gallery::{Gallery, GalleryEntry};
pub use matcher::{match_face, FaceMatch};
pub use registration::Registration;
