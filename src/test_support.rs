//! Fakes shared by the unit tests.
//!
//! `FakeEngine` reads the scene out of the top-left pixel: the red channel
//! says how many faces there are, green and blue become the encoding. The
//! values are bucketed so they survive JPEG round trips.

use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::camera::{Camera, CameraBackend};
use crate::engine::{FaceEncoding, FaceEngine};
use crate::error::{Error, Result};
use crate::frame::{FaceBox, Frame};

pub const NO_FACE: u8 = 0;
pub const ONE_FACE: u8 = 64;
pub const TWO_FACES: u8 = 128;
pub const ENGINE_FAILS: u8 = 255;

pub struct FakeEngine;

impl FakeEngine {
    fn face_count(image: &RgbImage) -> Result<usize> {
        match image.get_pixel(0, 0).0[0] {
            0..=31 => Ok(0),
            32..=95 => Ok(1),
            96..=159 => Ok(2),
            160..=223 => Ok(3),
            _ => Err(Error::Engine("model exploded".into())),
        }
    }
}

impl FaceEngine for FakeEngine {
    fn face_locations(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        let count = Self::face_count(image)?;
        let (w, h) = (image.width() as i32, image.height() as i32);
        Ok((0..count as i32)
            .map(|i| {
                let column = w / count as i32;
                let left = i * column + column / 4;
                FaceBox::new(h / 4, left + column / 2, h * 3 / 4, left)
            })
            .collect())
    }

    fn face_encodings(&self, image: &RgbImage, faces: &[FaceBox]) -> Result<Vec<FaceEncoding>> {
        let [_, g, b] = image.get_pixel(0, 0).0;
        Ok(faces
            .iter()
            .map(|_| FaceEncoding::new(vec![g as f64 / 255.0, b as f64 / 255.0]))
            .collect())
    }
}

pub fn scene(width: u32, height: u32, faces: u8, seed: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([faces, seed, 0]))
}

pub fn write_png(path: &Path, faces: u8, seed: u8) {
    scene(40, 40, faces, seed).save(path).unwrap();
}

/// Encoding `FakeEngine` produces for a scene with this seed.
pub fn seed_encoding(seed: u8) -> FaceEncoding {
    FaceEncoding::new(vec![seed as f64 / 255.0, 0.0])
}

pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new(tag: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "facereco-{}-{}-{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Camera that replays a script of frames (`None` = failed read) and then
/// keeps repeating the last frame. Every open starts the script over.
pub struct ScriptedCamera {
    script: VecDeque<Option<Frame>>,
    last: Option<Frame>,
    released: Arc<AtomicBool>,
}

impl Camera for ScriptedCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        if let Some(next) = self.script.pop_front() {
            if let Some(frame) = &next {
                self.last = Some(frame.clone());
            }
            return next.ok_or_else(|| Error::Camera("scripted read failure".into()));
        }
        self.last
            .clone()
            .ok_or_else(|| Error::Camera("nothing scripted".into()))
    }
}

impl Drop for ScriptedCamera {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Vec<Option<Frame>>>>,
    pub released: Arc<AtomicBool>,
    pub unavailable: bool,
}

impl ScriptedBackend {
    pub fn showing(frames: Vec<Option<Frame>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(frames)),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl CameraBackend for ScriptedBackend {
    fn open(&self, device: i32) -> Result<Box<dyn Camera>> {
        if self.unavailable {
            return Err(Error::CameraUnavailable { device });
        }
        self.released.store(false, Ordering::SeqCst);
        Ok(Box::new(ScriptedCamera {
            script: self.script.lock().unwrap().iter().cloned().collect(),
            last: None,
            released: self.released.clone(),
        }))
    }
}

pub fn frame_of(faces: u8, seed: u8) -> Frame {
    Frame::from_rgb(&scene(64, 48, faces, seed))
}
