//! Drives a `Controller` end to end with an in-memory camera and engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use facereco::annotate::Annotator;
use facereco::{
    AppConfig, Camera, CameraBackend, Controller, DisplaySink, Error, FaceBox, FaceEncoding,
    FaceEngine, Frame, Registration, Result,
};
use image::{Rgb, RgbImage};

/// One face in the middle of any image whose top-left red value is in
/// 32..96; green becomes the encoding.
struct OneFaceEngine;

impl FaceEngine for OneFaceEngine {
    fn face_locations(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        if !(32..96).contains(&image.get_pixel(0, 0).0[0]) {
            return Ok(Vec::new());
        }
        let (w, h) = (image.width() as i32, image.height() as i32);
        Ok(vec![FaceBox::new(h / 4, w * 3 / 4, h * 3 / 4, w / 4)])
    }

    fn face_encodings(&self, image: &RgbImage, faces: &[FaceBox]) -> Result<Vec<FaceEncoding>> {
        let green = image.get_pixel(0, 0).0[1] as f64 / 255.0;
        Ok(faces.iter().map(|_| FaceEncoding::new(vec![green])).collect())
    }
}

struct StillCamera {
    frame: Frame,
    released: Arc<AtomicBool>,
}

impl Camera for StillCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        Ok(self.frame.clone())
    }
}

impl Drop for StillCamera {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

struct StillBackend {
    frame: Frame,
    released: Arc<AtomicBool>,
}

impl CameraBackend for StillBackend {
    fn open(&self, device: i32) -> Result<Box<dyn Camera>> {
        if device != 0 {
            return Err(Error::CameraUnavailable { device });
        }
        self.released.store(false, Ordering::SeqCst);
        Ok(Box::new(StillCamera {
            frame: self.frame.clone(),
            released: self.released.clone(),
        }))
    }
}

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<Frame>>,
    cleared: AtomicUsize,
}

impl RecordingSink {
    fn shown_count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    fn last_shown(&self) -> Option<Frame> {
        self.shown.lock().unwrap().last().cloned()
    }

    fn wait_for_frames(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.shown_count() < count {
            assert!(Instant::now() < deadline, "timed out waiting for {} frames", count);
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl DisplaySink for RecordingSink {
    fn show(&self, frame: &Frame) {
        self.shown.lock().unwrap().push(frame.clone());
    }

    fn clear(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

struct TempDir(PathBuf);

impl TempDir {
    fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!("facereco-it-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

// Frames are 64x48 with one face; detection on the half-size copy puts the
// box at left 16, top 12 in full resolution.
const BOX_EDGE: (u32, u32) = (16, 20);
const GREEN: [u8; 3] = [0, 255, 0];

fn scene(seed: u8) -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([64, seed, 0]))
}

struct Rig {
    controller: Controller,
    sink: Arc<RecordingSink>,
    released: Arc<AtomicBool>,
    dir: TempDir,
}

fn rig(tag: &str) -> Rig {
    let dir = TempDir::new(tag);
    scene(40).save(dir.path().join("alice.png")).unwrap();

    let mut config = AppConfig::default();
    config.camera.frame_interval_ms = 2;
    config.storage.gallery_dir = dir.path().to_path_buf();

    let sink = Arc::new(RecordingSink::default());
    let released = Arc::new(AtomicBool::new(false));
    let backend = StillBackend {
        frame: Frame::from_rgb(&scene(40)),
        released: released.clone(),
    };
    let controller = Controller::with_annotator(
        &config,
        Arc::new(backend),
        Arc::new(OneFaceEngine),
        sink.clone(),
        Annotator::boxes_only(),
    );

    Rig { controller, sink, released, dir }
}

#[test]
fn recognition_toggle_registration_and_stop() {
    let Rig { mut controller, sink, released, dir } = rig("pipeline");

    assert_eq!(controller.load_gallery(dir.path()).unwrap(), 1);
    assert_eq!(controller.known_faces(), vec!["alice".to_string()]);

    controller.start_camera().unwrap();
    assert!(controller.is_running());
    assert_eq!(controller.status(), "Camera started");

    sink.wait_for_frames(2);
    let annotated = sink.last_shown().unwrap();
    assert_eq!(annotated.bgr_pixel(BOX_EDGE.0, BOX_EDGE.1), GREEN);

    controller.set_recognition(false);
    let seen = sink.shown_count();
    sink.wait_for_frames(seen + 3);
    let plain = sink.last_shown().unwrap();
    assert_eq!(plain.bgr_pixel(BOX_EDGE.0, BOX_EDGE.1), [0, 40, 64]);

    let pending = controller.prepare_registration().unwrap();
    assert_eq!(pending.face().dimensions(), (32, 24));
    match controller.finish_registration(pending, "  bob ").unwrap() {
        Registration::Saved { name, path, known_faces } => {
            assert_eq!(name, "bob");
            assert_eq!(path, dir.path().join("bob.jpg"));
            assert_eq!(known_faces, 2);
        }
        Registration::Cancelled => panic!("registration was cancelled"),
    }
    assert_eq!(controller.known_faces(), vec!["alice".to_string(), "bob".to_string()]);
    assert_eq!(controller.status(), "Saved face for 'bob'");

    controller.stop_camera();
    assert!(!controller.is_running());
    assert!(released.load(Ordering::SeqCst));
    assert!(sink.cleared.load(Ordering::SeqCst) >= 1);

    let after_stop = sink.shown_count();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(sink.shown_count(), after_stop);
}

#[test]
fn camera_can_be_restarted_after_stop() {
    let Rig { mut controller, sink, released, .. } = rig("restart");

    controller.start_camera().unwrap();
    sink.wait_for_frames(1);
    assert!(matches!(controller.start_camera(), Err(Error::AlreadyRunning)));
    controller.stop_camera();
    assert!(released.load(Ordering::SeqCst));

    let seen = sink.shown_count();
    controller.start_camera().unwrap();
    assert!(!released.load(Ordering::SeqCst));
    sink.wait_for_frames(seen + 1);
    controller.stop_camera();
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn empty_gallery_shows_raw_frames() {
    let Rig { mut controller, sink, .. } = rig("empty");

    controller.start_camera().unwrap();
    sink.wait_for_frames(2);
    let frame = sink.last_shown().unwrap();
    assert_eq!(frame.bgr_pixel(BOX_EDGE.0, BOX_EDGE.1), [0, 40, 64]);
    controller.stop_camera();
}
