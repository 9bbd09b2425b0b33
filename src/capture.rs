//! Background capture loop.
//!
//! `CaptureSession` moves between idle and running. While running, a
//! dedicated thread reads frames, runs recognition when enabled, draws the
//! results and publishes every frame to the display sink. Everything the
//! thread shares with the UI lives in [`SessionContext`].

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::annotate::Annotator;
use crate::camera::{Camera, CameraBackend};
use crate::config::AppConfig;
use crate::display::DisplaySink;
use crate::engine::FaceEngine;
use crate::error::{Error, Result};
use crate::frame::{FaceBox, Frame};
use crate::gallery::{Gallery, GalleryHandle};
use crate::matcher::{match_face, FaceMatch};

const JOIN_POLL: Duration = Duration::from_millis(5);

/// State shared between the UI and the capture thread.
pub struct SessionContext {
    running: AtomicBool,
    recognition: AtomicBool,
    current_frame: Mutex<Option<Frame>>,
    camera: Mutex<Option<Box<dyn Camera>>>,
    gallery: GalleryHandle,
}

impl SessionContext {
    pub fn new(gallery: GalleryHandle, recognition: bool) -> Self {
        Self {
            running: AtomicBool::new(false),
            recognition: AtomicBool::new(recognition),
            current_frame: Mutex::new(None),
            camera: Mutex::new(None),
            gallery,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn recognition_enabled(&self) -> bool {
        self.recognition.load(Ordering::Acquire)
    }

    pub fn set_recognition(&self, enabled: bool) {
        self.recognition.store(enabled, Ordering::Release);
    }

    /// Last raw frame read from the camera, before any drawing.
    pub fn current_frame(&self) -> Option<Frame> {
        self.current_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn gallery(&self) -> &GalleryHandle {
        &self.gallery
    }

    pub fn has_camera(&self) -> bool {
        self.camera
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn store_frame(&self, frame: &Frame) {
        *self.current_frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame.clone());
    }

    /// `None` once the camera has been released.
    fn read_frame(&self) -> Option<Result<Frame>> {
        self.camera
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .map(|camera| camera.read_frame())
    }

    fn release_camera(&self) -> bool {
        let camera = self.camera.lock().unwrap_or_else(PoisonError::into_inner).take();
        camera.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub device: i32,
    pub tolerance: f64,
    pub detection_scale: f64,
    pub frame_interval: Duration,
    pub stop_timeout: Duration,
}

impl From<&AppConfig> for CaptureSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            device: config.camera.device_index,
            tolerance: config.recognition.tolerance,
            detection_scale: config.recognition.detection_scale,
            frame_interval: config.camera.frame_interval(),
            stop_timeout: config.camera.stop_timeout(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// One recognised face, in full-resolution frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub face: FaceBox,
    pub result: FaceMatch,
}

/// Detects faces on a downscaled copy of `frame` and matches them.
pub fn recognize(
    engine: &dyn FaceEngine,
    frame: &Frame,
    gallery: &Gallery,
    settings: &CaptureSettings,
) -> Result<Vec<Detection>> {
    let small = frame.downscale(settings.detection_scale).to_rgb();
    let faces = engine.face_locations(&small)?;
    let encodings = engine.face_encodings(&small, &faces)?;
    let upscale = 1.0 / settings.detection_scale;

    Ok(faces
        .iter()
        .zip(encodings)
        .map(|(face, encoding)| Detection {
            face: face.scale(upscale),
            result: match_face(&encoding, gallery, settings.tolerance),
        })
        .collect())
}

struct CaptureWorker {
    ctx: Arc<SessionContext>,
    active: Arc<AtomicBool>,
    engine: Arc<dyn FaceEngine>,
    sink: Arc<dyn DisplaySink>,
    annotator: Annotator,
    settings: CaptureSettings,
}

impl CaptureWorker {
    fn run(self) {
        info!("Capture loop started");
        while self.is_active() {
            let mut frame = match self.ctx.read_frame() {
                None => break,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    debug!("Skipping frame: {}", e);
                    thread::sleep(self.settings.frame_interval);
                    continue;
                }
            };

            self.ctx.store_frame(&frame);
            self.annotate(&mut frame);

            if !self.is_active() {
                break;
            }
            self.sink.show(&frame);
            thread::sleep(self.settings.frame_interval);
        }
        info!("Capture loop stopped");
    }

    /// Cleared by `stop`; every start hands out a fresh token.
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Best effort: on any recognition error the frame stays as captured.
    fn annotate(&self, frame: &mut Frame) {
        if !self.ctx.recognition_enabled() {
            return;
        }
        let gallery = self.ctx.gallery.snapshot();
        if gallery.is_empty() {
            return;
        }

        match recognize(self.engine.as_ref(), frame, &gallery, &self.settings) {
            Ok(detections) => {
                for detection in &detections {
                    self.annotator.draw(frame, &detection.face, &detection.result.name);
                }
            }
            Err(e) => warn!("Face recognition error: {}", e),
        }
    }
}

pub struct CaptureSession {
    ctx: Arc<SessionContext>,
    backend: Arc<dyn CameraBackend>,
    engine: Arc<dyn FaceEngine>,
    sink: Arc<dyn DisplaySink>,
    annotator: Annotator,
    settings: CaptureSettings,
    worker: Option<Worker>,
    detached: Option<JoinHandle<()>>,
}

struct Worker {
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Polls until `handle` finishes or `timeout` passes.
fn wait_until_finished(handle: &JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(JOIN_POLL);
    }
    handle.is_finished()
}

impl CaptureSession {
    pub fn new(
        ctx: Arc<SessionContext>,
        backend: Arc<dyn CameraBackend>,
        engine: Arc<dyn FaceEngine>,
        sink: Arc<dyn DisplaySink>,
        annotator: Annotator,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            ctx,
            backend,
            engine,
            sink,
            annotator,
            settings,
            worker: None,
            detached: None,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    pub fn start(&mut self) -> Result<()> {
        if self.ctx.is_running() {
            return Err(Error::AlreadyRunning);
        }
        if let Some(handle) = self.detached.take() {
            if !wait_until_finished(&handle, self.settings.stop_timeout) {
                self.detached = Some(handle);
                return Err(Error::CaptureBusy);
            }
            if handle.join().is_err() {
                warn!("Capture thread panicked");
            }
        }

        let camera = self.backend.open(self.settings.device)?;
        *self.ctx.camera.lock().unwrap_or_else(PoisonError::into_inner) = Some(camera);
        self.ctx.running.store(true, Ordering::Release);

        let active = Arc::new(AtomicBool::new(true));
        let worker = CaptureWorker {
            ctx: self.ctx.clone(),
            active: active.clone(),
            engine: self.engine.clone(),
            sink: self.sink.clone(),
            annotator: self.annotator.clone(),
            settings: self.settings,
        };
        let spawned = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { active, handle });
                Ok(())
            }
            Err(e) => {
                self.ctx.running.store(false, Ordering::Release);
                self.ctx.release_camera();
                Err(Error::Io(e))
            }
        }
    }

    /// Stops the loop, waiting at most the configured timeout for the
    /// thread, then releases the camera and clears the display.
    pub fn stop(&mut self) {
        self.ctx.running.store(false, Ordering::Release);

        if let Some(Worker { active, handle }) = self.worker.take() {
            active.store(false, Ordering::Release);
            if wait_until_finished(&handle, self.settings.stop_timeout) {
                if handle.join().is_err() {
                    warn!("Capture thread panicked");
                }
            } else {
                warn!(
                    "Capture thread still busy after {:?}, detaching it",
                    self.settings.stop_timeout
                );
                self.detached = Some(handle);
            }
        }

        if self.ctx.release_camera() {
            info!("Camera stopped");
        }
        self.sink.clear();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.worker.is_some() || self.ctx.has_camera() {
            self.stop();
        }
    }
}
