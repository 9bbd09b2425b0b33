//! The control surface the window drives: start/stop the camera, load the
//! gallery, register faces and toggle recognition.

use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::annotate::Annotator;
use crate::camera::CameraBackend;
use crate::capture::{CaptureSession, CaptureSettings, SessionContext};
use crate::config::AppConfig;
use crate::display::DisplaySink;
use crate::engine::FaceEngine;
use crate::error::Result;
use crate::gallery::{Gallery, GalleryHandle, GalleryLoad};
use crate::registration::{self, PendingFace, Registration};

pub struct Controller {
    engine: Arc<dyn FaceEngine>,
    session: CaptureSession,
    gallery_dir: PathBuf,
    status: String,
}

impl Controller {
    pub fn new(
        config: &AppConfig,
        backend: Arc<dyn CameraBackend>,
        engine: Arc<dyn FaceEngine>,
        sink: Arc<dyn DisplaySink>,
    ) -> Self {
        let annotator = Annotator::with_font(config.storage.label_font.as_deref());
        Self::with_annotator(config, backend, engine, sink, annotator)
    }

    pub fn with_annotator(
        config: &AppConfig,
        backend: Arc<dyn CameraBackend>,
        engine: Arc<dyn FaceEngine>,
        sink: Arc<dyn DisplaySink>,
        annotator: Annotator,
    ) -> Self {
        let ctx = Arc::new(SessionContext::new(
            GalleryHandle::default(),
            config.recognition.enabled,
        ));
        let session = CaptureSession::new(
            ctx,
            backend,
            engine.clone(),
            sink,
            annotator,
            CaptureSettings::from(config),
        );

        Self {
            engine,
            session,
            gallery_dir: config.storage.gallery_dir.clone(),
            status: "Ready".to_string(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        self.session.context()
    }

    pub fn gallery_dir(&self) -> &Path {
        &self.gallery_dir
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn known_faces(&self) -> Vec<String> {
        self.context().gallery().snapshot().names()
    }

    pub fn start_camera(&mut self) -> Result<()> {
        self.session.start()?;
        self.status = "Camera started".to_string();
        Ok(())
    }

    pub fn stop_camera(&mut self) {
        self.session.stop();
        self.status = "Camera stopped".to_string();
    }

    pub fn recognition_enabled(&self) -> bool {
        self.context().recognition_enabled()
    }

    pub fn set_recognition(&mut self, enabled: bool) {
        self.context().set_recognition(enabled);
        self.status = if enabled {
            "Face recognition enabled"
        } else {
            "Face recognition disabled"
        }
        .to_string();
    }

    /// Replaces the gallery with the faces found in `dir`; returns how many
    /// were loaded. New registrations are saved into `dir` from then on.
    pub fn load_gallery(&mut self, dir: &Path) -> Result<usize> {
        let load = Gallery::load(dir, self.engine.as_ref())?;
        Ok(self.apply_gallery(dir, load))
    }

    /// Installs a gallery loaded from `dir` elsewhere (e.g. off the UI
    /// thread) and makes `dir` the registration target.
    pub fn apply_gallery(&mut self, dir: &Path, load: GalleryLoad) -> usize {
        let loaded = load.loaded;
        self.context().gallery().replace(load.gallery);
        self.gallery_dir = dir.to_path_buf();
        self.status = format!("Loaded {} known faces", loaded);
        loaded
    }

    pub fn engine(&self) -> Arc<dyn FaceEngine> {
        self.engine.clone()
    }

    pub fn prepare_registration(&self) -> Result<PendingFace> {
        registration::prepare(self.context(), self.engine.as_ref(), &self.gallery_dir)
    }

    pub fn finish_registration(&mut self, pending: PendingFace, label: &str) -> Result<Registration> {
        let outcome = pending.save(label, self.engine.as_ref(), self.context().gallery())?;
        self.record_registration(&outcome);
        Ok(outcome)
    }

    pub fn capture_new_face<F>(&mut self, prompt: F) -> Result<Registration>
    where
        F: FnOnce() -> Option<String>,
    {
        let outcome = registration::capture_new_face(
            self.session.context(),
            self.engine.as_ref(),
            &self.gallery_dir,
            prompt,
        )?;
        self.record_registration(&outcome);
        Ok(outcome)
    }

    /// Updates the status for a registration saved off the UI thread.
    pub fn record_registration(&mut self, outcome: &Registration) {
        if let Registration::Saved { name, known_faces, .. } = outcome {
            info!("Registered '{}', {} known faces", name, known_faces);
            self.status = format!("Saved face for '{}'", name);
        }
    }
}
