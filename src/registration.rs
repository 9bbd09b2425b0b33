//! Registering a new identity from the current camera frame.
//!
//! Split in two so a UI can show an asynchronous name dialog in between:
//! [`prepare`] checks the frame and crops the face, [`PendingFace::save`]
//! writes `<label>.jpg` and reloads the gallery from disk.

use image::{ImageFormat, RgbImage};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::SessionContext;
use crate::engine::FaceEngine;
use crate::error::{Error, Result};
use crate::gallery::{Gallery, GalleryHandle};

const SAVE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Saved { name: String, path: PathBuf, known_faces: usize },
    Cancelled,
}

/// A cropped face waiting for its name.
#[derive(Debug, Clone)]
pub struct PendingFace {
    face: RgbImage,
    gallery_dir: PathBuf,
}

/// Crops the single face visible in the current frame.
pub fn prepare(ctx: &SessionContext, engine: &dyn FaceEngine, gallery_dir: &Path) -> Result<PendingFace> {
    let frame = ctx.current_frame().ok_or(Error::NoFrame)?;
    let rgb = frame.to_rgb();

    let faces = engine.face_locations(&rgb)?;
    let [face] = faces.as_slice() else {
        return Err(Error::FaceCount { found: faces.len() });
    };

    let crop = face
        .crop(&rgb)
        .ok_or_else(|| Error::Engine(format!("face box {:?} lies outside the frame", face)))?;

    Ok(PendingFace {
        face: crop,
        gallery_dir: gallery_dir.to_path_buf(),
    })
}

impl PendingFace {
    pub fn face(&self) -> &RgbImage {
        &self.face
    }

    /// Saves under `label` and replaces the gallery with a fresh load.
    ///
    /// A blank label cancels without touching the disk. An existing file
    /// with the same name is overwritten.
    pub fn save(self, label: &str, engine: &dyn FaceEngine, gallery: &GalleryHandle) -> Result<Registration> {
        let Some(name) = validate_label(label)? else {
            return Ok(Registration::Cancelled);
        };

        fs::create_dir_all(&self.gallery_dir)?;
        let path = self.gallery_dir.join(format!("{}.{}", name, SAVE_EXTENSION));
        self.face.save_with_format(&path, ImageFormat::Jpeg)?;
        info!("Saved face for '{}' to {:?}", name, path);

        let load = Gallery::load(&self.gallery_dir, engine)?;
        let known_faces = load.loaded;
        gallery.replace(load.gallery);

        Ok(Registration::Saved { name, path, known_faces })
    }
}

/// Checks the frame, asks `prompt` for a name, saves and reloads.
pub fn capture_new_face<F>(
    ctx: &SessionContext,
    engine: &dyn FaceEngine,
    gallery_dir: &Path,
    prompt: F,
) -> Result<Registration>
where
    F: FnOnce() -> Option<String>,
{
    let pending = prepare(ctx, engine, gallery_dir)?;
    match prompt() {
        Some(label) => pending.save(&label, engine, ctx.gallery()),
        None => Ok(Registration::Cancelled),
    }
}

/// `Ok(None)` for a blank label; an error for anything that is not a plain
/// file name.
pub fn validate_label(label: &str) -> Result<Option<String>> {
    let name = label.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let bad_char = |c: char| matches!(c, '/' | '\\' | '\0') || c.is_control();
    if name.starts_with('.') || name.contains("..") || name.chars().any(bad_char) {
        return Err(Error::InvalidLabel(name.to_string()));
    }
    Ok(Some(name.to_string()))
}
