//! Known faces, loaded from a flat directory of labeled images.
//!
//! Each image file contributes one entry named after its file stem. The
//! gallery is never edited in place: every load builds a new one and the
//! [`GalleryHandle`] swaps it in whole.

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::engine::{FaceEncoding, FaceEngine};
use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub name: String,
    pub encoding: FaceEncoding,
}

#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

#[derive(Debug)]
pub struct GalleryLoad {
    pub gallery: Gallery,
    pub loaded: usize,
    pub skipped: usize,
}

impl Gallery {
    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Builds a gallery from every image in `dir` that holds exactly one face.
    ///
    /// Files that cannot be decoded or that show zero or several faces are
    /// logged and skipped. Only an unreadable directory fails the load.
    pub fn load(dir: &Path, engine: &dyn FaceEngine) -> Result<GalleryLoad> {
        let read_dir = fs::read_dir(dir).map_err(|source| Error::GalleryDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_gallery_image(path))
            .collect();
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        let mut skipped = 0;

        for path in &paths {
            match load_entry(path, engine) {
                Ok(entry) => {
                    debug!("Loaded {:?} as '{}'", path, entry.name);
                    entries.push(entry);
                }
                Err(e) => {
                    warn!("Error loading {:?}: {}", path, e);
                    skipped += 1;
                }
            }
        }

        info!("Loaded {} known faces from {:?} ({} skipped)", entries.len(), dir, skipped);

        Ok(GalleryLoad {
            loaded: entries.len(),
            skipped,
            gallery: Gallery::new(entries),
        })
    }
}

pub fn is_gallery_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn load_entry(path: &Path, engine: &dyn FaceEngine) -> Result<GalleryEntry> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidLabel(path.display().to_string()))?;

    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgb8();
    let faces = engine.face_locations(&image)?;
    if faces.len() != 1 {
        return Err(Error::FaceCount { found: faces.len() });
    }

    let encoding = engine
        .face_encodings(&image, &faces)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Engine("no encoding produced".to_string()))?;

    Ok(GalleryEntry { name, encoding })
}

/// Shared reference to the current gallery.
///
/// Readers take a snapshot of the whole gallery; a reload replaces it.
#[derive(Debug, Clone, Default)]
pub struct GalleryHandle {
    current: Arc<RwLock<Arc<Gallery>>>,
}

impl GalleryHandle {
    pub fn snapshot(&self) -> Arc<Gallery> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, gallery: Gallery) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(gallery);
    }
}
