use log::debug;

use crate::engine::FaceEncoding;
use crate::gallery::Gallery;

/// Distance under which two encodings are the same person (dlib default).
pub const DEFAULT_TOLERANCE: f64 = 0.6;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub name: String,
    pub matched: bool,
    pub distance: Option<f64>,
}

impl FaceMatch {
    fn unknown(distance: Option<f64>) -> Self {
        Self {
            name: UNKNOWN.to_string(),
            matched: false,
            distance,
        }
    }
}

pub fn face_distances(gallery: &Gallery, probe: &FaceEncoding) -> Vec<f64> {
    gallery
        .entries()
        .iter()
        .map(|entry| entry.encoding.distance(probe))
        .collect()
}

pub fn compare_faces(gallery: &Gallery, probe: &FaceEncoding, tolerance: f64) -> Vec<bool> {
    face_distances(gallery, probe)
        .into_iter()
        .map(|d| d <= tolerance)
        .collect()
}

/// Names the gallery entry closest to `probe`.
///
/// The threshold check runs over every entry first; only when something
/// passes is the nearest entry over the whole gallery picked, and it is only
/// reported if it passed the check itself. Entries whose distance is NaN
/// never pass and are never picked.
pub fn match_face(probe: &FaceEncoding, gallery: &Gallery, tolerance: f64) -> FaceMatch {
    let matches = compare_faces(gallery, probe, tolerance);
    if !matches.contains(&true) {
        return FaceMatch::unknown(None);
    }

    let distances = face_distances(gallery, probe);
    let best = distances
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.is_nan())
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index);

    match best {
        Some(index) if matches[index] => {
            let name = gallery.entries()[index].name.clone();
            debug!("Matched '{}' at distance {:.4}", name, distances[index]);
            FaceMatch {
                name,
                matched: true,
                distance: Some(distances[index]),
            }
        }
        Some(index) => FaceMatch::unknown(Some(distances[index])),
        None => FaceMatch::unknown(None),
    }
}
