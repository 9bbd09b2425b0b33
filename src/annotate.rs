//! Draws detection boxes and names onto frames.

use ab_glyph::{FontArc, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::frame::{FaceBox, Frame};

// Green and white look the same in BGR and RGB order.
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 24.0;
const LABEL_OFFSET: i32 = 10;

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

#[derive(Clone, Default)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    /// Boxes only, no names.
    pub fn boxes_only() -> Self {
        Self { font: None }
    }

    /// Uses `font_path` if given, otherwise the first system font found.
    pub fn with_font(font_path: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match font_path {
            Some(path) => vec![path.to_path_buf()],
            None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
        };

        for path in &candidates {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    info!("Using label font {:?}", path);
                    return Self { font: Some(font) };
                }
                Err(e) => warn!("Invalid font {:?}: {}", path, e),
            }
        }

        warn!("No label font available, faces will be boxed without names");
        Self::boxes_only()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw(&self, frame: &mut Frame, face: &FaceBox, label: &str) {
        let Some(face) = face.clamp(frame.width(), frame.height()) else {
            return;
        };
        let canvas = frame.canvas_mut();

        for inset in 0..BOX_THICKNESS {
            let width = face.width() - 2 * inset;
            let height = face.height() - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at(face.left + inset, face.top + inset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let y = (face.top - LABEL_OFFSET - LABEL_SCALE as i32).max(0);
            draw_text_mut(canvas, TEXT_COLOR, face.left, y, PxScale::from(LABEL_SCALE), font, label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::frame_of;

    #[test]
    fn draws_a_two_pixel_green_border() {
        let mut frame = frame_of(0, 0);
        Annotator::boxes_only().draw(&mut frame, &FaceBox::new(10, 30, 30, 10), "alice");

        assert_eq!(frame.bgr_pixel(10, 10), [0, 255, 0]);
        assert_eq!(frame.bgr_pixel(11, 11), [0, 255, 0]);
        assert_eq!(frame.bgr_pixel(29, 20), [0, 255, 0]);
        assert_eq!(frame.bgr_pixel(20, 20), [0, 0, 0]);
        assert_eq!(frame.bgr_pixel(12, 12), [0, 0, 0]);
    }

    #[test]
    fn boxes_outside_the_frame_are_ignored() {
        let mut frame = frame_of(0, 0);
        let before = frame.bgr_bytes().to_vec();
        Annotator::boxes_only().draw(&mut frame, &FaceBox::new(500, 700, 600, 650), "ghost");
        assert_eq!(frame.bgr_bytes(), &before[..]);
    }

    #[test]
    fn missing_font_falls_back_to_boxes() {
        let annotator = Annotator::with_font(Some(Path::new("/definitely/not/a/font.ttf")));
        assert!(!annotator.has_font());
    }
}
