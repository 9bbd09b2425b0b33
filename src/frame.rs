//! Camera frames and face rectangles.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// A captured camera frame.
///
/// Pixels are kept in BGR order, the order the camera backend produces them.
/// Detection and display both want RGB, see [`Frame::to_rgb`].
#[derive(Debug, Clone)]
pub struct Frame {
    bgr: RgbImage,
}

impl Frame {
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|bgr| Self { bgr })
    }

    pub fn from_rgb(rgb: &RgbImage) -> Self {
        Self { bgr: swap_red_blue(rgb) }
    }

    pub fn width(&self) -> u32 {
        self.bgr.width()
    }

    pub fn height(&self) -> u32 {
        self.bgr.height()
    }

    pub fn bgr_bytes(&self) -> &[u8] {
        self.bgr.as_raw()
    }

    /// Color is given as (b, g, r).
    pub fn bgr_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.bgr.get_pixel(x, y).0
    }

    pub(crate) fn canvas_mut(&mut self) -> &mut RgbImage {
        &mut self.bgr
    }

    pub fn to_rgb(&self) -> RgbImage {
        swap_red_blue(&self.bgr)
    }

    /// Bilinear resize by `factor` in both dimensions.
    pub fn downscale(&self, factor: f64) -> Frame {
        let width = ((self.width() as f64 * factor).round() as u32).max(1);
        let height = ((self.height() as f64 * factor).round() as u32).max(1);
        Frame {
            bgr: imageops::resize(&self.bgr, width, height, FilterType::Triangle),
        }
    }
}

fn swap_red_blue(src: &RgbImage) -> RgbImage {
    let mut out = src.clone();
    for Rgb(px) in out.pixels_mut() {
        px.swap(0, 2);
    }
    out
}

/// Face rectangle in pixel coordinates, ordered like the recognition library
/// reports it: top, right, bottom, left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceBox {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self { top, right, bottom, left }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Maps a box found on a resized image back onto the original one.
    pub fn scale(&self, factor: f64) -> FaceBox {
        let s = |v: i32| (v as f64 * factor).round() as i32;
        FaceBox {
            top: s(self.top),
            right: s(self.right),
            bottom: s(self.bottom),
            left: s(self.left),
        }
    }

    /// Intersect with a `width` x `height` image; `None` if nothing is left.
    pub fn clamp(&self, width: u32, height: u32) -> Option<FaceBox> {
        let clamped = FaceBox {
            top: self.top.clamp(0, height as i32),
            right: self.right.clamp(0, width as i32),
            bottom: self.bottom.clamp(0, height as i32),
            left: self.left.clamp(0, width as i32),
        };
        (clamped.width() > 0 && clamped.height() > 0).then_some(clamped)
    }

    pub fn crop(&self, image: &RgbImage) -> Option<RgbImage> {
        let b = self.clamp(image.width(), image.height())?;
        let view = imageops::crop_imm(
            image,
            b.left as u32,
            b.top as u32,
            b.width() as u32,
            b.height() as u32,
        );
        Some(view.to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_conversion_swaps_channels() {
        let frame = Frame::from_bgr(1, 1, vec![10, 20, 30]).unwrap();
        assert_eq!(frame.to_rgb().get_pixel(0, 0).0, [30, 20, 10]);

        let back = Frame::from_rgb(&frame.to_rgb());
        assert_eq!(back.bgr_pixel(0, 0), [10, 20, 30]);
    }

    #[test]
    fn from_bgr_rejects_short_buffers() {
        assert!(Frame::from_bgr(4, 4, vec![0; 10]).is_none());
    }

    #[test]
    fn downscale_halves_dimensions() {
        let frame = Frame::from_bgr(640, 480, vec![7; 640 * 480 * 3]).unwrap();
        let small = frame.downscale(0.5);
        assert_eq!((small.width(), small.height()), (320, 240));
        assert_eq!(small.bgr_pixel(100, 100), [7, 7, 7]);
    }

    #[test]
    fn scaled_box_maps_back_to_full_resolution() {
        let found = FaceBox::new(10, 60, 50, 20);
        assert_eq!(found.scale(2.0), FaceBox::new(20, 120, 100, 40));
    }

    #[test]
    fn clamp_trims_to_image_bounds() {
        let b = FaceBox::new(-5, 30, 25, 10);
        assert_eq!(b.clamp(20, 20), Some(FaceBox::new(0, 20, 20, 10)));
        assert_eq!(FaceBox::new(30, 40, 40, 30).clamp(20, 20), None);
    }

    #[test]
    fn crop_takes_the_box_region() {
        let mut image = RgbImage::new(8, 8);
        image.put_pixel(3, 2, Rgb([255, 0, 0]));
        let crop = FaceBox::new(2, 6, 5, 3).crop(&image).unwrap();
        assert_eq!(crop.dimensions(), (3, 3));
        assert_eq!(crop.get_pixel(0, 0).0, [255, 0, 0]);
    }
}
