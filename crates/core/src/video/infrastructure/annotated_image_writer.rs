use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::{Annotation, ImageWriter};

const HIGH_CONFIDENCE: f64 = 0.7;
const MEDIUM_CONFIDENCE: f64 = 0.4;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);

/// Writes frames with the tracked box outlined, colored by confidence.
pub struct AnnotatedImageWriter {
    thickness: u32,
}

impl AnnotatedImageWriter {
    pub fn new(thickness: u32) -> Self {
        Self {
            thickness: thickness.max(1),
        }
    }
}

impl Default for AnnotatedImageWriter {
    fn default() -> Self {
        Self::new(2)
    }
}

pub fn confidence_color(confidence: f64) -> Rgb<u8> {
    if confidence > HIGH_CONFIDENCE {
        GREEN
    } else if confidence > MEDIUM_CONFIDENCE {
        YELLOW
    } else {
        ORANGE
    }
}

fn to_rgb_image(frame: &Frame) -> Option<RgbImage> {
    match frame.channels() {
        3 => RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec()),
        1 => {
            let data = frame.data().iter().flat_map(|&v| [v, v, v]).collect();
            RgbImage::from_raw(frame.width(), frame.height(), data)
        }
        _ => None,
    }
}

/// Outlines `annotation.bbox` inside the image, clipped to its bounds.
///
/// Thicker outlines are nested one-pixel rectangles growing inward.
fn draw_box(img: &mut RgbImage, annotation: &Annotation, thickness: u32) {
    let Some(roi) = annotation.bbox.to_roi(img.width(), img.height()) else {
        return;
    };
    let color = confidence_color(annotation.confidence);
    let (w, h) = (roi.w as u32, roi.h as u32);
    for inset in 0..thickness.min(w.div_ceil(2)).min(h.div_ceil(2)) {
        let rect = Rect::at((roi.x as u32 + inset) as i32, (roi.y as u32 + inset) as i32)
            .of_size(w - 2 * inset, h - 2 * inset);
        draw_hollow_rect_mut(img, rect, color);
    }
}

impl ImageWriter for AnnotatedImageWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        annotation: Option<&Annotation>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut img = to_rgb_image(frame).ok_or("Failed to create image from frame data")?;
        if let Some(annotation) = annotation {
            draw_box(&mut img, annotation, self.thickness);
        }
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use rstest::rstest;

    fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn annotation(confidence: f64) -> Annotation {
        Annotation {
            bbox: BoundingBox::new(10.0, 10.0, 20.0, 10.0),
            confidence,
        }
    }

    #[rstest]
    #[case::high(0.9, GREEN)]
    #[case::medium(0.5, YELLOW)]
    #[case::low(0.25, ORANGE)]
    #[case::boundary(0.7, YELLOW)]
    fn test_confidence_color(#[case] confidence: f64, #[case] expected: Rgb<u8>) {
        assert_eq!(confidence_color(confidence), expected);
    }

    #[test]
    fn test_write_without_annotation_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        AnnotatedImageWriter::default()
            .write(&path, &gray_frame(40, 30, 77), None)
            .unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (40, 30));
        assert_eq!(img.get_pixel(15, 15).0, [77, 77, 77]);
    }

    #[test]
    fn test_write_draws_outline_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxed.png");
        AnnotatedImageWriter::new(1)
            .write(&path, &gray_frame(40, 30, 77), Some(&annotation(0.9)))
            .unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*img.get_pixel(10, 10), GREEN);
        assert_eq!(*img.get_pixel(29, 19), GREEN);
        assert_eq!(img.get_pixel(20, 15).0, [77, 77, 77]);
        assert_eq!(img.get_pixel(9, 10).0, [77, 77, 77]);
    }

    #[test]
    fn test_thick_outline_grows_inward() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thick.png");
        AnnotatedImageWriter::new(3)
            .write(&path, &gray_frame(40, 30, 77), Some(&annotation(0.5)))
            .unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*img.get_pixel(10, 10), YELLOW);
        assert_eq!(*img.get_pixel(12, 15), YELLOW);
        assert_eq!(*img.get_pixel(27, 17), YELLOW);
        assert_eq!(img.get_pixel(13, 15).0, [77, 77, 77]);
        assert_eq!(img.get_pixel(9, 9).0, [77, 77, 77]);
    }

    #[test]
    fn test_outline_thicker_than_box_fills_it() {
        let mut img = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let small = Annotation {
            bbox: BoundingBox::new(5.0, 5.0, 3.0, 2.0),
            confidence: 0.9,
        };
        draw_box(&mut img, &small, 10);
        for y in 5..7 {
            for x in 5..8 {
                assert_eq!(*img.get_pixel(x, y), GREEN);
            }
        }
        assert_eq!(img.get_pixel(8, 5).0, [0, 0, 0]);
    }

    #[test]
    fn test_write_grayscale_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        let frame = Frame::new(vec![50u8; 40 * 30], 40, 30, 1, 0);
        AnnotatedImageWriter::default()
            .write(&path, &frame, Some(&annotation(0.1)))
            .unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [50, 50, 50]);
        assert_eq!(*img.get_pixel(11, 11), ORANGE);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/frame.png");
        AnnotatedImageWriter::default()
            .write(&path, &gray_frame(8, 8, 0), None)
            .unwrap();
        assert!(path.exists());
    }
}
