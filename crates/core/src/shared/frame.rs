use image::GrayImage;
use ndarray::{s, ArrayView1, ArrayView3};

use crate::shared::bounding_box::RoiRect;

/// A single video/image frame: contiguous 8-bit pixels in row-major order.
///
/// One channel (grayscale) and three channels (RGB) are supported. Format
/// conversion happens at I/O boundaries only; the tracker reads frames and
/// never keeps them past a call.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Extracts a region as an 8-bit luma image (BT.601 weights for RGB).
    ///
    /// The rectangle must lie inside the frame; callers clip with
    /// [`RoiRect`] helpers first. Returns `None` for empty regions.
    pub fn gray_region(&self, roi: RoiRect) -> Option<GrayImage> {
        if roi.w == 0
            || roi.h == 0
            || roi.x + roi.w > self.width as usize
            || roi.y + roi.h > self.height as usize
        {
            return None;
        }

        let view = self.as_ndarray();
        let region = view.slice(s![roi.y..roi.y + roi.h, roi.x..roi.x + roi.w, ..]);
        let mut out = Vec::with_capacity(roi.w * roi.h);
        for row in region.outer_iter() {
            for px in row.outer_iter() {
                out.push(luma(&px));
            }
        }
        GrayImage::from_raw(roi.w as u32, roi.h as u32, out)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn luma(px: &ArrayView1<'_, u8>) -> u8 {
    if px.len() < 3 {
        return px[0];
    }
    let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
    ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
}
