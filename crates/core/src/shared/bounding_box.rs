use serde::{Deserialize, Serialize};

/// Axis-aligned target rectangle in frame pixels: top-left corner plus size.
///
/// Coordinates are real-valued; integer pixel access goes through
/// [`BoundingBox::to_roi`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Integer pixel rectangle within a frame, used for cropping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Builds a box from its center point and size.
    pub fn from_center(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Finite coordinates and strictly positive size.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite())
            && self.w > 0.0
            && self.h > 0.0
    }

    /// True when every edge lies inside a `frame_w` x `frame_h` frame.
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.w <= frame_w as f64
            && self.y + self.h <= frame_h as f64
    }

    /// Shrinks the box to the frame if needed, then slides it inside.
    ///
    /// Size is preserved whenever it fits, so boxes near an edge move rather
    /// than collapse.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Self {
        let (fw, fh) = (frame_w as f64, frame_h as f64);
        let w = self.w.min(fw);
        let h = self.h.min(fh);
        Self {
            x: self.x.clamp(0.0, fw - w),
            y: self.y.clamp(0.0, fh - h),
            w,
            h,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Integer pixel rectangle covering this box, clipped to the frame.
    ///
    /// Position is floored and size rounded. Returns `None` when nothing of
    /// the box remains inside the frame.
    pub fn to_roi(&self, frame_w: u32, frame_h: u32) -> Option<RoiRect> {
        if !self.is_valid() {
            return None;
        }
        let x1 = self.x.floor().max(0.0);
        let y1 = self.y.floor().max(0.0);
        let x2 = (self.x.floor() + self.w.round()).min(frame_w as f64);
        let y2 = (self.y.floor() + self.h.round()).min(frame_h as f64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(RoiRect {
            x: x1 as usize,
            y: y1 as usize,
            w: (x2 - x1) as usize,
            h: (y2 - y1) as usize,
        })
    }
}
