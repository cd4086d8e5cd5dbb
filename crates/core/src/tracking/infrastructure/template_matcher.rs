use image::imageops::{self, FilterType};
use image::GrayImage;

use super::integral_image::IntegralImage;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::errors::TrackingFailure;
use crate::tracking::domain::track_state::BoundedHistory;
use crate::tracking::domain::tracker_config::TrackerConfig;

/// Lower bound on search padding around the last box.
pub const MIN_SEARCH_MARGIN_PX: f64 = 20.0;

/// Confidences averaged before allowing a template update.
const UPDATE_HISTORY_WINDOW: usize = 3;
/// Blend factor per unit of match score.
const SCORE_LEARNING_FACTOR: f64 = 0.15;
/// Per-pixel variance below which a window or template counts as flat.
const FLAT_VARIANCE: f64 = 1e-3;
/// Templates with a side above this are first matched at half resolution.
const COARSE_TEMPLATE_PX: u32 = 32;
/// Placements re-scored per axis around a peak from the coarser level.
const PYRAMID_REFINE_RADIUS: usize = 2;

/// Best match of the stored template in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateMatch {
    pub bbox: BoundingBox,
    pub score: f64,
    pub scale: f64,
}

/// Fallback tracker: zero-mean normalized cross-correlation of a stored
/// grayscale template over a bounded search region, at several scales.
///
/// Correlation runs at template resolution: for each scale the search region
/// is downscaled by `template_size / box_size`, so the cost is bounded by the
/// template size rather than the box size. Large templates are matched
/// coarse-to-fine, and a reduced-resolution peak is finally re-scored at
/// frame resolution in a small window. The template adapts slowly (EMA) on
/// confident matches only.
pub struct TemplateMatcher {
    template: Option<GrayImage>,
    template_size: (u32, u32),
    confidence_threshold: f64,
    search_margin: f64,
    scales: Vec<f64>,
    update_threshold: f64,
    history_threshold: f64,
    learning_rate: f64,
}

impl TemplateMatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            template: None,
            template_size: config.template_size,
            confidence_threshold: config.confidence_threshold,
            search_margin: config.search_margin,
            scales: config.scales.clone(),
            update_threshold: config.template_update_threshold,
            history_threshold: config.template_history_threshold,
            learning_rate: config.template_learning_rate,
        }
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    pub fn template(&self) -> Option<&GrayImage> {
        self.template.as_ref()
    }

    pub fn clear(&mut self) {
        self.template = None;
    }

    /// Replaces the template with the region under `bbox`.
    ///
    /// Returns false (and leaves no template) when the region is empty.
    pub fn extract(&mut self, frame: &Frame, bbox: &BoundingBox) -> bool {
        let (tw, th) = self.template_size;
        self.template = bbox
            .to_roi(frame.width(), frame.height())
            .and_then(|roi| frame.gray_region(roi))
            .map(|patch| imageops::resize(&patch, tw, th, FilterType::Triangle));
        self.template.is_some()
    }

    /// Searches around `current_box` for the template.
    pub fn locate(
        &self,
        frame: &Frame,
        current_box: &BoundingBox,
    ) -> Result<TemplateMatch, TrackingFailure> {
        let template = self.template.as_ref().ok_or(TrackingFailure::NoTemplate)?;
        let (fw, fh) = (frame.width(), frame.height());

        let margin =
            (self.search_margin * current_box.w.max(current_box.h)).max(MIN_SEARCH_MARGIN_PX);
        let (cx, cy) = current_box.center();
        let search_box = BoundingBox::from_center(
            cx,
            cy,
            current_box.w + 2.0 * margin,
            current_box.h + 2.0 * margin,
        );
        let roi = search_box
            .to_roi(fw, fh)
            .ok_or(TrackingFailure::SearchRegionTooSmall)?;
        let base_w = current_box.w.round().max(1.0) as usize;
        let base_h = current_box.h.round().max(1.0) as usize;
        if roi.w < base_w || roi.h < base_h {
            return Err(TrackingFailure::SearchRegionTooSmall);
        }
        let search = frame
            .gray_region(roi)
            .ok_or(TrackingFailure::SearchRegionTooSmall)?;

        let mut best: Option<ScalePeak> = None;
        for &scale in &self.scales {
            let bw = (current_box.w * scale).round() as u32;
            let bh = (current_box.h * scale).round() as u32;
            if bw < 2 || bh < 2 || bw as usize > roi.w || bh as usize > roi.h {
                continue;
            }
            let Some(peak) = match_at_scale(&search, template, (bw, bh), scale) else {
                continue;
            };
            log::debug!(
                "Template scale {scale:.2}: score {:.3} at ({:.1}, {:.1})",
                peak.score,
                peak.x,
                peak.y
            );
            if best.map_or(true, |b| peak.score > b.score) {
                best = Some(peak);
            }
        }

        let best = match best {
            Some(peak) if peak.score > self.confidence_threshold => peak,
            other => return Err(TrackingFailure::LowScore(other.map_or(0.0, |p| p.score))),
        };
        let (x, y) =
            refine_at_full_resolution(&search, template, &best).unwrap_or((best.x, best.y));
        let bbox = BoundingBox::new(
            roi.x as f64 + x,
            roi.y as f64 + y,
            current_box.w * best.scale,
            current_box.h * best.scale,
        )
        .clamp_to(fw, fh);
        Ok(TemplateMatch {
            bbox,
            score: best.score,
            scale: best.scale,
        })
    }

    /// Blends the matched region into the template when both the match and
    /// recent history are confident. Returns whether the template changed.
    ///
    /// `confidence_history` must not yet include the current frame.
    pub fn maybe_update(
        &mut self,
        frame: &Frame,
        matched: &TemplateMatch,
        confidence_history: &BoundedHistory<f64>,
    ) -> bool {
        if matched.score <= self.update_threshold || confidence_history.is_empty() {
            return false;
        }
        let n = confidence_history.len().min(UPDATE_HISTORY_WINDOW);
        let recent_mean = confidence_history.recent(UPDATE_HISTORY_WINDOW).sum::<f64>() / n as f64;
        if recent_mean <= self.history_threshold {
            return false;
        }
        let Some(template) = self.template.as_mut() else {
            return false;
        };
        let Some(patch) = matched
            .bbox
            .to_roi(frame.width(), frame.height())
            .and_then(|roi| frame.gray_region(roi))
        else {
            return false;
        };

        let patch = imageops::resize(
            &patch,
            template.width(),
            template.height(),
            FilterType::Triangle,
        );
        let alpha = self.learning_rate.min(matched.score * SCORE_LEARNING_FACTOR);
        for (t, p) in template.pixels_mut().zip(patch.pixels()) {
            let blended = (1.0 - alpha) * t.0[0] as f64 + alpha * p.0[0] as f64;
            t.0[0] = blended.round().clamp(0.0, 255.0) as u8;
        }
        true
    }
}

/// Best placement of one scale, in search-region pixels.
#[derive(Clone, Copy, Debug)]
struct ScalePeak {
    score: f64,
    x: f64,
    y: f64,
    scale: f64,
    /// Box size in frame pixels at this scale.
    size: (u32, u32),
    /// Matching resolution relative to the frame, per axis (<= 1).
    ratio: (f64, f64),
}

/// Inclusive range of top-left placements scored in one correlation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Placements {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Placements {
    /// Every placement of a `tw` x `th` template inside a `sw` x `sh` image.
    fn all(sw: usize, sh: usize, tw: usize, th: usize) -> Option<Self> {
        (tw > 0 && th > 0 && tw <= sw && th <= sh).then(|| Self {
            x0: 0,
            y0: 0,
            x1: sw - tw,
            y1: sh - th,
        })
    }

    /// Placements within `radius` of `(cx, cy)`, kept inside `self`.
    fn around(&self, cx: usize, cy: usize, radius: usize) -> Self {
        let cx = cx.clamp(self.x0, self.x1);
        let cy = cy.clamp(self.y0, self.y1);
        Self {
            x0: cx.saturating_sub(radius).max(self.x0),
            y0: cy.saturating_sub(radius).max(self.y0),
            x1: (cx + radius).min(self.x1),
            y1: (cy + radius).min(self.y1),
        }
    }
}

/// Matches the template for a `bw` x `bh` box at template resolution.
///
/// Boxes smaller than the template are matched at box resolution instead,
/// so neither image is ever upsampled here.
fn match_at_scale(
    search: &GrayImage,
    template: &GrayImage,
    (bw, bh): (u32, u32),
    scale: f64,
) -> Option<ScalePeak> {
    let mw = template.width().min(bw);
    let mh = template.height().min(bh);
    let ratio = (mw as f64 / bw as f64, mh as f64 / bh as f64);

    let resized_template;
    let template = if template.dimensions() == (mw, mh) {
        template
    } else {
        resized_template = imageops::resize(template, mw, mh, FilterType::Triangle);
        &resized_template
    };
    let resized_search;
    let search = if (mw, mh) == (bw, bh) {
        search
    } else {
        let sw = ((search.width() as f64 * ratio.0).round() as u32).max(1);
        let sh = ((search.height() as f64 * ratio.1).round() as u32).max(1);
        resized_search = imageops::resize(search, sw, sh, FilterType::Triangle);
        &resized_search
    };

    let (score, mx, my) = pyramid_match(search, template)?;
    Some(ScalePeak {
        score,
        x: mx as f64 / ratio.0,
        y: my as f64 / ratio.1,
        scale,
        size: (bw, bh),
        ratio,
    })
}

/// Best placement of `template` in `search`, coarse-to-fine.
///
/// Templates larger than [`COARSE_TEMPLATE_PX`] are first located at half
/// resolution; this level then only scores placements near that peak.
fn pyramid_match(search: &GrayImage, template: &GrayImage) -> Option<(f64, usize, usize)> {
    let (sw, sh) = (search.width() as usize, search.height() as usize);
    let (tw, th) = (template.width() as usize, template.height() as usize);
    let all = Placements::all(sw, sh, tw, th)?;

    let placements = if template.width().max(template.height()) > COARSE_TEMPLATE_PX {
        match pyramid_match(&half_size(search), &half_size(template)) {
            Some((_, cx, cy)) => all.around(cx * 2, cy * 2, PYRAMID_REFINE_RADIUS),
            None => all,
        }
    } else {
        all
    };
    let integral = IntegralImage::new(search.as_raw(), sw, sh);
    best_correlation(search.as_raw(), &integral, template.as_raw(), tw, th, placements)
}

fn half_size(img: &GrayImage) -> GrayImage {
    imageops::resize(
        img,
        (img.width() / 2).max(1),
        (img.height() / 2).max(1),
        FilterType::Triangle,
    )
}

/// Re-scores frame-resolution placements within one matched pixel of a
/// peak found at reduced resolution. `None` when the peak was already
/// found at frame resolution.
fn refine_at_full_resolution(
    search: &GrayImage,
    template: &GrayImage,
    peak: &ScalePeak,
) -> Option<(f64, f64)> {
    if peak.ratio == (1.0, 1.0) {
        return None;
    }
    let (bw, bh) = peak.size;
    let all = Placements::all(
        search.width() as usize,
        search.height() as usize,
        bw as usize,
        bh as usize,
    )?;
    let radius = (1.0 / peak.ratio.0.min(peak.ratio.1)).ceil() as usize;
    let window = all.around(peak.x.round() as usize, peak.y.round() as usize, radius);
    let upscaled = imageops::resize(template, bw, bh, FilterType::Triangle);
    let integral = IntegralImage::new(
        search.as_raw(),
        search.width() as usize,
        search.height() as usize,
    );
    let (_, x, y) = best_correlation(
        search.as_raw(),
        &integral,
        upscaled.as_raw(),
        bw as usize,
        bh as usize,
        window,
    )?;
    Some((x as f64, y as f64))
}

/// Highest `TM_CCOEFF_NORMED` score of a `tw` x `th` template over the
/// given placements inside the search image, with its top-left offset.
///
/// Flat windows score 0. Returns `None` for a flat template.
fn best_correlation(
    search: &[u8],
    integral: &IntegralImage,
    template: &[u8],
    tw: usize,
    th: usize,
    placements: Placements,
) -> Option<(f64, usize, usize)> {
    let sw = integral.width();
    let n = (tw * th) as f64;
    let mean = template.iter().map(|&v| v as f64).sum::<f64>() / n;
    let centered: Vec<f64> = template.iter().map(|&v| v as f64 - mean).collect();
    let t_energy: f64 = centered.iter().map(|v| v * v).sum();
    if t_energy < FLAT_VARIANCE * n {
        return None;
    }
    let t_norm = t_energy.sqrt();

    let mut best = (f64::NEG_INFINITY, placements.x0, placements.y0);
    for y in placements.y0..=placements.y1 {
        for x in placements.x0..=placements.x1 {
            let (sum, sum_sq) = integral.window(x, y, tw, th);
            let variance = sum_sq - sum * sum / n;
            let score = if variance < FLAT_VARIANCE * n {
                0.0
            } else {
                // Template is zero-mean, so the window mean drops out.
                let mut corr = 0.0;
                for j in 0..th {
                    let row = &search[(y + j) * sw + x..(y + j) * sw + x + tw];
                    let t_row = &centered[j * tw..(j + 1) * tw];
                    corr += row
                        .iter()
                        .zip(t_row)
                        .map(|(&p, &t)| p as f64 * t)
                        .sum::<f64>();
                }
                (corr / (t_norm * variance.sqrt())).clamp(-1.0, 1.0)
            };
            if score > best.0 {
                best = (score, x, y);
            }
        }
    }
    Some(best)
}
