use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::sequence_metadata::SequenceMetadata;
use crate::video::domain::frame_reader::FrameReader;

/// Reads a directory of still images as a frame sequence.
///
/// Files with a known image extension are taken in lexicographic order,
/// so zero-padded names (`frame_0001.png`, ...) play back correctly. A
/// single image path is treated as a one-frame sequence. Frames are
/// decoded lazily and converted to RGB.
pub struct ImageSequenceReader {
    paths: Vec<PathBuf>,
    metadata: Option<SequenceMetadata>,
}

impl ImageSequenceReader {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            metadata: None,
        }
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_image_file(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_frame(
    path: &Path,
    index: usize,
    expected: (u32, u32),
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    if img.dimensions() != expected {
        return Err(format!(
            "{}: frame is {}x{}, sequence is {}x{}",
            path.display(),
            img.width(),
            img.height(),
            expected.0,
            expected.1
        )
        .into());
    }
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index))
}

impl FrameReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<SequenceMetadata, Box<dyn std::error::Error>> {
        let paths = if path.is_dir() {
            list_images(path)?
        } else if is_image_file(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(format!("Not an image or directory: {}", path.display()).into());
        };
        let first = paths
            .first()
            .ok_or_else(|| format!("No image files found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        let metadata = SequenceMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: paths.len(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = paths;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(meta) = self.metadata.as_ref() else {
            return Box::new(std::iter::once(Err(
                "ImageSequenceReader: not opened".into()
            )));
        };
        let expected = (meta.width, meta.height);
        Box::new(
            self.paths
                .iter()
                .enumerate()
                .map(move |(i, p)| load_frame(p, i, expected)),
        )
    }

    fn close(&mut self) {
        self.paths.clear();
        self.metadata = None;
    }
}
