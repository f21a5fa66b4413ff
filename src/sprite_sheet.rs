//! Sprite sheet slicing.
//!
//! A sheet is a single row of square frames. Each frame is cropped and
//! scaled with nearest-neighbour filtering so pixel art stays crisp.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{} is {width}x{height}, too small for {frames} frames of {frame_size}px", path.display())]
    TooSmall {
        path: PathBuf,
        width: u32,
        height: u32,
        frames: u32,
        frame_size: u32,
    },
    #[error("a sprite sheet needs at least one frame")]
    Empty,
}

/// How to cut a sheet into frames
#[derive(Debug, Clone, Copy)]
pub struct SheetLayout {
    pub frame_count: u32,
    /// Edge length of a frame in the source image
    pub frame_size: u32,
    /// Edge length of a frame after scaling
    pub display_size: u32,
}

/// Ordered, non-empty sequence of equally sized frames
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    name: String,
    frames: Vec<RgbaImage>,
}

impl SpriteSheet {
    /// Load a sheet from disk and slice it according to `layout`
    pub fn load(path: &Path, layout: SheetLayout) -> Result<Self, SpriteError> {
        let img = image::open(path)
            .map_err(|source| SpriteError::Load {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();

        let (width, height) = img.dimensions();
        if layout.frame_count == 0 {
            return Err(SpriteError::Empty);
        }
        let needed = layout.frame_count.checked_mul(layout.frame_size);
        if needed.map_or(true, |needed| width < needed) || height < layout.frame_size {
            return Err(SpriteError::TooSmall {
                path: path.to_path_buf(),
                width,
                height,
                frames: layout.frame_count,
                frame_size: layout.frame_size,
            });
        }

        let frames = slice_frames(&img, layout);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!(sheet = %name, frames = frames.len(), "loaded sprite sheet");
        Ok(Self { name, frames })
    }

    /// Build a sheet from frames already in memory
    #[cfg(test)]
    pub fn from_frames(name: impl Into<String>, frames: Vec<RgbaImage>) -> Result<Self, SpriteError> {
        if frames.is_empty() {
            return Err(SpriteError::Empty);
        }
        Ok(Self {
            name: name.into(),
            frames,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[cfg(test)]
    fn frame_dimensions(&self) -> (u32, u32) {
        self.frames[0].dimensions()
    }
}

/// Crop `frame_count` tiles from the first row, left to right, and scale each
fn slice_frames(sheet: &RgbaImage, layout: SheetLayout) -> Vec<RgbaImage> {
    (0..layout.frame_count)
        .map(|col| {
            let tile = imageops::crop_imm(
                sheet,
                col * layout.frame_size,
                0,
                layout.frame_size,
                layout.frame_size,
            )
            .to_image();
            imageops::resize(
                &tile,
                layout.display_size,
                layout.display_size,
                FilterType::Nearest,
            )
        })
        .collect()
}
