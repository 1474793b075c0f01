use std::path::Path;

use anyhow::{Context, Result};

use crate::error::SimulationError;

/// RGBA8 picture advected as the auxiliary image field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DyeImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DyeImage {
    /// Wraps tightly packed RGBA8 rows, top row first.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SimulationError> {
        let expected = width as usize * height as usize;
        if width == 0 || height == 0 || pixels.len() != expected * 4 {
            return Err(SimulationError::SizeMismatch {
                label: "dye image".into(),
                expected,
                actual: pixels.len() / 4,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_image(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: rgba.into_raw(),
        }
    }

    /// Decodes a PNG or JPEG from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to load dye image {}", path.display()))?;
        Ok(Self::from_image(&image))
    }

    /// Two-colour checkerboard used when the host supplies no picture.
    pub fn checkerboard(width: u32, height: u32, tiles: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let tile_w = (width / tiles.max(1)).max(1);
        let tile_h = (height / tiles.max(1)).max(1);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for row in 0..height {
            for col in 0..width {
                let light = ((col / tile_w) + (row / tile_h)) % 2 == 0;
                let rgba = if light {
                    [235, 200, 120, 255]
                } else {
                    [40, 70, 140, 255]
                };
                pixels.extend_from_slice(&rgba);
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_pixel_buffer() {
        let err = DyeImage::from_rgba8(2, 2, vec![0; 12]).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::SizeMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn from_image_keeps_top_row_first() {
        let mut buffer = image::RgbaImage::new(1, 2);
        buffer.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        buffer.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let dye = DyeImage::from_image(&image::DynamicImage::ImageRgba8(buffer));
        assert_eq!(&dye.pixels()[..4], &[255, 0, 0, 255]);
        assert_eq!(&dye.pixels()[4..], &[0, 0, 255, 255]);
    }

    #[test]
    fn checkerboard_alternates_tiles() {
        let dye = DyeImage::checkerboard(4, 4, 2);
        assert_eq!(dye.pixels().len(), 64);
        let first = &dye.pixels()[..4];
        let second_tile = &dye.pixels()[8..12];
        assert_ne!(first, second_tile);
        let below_first = &dye.pixels()[(2 * 4) * 4..(2 * 4) * 4 + 4];
        assert_eq!(second_tile, below_first);
    }
}
