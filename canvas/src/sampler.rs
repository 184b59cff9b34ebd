//! Color picker sampling and the magnifier patch.
//!
//! The sampler keeps the full-resolution RGBA pixels of one dev image, tagged
//! with that image's id. Sampling is only valid for the image it was loaded
//! for; before the image finishes decoding, or after the user switches to a
//! different dev image, every query returns `None`.

#[cfg(test)]
#[path = "sampler_test.rs"]
mod sampler_test;

use crate::camera::{Point, Size};
use crate::consts::{MAGNIFIER_PATCH_PX, MAX_IMAGE_PIXELS};
use crate::doc::DevImageId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SamplerError {
    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize { width: u32, height: u32, expected: usize, actual: usize },
    #[error("image of {width}x{height} pixels is too large to sample")]
    TooLarge { width: u32, height: u32 },
}

/// One 8-bit RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Uppercase `#RRGGBB`; alpha is dropped.
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Decoded image pixels, row-major RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes as read back from a canvas.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::TooLarge`] past [`MAX_IMAGE_PIXELS`], and
    /// [`SamplerError::BufferSize`] if `data` is not exactly
    /// `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SamplerError> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(SamplerError::BufferSize { width, height, expected, actual: data.len() });
        }
        Ok(Self { width, height, data })
    }

    /// Bytes an RGBA buffer of `width` x `height` occupies.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::TooLarge`] past [`MAX_IMAGE_PIXELS`] or when the
    /// size does not fit in memory on this target.
    pub fn byte_len(width: u32, height: u32) -> Result<usize, SamplerError> {
        let too_large = SamplerError::TooLarge { width, height };
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_IMAGE_PIXELS {
            return Err(too_large);
        }
        usize::try_from(pixels * 4).map_err(|_| too_large)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Read one pixel, or `None` outside the image.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel(&self, x: i64, y: i64) -> Option<Rgba> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some(Rgba::new(px[0], px[1], px[2], px[3]))
    }

    /// Source pixel under a model-space point: `floor(pct / 100 * dim)`,
    /// kept inside the image so that 100% maps to the last pixel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn source_pixel(&self, model: Point) -> (i64, i64) {
        let px = (model.x / 100.0 * f64::from(self.width)).floor() as i64;
        let py = (model.y / 100.0 * f64::from(self.height)).floor() as i64;
        (
            px.clamp(0, i64::from(self.width.saturating_sub(1))),
            py.clamp(0, i64::from(self.height.saturating_sub(1))),
        )
    }
}

/// Square patch of source pixels around the sampled pixel.
///
/// Cells are row-major; cells falling outside the image are `None` and drawn
/// transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct Magnifier {
    pub size: u32,
    pub cells: Vec<Option<Rgba>>,
}

impl Magnifier {
    /// Cell at `(col, row)` of the patch.
    #[must_use]
    pub fn cell(&self, col: u32, row: u32) -> Option<Rgba> {
        if col >= self.size || row >= self.size {
            return None;
        }
        self.cells
            .get(row as usize * self.size as usize + col as usize)
            .copied()
            .flatten()
    }
}

/// Result of hovering or clicking with the color picker.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSample {
    /// Model-space point that was sampled.
    pub at: Point,
    pub color: Rgba,
    pub hex: String,
    pub magnifier: Magnifier,
}

/// Pixel store backing the color picker.
#[derive(Debug, Clone, Default)]
pub struct ColorSampler {
    source: Option<(DevImageId, PixelBuffer)>,
}

impl ColorSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded pixels with those of `dev_image_id`.
    pub fn load(&mut self, dev_image_id: DevImageId, pixels: PixelBuffer) {
        self.source = Some((dev_image_id, pixels));
    }

    pub fn clear(&mut self) {
        self.source = None;
    }

    /// Whether pixels for `dev_image_id` are ready to sample.
    #[must_use]
    pub fn is_loaded_for(&self, dev_image_id: &DevImageId) -> bool {
        self.pixels_for(dev_image_id).is_some()
    }

    /// Natural pixel size of the loaded image, if it is `dev_image_id`.
    #[must_use]
    pub fn natural_size(&self, dev_image_id: &DevImageId) -> Option<Size> {
        self.pixels_for(dev_image_id).map(PixelBuffer::natural_size)
    }

    fn pixels_for(&self, dev_image_id: &DevImageId) -> Option<&PixelBuffer> {
        match &self.source {
            Some((id, pixels)) if id == dev_image_id => Some(pixels),
            _ => None,
        }
    }

    /// The pixel under `model` on `dev_image_id`.
    #[must_use]
    pub fn pixel_at(&self, dev_image_id: &DevImageId, model: Point) -> Option<Rgba> {
        let pixels = self.pixels_for(dev_image_id)?;
        let (px, py) = pixels.source_pixel(model);
        pixels.pixel(px, py)
    }

    /// Patch of source pixels centred on the pixel under `model`.
    #[must_use]
    pub fn magnifier(&self, dev_image_id: &DevImageId, model: Point) -> Option<Magnifier> {
        let pixels = self.pixels_for(dev_image_id)?;
        let (px, py) = pixels.source_pixel(model);

        let size = MAGNIFIER_PATCH_PX;
        let half = i64::from(size / 2);
        let mut cells = Vec::with_capacity((size * size) as usize);
        for row in 0..i64::from(size) {
            for col in 0..i64::from(size) {
                cells.push(pixels.pixel(px - half + col, py - half + row));
            }
        }
        Some(Magnifier { size, cells })
    }

    /// Sample the pixel under `model` on `dev_image_id`, with its magnifier patch.
    #[must_use]
    pub fn sample(&self, dev_image_id: &DevImageId, model: Point) -> Option<ColorSample> {
        let color = self.pixel_at(dev_image_id, model)?;
        let magnifier = self.magnifier(dev_image_id, model)?;
        Some(ColorSample { at: model, color, hex: color.hex(), magnifier })
    }
}
