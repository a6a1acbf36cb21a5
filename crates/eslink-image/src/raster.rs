//! RGB rasters.

use crate::{ImageError, PixelClass};

/// One 8-bit-per-channel sRGB pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);
    pub const RED: Rgb8 = Rgb8::new(255, 0, 0);
    pub const YELLOW: Rgb8 = Rgb8::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A row-major image, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgb8>,
}

fn pixel_count(width: u32, height: u32) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::DimensionMismatch { width, height });
    }
    usize::try_from(u64::from(width) * u64::from(height))
        .map_err(|_| ImageError::DimensionMismatch { width, height })
}

impl Raster {
    /// Wraps pixels that are already decoded.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb8>) -> Result<Self, ImageError> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a raster from packed `RGBRGB...` bytes.
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, ImageError> {
        Self::from_interleaved(width, height, bytes, 3)
    }

    /// Builds a raster from packed `RGBARGBA...` bytes. Alpha is dropped.
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, ImageError> {
        Self::from_interleaved(width, height, bytes, 4)
    }

    fn from_interleaved(
        width: u32,
        height: u32,
        bytes: &[u8],
        stride: usize,
    ) -> Result<Self, ImageError> {
        let count = pixel_count(width, height)?;
        let expected = count.saturating_mul(stride);
        if bytes.len() != expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(stride)
            .map(|px| Rgb8::new(px[0], px[1], px[2]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a raster by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> Rgb8,
    ) -> Result<Self, ImageError> {
        let count = pixel_count(width, height)?;
        let mut pixels = Vec::with_capacity(count);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb8] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` outside the raster.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.width as usize + x as usize;
        self.pixels.get(i).copied()
    }

    /// Renders the raster as text, one character per pixel and one line
    /// per row: `r` red, `Y` yellow, `B` black, `_` white.
    pub fn preview(&self) -> String {
        let mut out = String::with_capacity(self.pixels.len() + self.height as usize);
        for row in self.pixels.chunks(self.width as usize) {
            out.extend(row.iter().map(|px| match PixelClass::classify(*px) {
                PixelClass::Red => 'r',
                PixelClass::Yellow => 'Y',
                PixelClass::Black => 'B',
                PixelClass::White => '_',
            }));
            out.push('\n');
        }
        out
    }
}
