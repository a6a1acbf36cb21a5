//! Bit-plane packing.

use crate::{ImageError, Raster, Rgb8};

/// How a single pixel is drawn on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelClass {
    Black,
    White,
    Red,
    Yellow,
}

impl PixelClass {
    /// Classifies a pixel. Red is tested first, then yellow, then the
    /// black/white split at a channel sum of 150.
    pub fn classify(px: Rgb8) -> Self {
        let (r, g, b) = (u16::from(px.r), u16::from(px.g), u16::from(px.b));
        if r > 150 && r > g + b {
            Self::Red
        } else if r > 150 && g > 150 && b < 50 {
            Self::Yellow
        } else if r + g + b >= 150 {
            Self::White
        } else {
            Self::Black
        }
    }
}

/// Number of planes in the device buffer: BW plus at most one color.
pub fn plane_count(has_red: bool, has_yellow: bool) -> usize {
    1 + usize::from(has_red || has_yellow)
}

/// Bytes needed to pack a `width × height` image.
pub fn packed_len(width: u32, height: u32, has_red: bool, has_yellow: bool) -> usize {
    height.div_ceil(8) as usize * width as usize * plane_count(has_red, has_yellow)
}

/// Packs `raster` into a freshly allocated device buffer.
///
/// `mirror` is accepted for symmetry with the advertisement and has no
/// effect on the layout.
pub fn pack(
    raster: &Raster,
    has_red: bool,
    has_yellow: bool,
    mirror: bool,
) -> Result<Vec<u8>, ImageError> {
    let mut out = vec![0u8; packed_len(raster.width(), raster.height(), has_red, has_yellow)];
    pack_into(&mut out, raster, has_red, has_yellow, mirror)?;
    Ok(out)
}

/// Packs `raster` into `dst`, which must hold at least
/// [`packed_len`] bytes. Returns the number of bytes written.
pub fn pack_into(
    dst: &mut [u8],
    raster: &Raster,
    has_red: bool,
    has_yellow: bool,
    _mirror: bool,
) -> Result<usize, ImageError> {
    let (width, height) = (raster.width(), raster.height());
    let needed = packed_len(width, height, has_red, has_yellow);
    if dst.len() < needed {
        return Err(ImageError::BufferTooSmall {
            needed,
            available: dst.len(),
        });
    }

    let column_bytes = height.div_ceil(8) as usize;
    let plane_bytes = column_bytes * width as usize;
    let dst = &mut dst[..needed];
    dst.fill(0);
    let (bw, color) = dst.split_at_mut(plane_bytes);

    let set = |plane: &mut [u8], x: usize, y: usize| {
        plane[x * column_bytes + y / 8] |= 0x80 >> (y % 8);
    };

    for (i, px) in raster.pixels().iter().enumerate() {
        let (x, y) = (i % width as usize, i / width as usize);
        match PixelClass::classify(*px) {
            // A colored pixel with no plane for its ink stays black.
            PixelClass::Red if has_red => set(color, x, y),
            PixelClass::Yellow if has_yellow => set(color, x, y),
            PixelClass::White => set(bw, x, y),
            _ => {}
        }
    }
    Ok(needed)
}
