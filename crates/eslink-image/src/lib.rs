//! Image packing for eslink.
//!
//! Shelf labels do not take RGB. They take one bit plane per ink, laid
//! out column by column:
//!
//! ```text
//!            plane 0 (BW)                 plane 1 (red or yellow)
//!       x=0    x=1    x=2  ...          x=0    x=1  ...
//!     ┌──────┬──────┬──────┐          ┌──────┬──────┐
//! y0-7│byte 0│byte 2│byte 4│          │      │      │
//! y8-…│byte 1│byte 3│byte 5│          │      │      │
//!     └──────┴──────┴──────┘          └──────┴──────┘
//!       bit 7 = top pixel of the byte
//!       BW: 1 = white, 0 = black      color: 1 = ink, 0 = none
//! ```
//!
//! [`pack`] classifies every pixel with a fixed threshold rule
//! ([`PixelClass::classify`]) and writes the planes.

mod error;
mod pack;
mod raster;

pub use error::ImageError;
pub use pack::{pack, pack_into, packed_len, plane_count, PixelClass};
pub use raster::{Raster, Rgb8};
