/// Errors from building rasters and packing them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Pixel data does not match `width × height`.
    #[error("expected {expected} pixel bytes for the raster, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A raster with a zero side, or too large to address.
    #[error("invalid raster dimensions {width}x{height}")]
    DimensionMismatch { width: u32, height: u32 },

    /// The output slice cannot hold every plane.
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}
