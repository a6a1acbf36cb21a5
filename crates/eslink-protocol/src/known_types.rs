//! Static screen geometry tables.
//!
//! A label reports its resolution in two ways. Newer firmware sets a 5-bit
//! device-type code in the second type byte; older firmware only sets the
//! 3-bit pixel-size field. The device-type table wins when it has an
//! entry for the code.

/// One known device type: a code and the screen it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDeviceType {
    pub code: u8,
    pub width: u16,
    pub height: u16,
}

const fn kt(code: u8, width: u16, height: u16) -> KnownDeviceType {
    KnownDeviceType { code, width, height }
}

/// Device-type code → resolution.
///
/// Codes 82–84 lie outside the 5-bit field and can only be found by a
/// direct [`KnownDeviceType::find`].
pub const KNOWN_DEVICE_TYPES: [KnownDeviceType; 25] = [
    kt(0, 212, 104),
    kt(1, 296, 128),
    kt(2, 400, 300),
    kt(3, 640, 384),
    kt(4, 960, 640),
    kt(5, 250, 132),
    kt(6, 196, 96),
    kt(7, 640, 360),
    kt(8, 250, 128),
    kt(9, 800, 480),
    kt(10, 280, 480),
    kt(11, 1360, 480),
    kt(12, 168, 384),
    kt(13, 210, 480),
    kt(14, 1024, 576),
    kt(15, 384, 168),
    kt(16, 480, 210),
    kt(17, 240, 416),
    kt(18, 400, 600),
    kt(19, 1600, 1200),
    kt(20, 528, 768),
    kt(21, 200, 200),
    kt(82, 960, 680),
    kt(83, 792, 272),
    kt(84, 272, 792),
];

/// Pixel-size field (0–7) → `(width, height)`, used when the device type
/// is not in [`KNOWN_DEVICE_TYPES`].
pub const PIXEL_SIZE_GEOMETRY: [(u16, u16); 8] = [
    (212, 104),
    (128, 296),
    (400, 300),
    (640, 384),
    (960, 640),
    (196, 96),
    (640, 480),
    (250, 122),
];

impl KnownDeviceType {
    /// Looks up a device-type code.
    pub fn find(code: u8) -> Option<&'static KnownDeviceType> {
        KNOWN_DEVICE_TYPES.iter().find(|t| t.code == code)
    }
}
