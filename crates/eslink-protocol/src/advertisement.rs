//! The manufacturer-specific advertisement payload.
//!
//! Every label broadcasts seven bytes in the manufacturer-specific data
//! section of its advertisements:
//!
//! ```text
//! offset  field            bits
//! 0       magic            0x53
//! 1       magic            0x50
//! 2       type byte        0 mirror | 1-2 color | 3-4 manufacture | 5-7 pixel size
//! 3       voltage × 10
//! 4       software version
//! 5       hardware version
//! 6       type byte 2      0-2 reserved | 3-7 device type
//! ```
//!
//! Some stacks hand the section over as a hex string instead of raw
//! bytes; [`ManufacturerData::decode`] accepts both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{KnownDeviceType, ProtocolError, PIXEL_SIZE_GEOMETRY};

/// Length of the raw payload.
pub const MANUFACTURER_DATA_LEN: usize = 7;

/// The two leading bytes every valid payload starts with.
pub const MAGIC: [u8; 2] = [0x53, 0x50];

const TYPE1: usize = 2;
const VOLTAGE: usize = 3;
const SOFTWARE: usize = 4;
const HARDWARE: usize = 5;
const TYPE2: usize = 6;

// (shift, width) of each bitfield inside its byte.
const MIRROR_BITS: (u8, u8) = (0, 1);
const COLOR_BITS: (u8, u8) = (1, 2);
const MANUFACTURE_BITS: (u8, u8) = (3, 2);
const PIXEL_SIZE_BITS: (u8, u8) = (5, 3);
const DEVICE_TYPE_BITS: (u8, u8) = (3, 5);

const fn field_mask(width: u8) -> u8 {
    ((1u16 << width) - 1) as u8
}

const fn get_bits(byte: u8, (shift, width): (u8, u8)) -> u8 {
    (byte >> shift) & field_mask(width)
}

const fn set_bits(byte: u8, (shift, width): (u8, u8), value: u8) -> u8 {
    let mask = field_mask(width) << shift;
    (byte & !mask) | ((value << shift) & mask)
}

// ---------------------------------------------------------------------------
// Bitfield enums
// ---------------------------------------------------------------------------

/// Panel mirroring mode (bit 0 of the type byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mirror {
    Double,
    Single,
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double => write!(f, "M-M"),
            Self::Single => write!(f, "M"),
        }
    }
}

/// Which inks the panel has (bits 1–2 of the type byte).
///
/// A panel has at most one extra color, never both red and yellow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {
    Bw,
    Bwr,
    Bwy,
    Unknown,
}

impl ColorType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Bw,
            1 => Self::Bwr,
            2 => Self::Bwy,
            _ => Self::Unknown,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::Bw => 0,
            Self::Bwr => 1,
            Self::Bwy => 2,
            Self::Unknown => 3,
        }
    }
}

impl fmt::Display for ColorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bw => write!(f, "BW"),
            Self::Bwr => write!(f, "BWR"),
            Self::Bwy => write!(f, "BWY"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Panel technology (bits 3–4 of the type byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManufactureType {
    Tft,
    Epa,
    Epa1,
    Unknown,
}

impl ManufactureType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Tft,
            1 => Self::Epa,
            2 => Self::Epa1,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ManufactureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tft => write!(f, "TFT"),
            Self::Epa => write!(f, "EPA"),
            Self::Epa1 => write!(f, "EPA-1"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// ManufacturerData
// ---------------------------------------------------------------------------

/// A decoded advertisement payload.
///
/// Holds the seven raw bytes and reads every field through explicit
/// mask/shift accessors, so the byte order and bit numbering in the module
/// docs are the whole contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManufacturerData {
    raw: [u8; MANUFACTURER_DATA_LEN],
}

impl ManufacturerData {
    /// A valid payload for a 212×104 BW panel at 3.0 V, hardware version 1.
    pub fn new() -> Self {
        Self {
            raw: [MAGIC[0], MAGIC[1], 0, 30, 0, 1, 0],
        }
    }

    /// Wraps seven raw bytes as they are, valid or not.
    pub fn from_raw(raw: [u8; MANUFACTURER_DATA_LEN]) -> Self {
        Self { raw }
    }

    /// Decodes an advertisement section into a valid payload.
    ///
    /// Accepts at least 7 raw bytes, or at least 14 ASCII hex digits which
    /// are hex-decoded first. Returns `None` for anything shorter, for
    /// input that is neither, and for payloads with the wrong magic bytes.
    /// Most advertisements on the air are not from labels, so `None` is
    /// the common case, not an error.
    pub fn decode(section: &[u8]) -> Option<Self> {
        Self::read(section).filter(Self::is_valid)
    }

    /// Like [`decode`](Self::decode) but without the magic check.
    pub fn read(section: &[u8]) -> Option<Self> {
        if section.len() >= 2 * MANUFACTURER_DATA_LEN
            && section.iter().all(u8::is_ascii_hexdigit)
        {
            // An odd trailing digit carries no full byte.
            let even = &section[..section.len() & !1];
            let bytes = hex::decode(even).ok()?;
            return Self::from_prefix(&bytes);
        }
        Self::from_prefix(section)
    }

    fn from_prefix(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; MANUFACTURER_DATA_LEN] =
            bytes.get(..MANUFACTURER_DATA_LEN)?.try_into().ok()?;
        Some(Self { raw })
    }

    /// Returns `true` if both magic bytes are present.
    pub fn is_valid(&self) -> bool {
        self.raw[0] == MAGIC[0] && self.raw[1] == MAGIC[1]
    }

    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8; MANUFACTURER_DATA_LEN] {
        &self.raw
    }

    /// The raw payload as 14 lower-case hex characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.raw)
    }

    // -- Bitfields ----------------------------------------------------------

    pub fn mirror(&self) -> Mirror {
        match get_bits(self.raw[TYPE1], MIRROR_BITS) {
            0 => Mirror::Double,
            _ => Mirror::Single,
        }
    }

    /// Returns `true` for single-mirror panels.
    pub fn is_mirrored(&self) -> bool {
        self.mirror() == Mirror::Single
    }

    pub fn color(&self) -> ColorType {
        ColorType::from_bits(get_bits(self.raw[TYPE1], COLOR_BITS))
    }

    pub fn manufacture(&self) -> ManufactureType {
        ManufactureType::from_bits(get_bits(self.raw[TYPE1], MANUFACTURE_BITS))
    }

    /// Legacy 3-bit resolution index.
    pub fn pixel_size(&self) -> u8 {
        get_bits(self.raw[TYPE1], PIXEL_SIZE_BITS)
    }

    /// 5-bit device-type code.
    pub fn device_type(&self) -> u8 {
        get_bits(self.raw[TYPE2], DEVICE_TYPE_BITS)
    }

    pub fn has_red(&self) -> bool {
        self.color() == ColorType::Bwr
    }

    pub fn has_yellow(&self) -> bool {
        self.color() == ColorType::Bwy
    }

    /// Battery voltage in tenths of a volt.
    pub fn voltage10(&self) -> u8 {
        self.raw[VOLTAGE]
    }

    /// Battery voltage in volts.
    pub fn voltage(&self) -> f32 {
        f32::from(self.voltage10()) / 10.0
    }

    pub fn software_version(&self) -> u8 {
        self.raw[SOFTWARE]
    }

    pub fn hardware_version(&self) -> u8 {
        self.raw[HARDWARE]
    }

    /// The first type byte, undecoded.
    pub fn type1(&self) -> u8 {
        self.raw[TYPE1]
    }

    /// The second type byte, undecoded.
    pub fn type2(&self) -> u8 {
        self.raw[TYPE2]
    }

    /// Both type bytes as `type1 | type2 << 8`.
    pub fn type12(&self) -> u16 {
        u16::from(self.type1()) | (u16::from(self.type2()) << 8)
    }

    // -- Geometry -----------------------------------------------------------

    fn known_type(&self) -> Option<&'static KnownDeviceType> {
        KnownDeviceType::find(self.device_type())
    }

    fn geometry(&self) -> (u16, u16) {
        match self.known_type() {
            Some(t) => (t.width, t.height),
            None => PIXEL_SIZE_GEOMETRY[usize::from(self.pixel_size())],
        }
    }

    /// Screen width in pixels.
    pub fn width(&self) -> u16 {
        self.geometry().0
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u16 {
        self.geometry().1
    }

    /// Number of bit planes in the device buffer: 1 for BW, 2 otherwise.
    pub fn color_plane_count(&self) -> u8 {
        match self.color() {
            ColorType::Bw => 1,
            _ => 2,
        }
    }

    /// Exact length of the image buffer the label expects.
    pub fn screen_size_bytes(&self) -> u32 {
        let (width, height) = self.geometry();
        u32::from(height).div_ceil(8) * u32::from(width) * u32::from(self.color_plane_count())
    }

    // -- Setters ------------------------------------------------------------

    fn set_pixel_size_where(&mut self, matches: impl Fn((u16, u16)) -> bool) {
        if self.known_type().is_some() {
            return;
        }
        // Only the first four legacy sizes can be selected this way.
        if let Some(i) = PIXEL_SIZE_GEOMETRY[..4].iter().position(|g| matches(*g)) {
            self.raw[TYPE1] = set_bits(self.raw[TYPE1], PIXEL_SIZE_BITS, i as u8);
        }
    }

    /// Selects the legacy pixel size with this width.
    ///
    /// No effect when the device type already fixes the geometry or no
    /// legacy size has this width.
    pub fn set_width(&mut self, width: u16) {
        self.set_pixel_size_where(|(w, _)| w == width);
    }

    /// Selects the legacy pixel size with this height. See [`set_width`](Self::set_width).
    pub fn set_height(&mut self, height: u16) {
        self.set_pixel_size_where(|(_, h)| h == height);
    }

    pub fn set_mirror(&mut self, mirror: Mirror) {
        let bit = match mirror {
            Mirror::Double => 0,
            Mirror::Single => 1,
        };
        self.raw[TYPE1] = set_bits(self.raw[TYPE1], MIRROR_BITS, bit);
    }

    pub fn set_color(&mut self, color: ColorType) {
        self.raw[TYPE1] = set_bits(self.raw[TYPE1], COLOR_BITS, color.bits());
    }

    /// Sets the color to BWR, or back to BW.
    pub fn set_has_red(&mut self, value: bool) {
        self.set_color(if value { ColorType::Bwr } else { ColorType::Bw });
    }

    /// Sets the color to BWY, or back to BW.
    pub fn set_has_yellow(&mut self, value: bool) {
        self.set_color(if value { ColorType::Bwy } else { ColorType::Bw });
    }

    pub fn set_device_type(&mut self, code: u8) {
        self.raw[TYPE2] = set_bits(self.raw[TYPE2], DEVICE_TYPE_BITS, code);
    }

    pub fn set_voltage10(&mut self, value: u8) {
        self.raw[VOLTAGE] = value;
    }

    pub fn set_software_version(&mut self, value: u8) {
        self.raw[SOFTWARE] = value;
    }

    pub fn set_hardware_version(&mut self, value: u8) {
        self.raw[HARDWARE] = value;
    }

    // -- Rendering ----------------------------------------------------------

    /// A serialisable summary of the label's capabilities.
    pub fn summary(&self) -> LabelSummary {
        LabelSummary {
            color: self.color().to_string(),
            width: self.width(),
            height: self.height(),
            mirror: self.mirror().to_string(),
            voltage10: self.voltage10(),
        }
    }

    /// The summary rendered as JSON.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serialises.
        serde_json::to_string(&self.summary()).unwrap_or_default()
    }
}

impl Default for ManufacturerData {
    fn default() -> Self {
        Self::new()
    }
}

/// `BWR250x128M EPA 2.8V`
impl fmt::Display for ManufacturerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.voltage10();
        write!(
            f,
            "{}{}x{}{} {} {}.{}V",
            self.color(),
            self.width(),
            self.height(),
            self.mirror(),
            self.manufacture(),
            v / 10,
            v % 10
        )
    }
}

/// Parses the hex text form, e.g. `53500b1c810141`.
impl FromStr for ManufacturerData {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s.as_bytes())
            .ok_or_else(|| ProtocolError::InvalidManufacturerData(s.to_string()))
    }
}

/// What a label can display, as reported in its advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub color: String,
    pub width: u16,
    pub height: u16,
    pub mirror: String,
    pub voltage10: u8,
}
