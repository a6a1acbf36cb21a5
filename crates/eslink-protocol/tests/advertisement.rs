//! Property tests for advertisement decoding.

use eslink_protocol::{KnownDeviceType, ManufacturerData, MAGIC};
use proptest::prelude::*;

fn payload() -> impl Strategy<Value = [u8; 7]> {
    any::<[u8; 5]>().prop_map(|tail| {
        let mut raw = [0u8; 7];
        raw[..2].copy_from_slice(&MAGIC);
        raw[2..].copy_from_slice(&tail);
        raw
    })
}

proptest! {
    #[test]
    fn hex_text_decodes_like_raw_bytes(raw in payload(), upper in any::<bool>()) {
        let mut text = hex::encode(raw);
        if upper {
            text = text.to_uppercase();
        }
        let from_raw = ManufacturerData::decode(&raw);
        let from_hex = ManufacturerData::decode(text.as_bytes());
        prop_assert!(from_raw.is_some());
        prop_assert_eq!(from_raw, from_hex);
    }

    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..40)) {
        if let Some(data) = ManufacturerData::decode(&bytes) {
            prop_assert!(data.is_valid());
        }
    }

    #[test]
    fn screen_size_matches_geometry(raw in payload()) {
        let data = ManufacturerData::from_raw(raw);
        let planes = u32::from(data.color_plane_count());
        prop_assert!(planes == 1 || planes == 2);
        let expected = u32::from(data.height()).div_ceil(8) * u32::from(data.width()) * planes;
        prop_assert_eq!(data.screen_size_bytes(), expected);
    }

    #[test]
    fn known_device_type_fixes_geometry(raw in payload(), code in 0u8..22) {
        let mut data = ManufacturerData::from_raw(raw);
        data.set_device_type(code);
        let known = KnownDeviceType::find(code).unwrap();
        prop_assert_eq!((data.width(), data.height()), (known.width, known.height));
    }
}
