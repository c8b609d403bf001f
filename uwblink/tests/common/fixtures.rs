// fixtures.rs - frames and packages shared by the integration tests

use uwblink::constants::{SWUP_MANIFEST_LEN, SWUP_SEGMENT_LEN};

pub const DEVICE_READY_NTF: &str = "60 01 00 01 01";
pub const HPD_NTF: &str = "60 01 00 01 FC";
pub const SWUP_ACTIVATED_RSP: &str = "4E 12 00 01 00";
/// UCI 1.1, device name "SR040", firmware 1.2.3, DSP 4.5.6.
pub const CORE_DEVICE_INFO_RSP: &str =
    "40 02 00 15 00 01 01 03 E3 05 53 52 30 34 30 E4 03 01 02 03 E7 03 04 05 06";
/// Nine capability parameters, 46 bytes in total.
pub const CORE_CAPS_RSP: &str = "40 03 00 2A 00 A0 03 01 00 00 A1 03 01 01 00 A2 03 01 02 00 \
     E3 02 FF 00 E4 02 60 09 E5 01 05 E6 01 0A E7 04 00 40 2F 6D E8 04 00 80 38 8A";

/// A package with `segments` component segments. Every segment starts
/// with its own index so transfers can be matched back to the package.
pub fn swup_package(segments: usize) -> Vec<u8> {
    let mut pkg = vec![0xA5u8; SWUP_MANIFEST_LEN];
    for (i, chunk) in pkg.chunks_mut(SWUP_SEGMENT_LEN).enumerate() {
        chunk[0] = i as u8;
    }
    for s in 0..segments {
        let mut seg = vec![0x3Cu8; SWUP_SEGMENT_LEN];
        seg[0] = s as u8;
        seg[1] = 0xC0;
        pkg.extend_from_slice(&seg);
    }
    pkg
}

/// A firmware image spanning `len` bytes of a repeating pattern.
pub fn firmware_image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
