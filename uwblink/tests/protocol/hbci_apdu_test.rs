#[path = "../common/mod.rs"]
mod common;

use uwblink::Error;
use uwblink::protocol::hbci::{build_hbci_apdu, parse_hbci_apdu, split_segments};

#[test]
fn status_query_is_header_only() {
    let q = build_hbci_apdu(0x01, 0x21, &[], false).unwrap();
    assert_eq!(q.encode(), common::bytes("01 21 00 00"));
    assert_eq!(q.lrc, None);
}

#[test]
fn non_final_segment_carries_only_the_flag() {
    let a = build_hbci_apdu(0x23, 0x01, &[0x10, 0x20], true).unwrap();
    assert_eq!(a.header(), [0x23, 0x01, 0x00, 0x80]);
    assert!(a.is_segment());
    // 0x100 - (0x23 + 0x01 + 0x80 + 0x10 + 0x20) = 0x2C
    assert_eq!(a.body(), common::bytes("10 20 2C"));
    assert_eq!(parse_hbci_apdu(&a.encode()).unwrap(), a);
}

#[test]
fn answer_lrc_is_verified() {
    let mut raw = build_hbci_apdu(0x02, 0x35, &[0x07], false)
        .unwrap()
        .encode();
    assert_eq!(parse_hbci_apdu(&raw).unwrap().payload, vec![0x07]);

    raw[4] = 0x08;
    assert!(matches!(
        parse_hbci_apdu(&raw),
        Err(Error::ChecksumMismatch { .. })
    ));
}

#[test]
fn image_split_marks_all_but_last() {
    let image = common::fixtures::firmware_image(5000);
    let parts = split_segments(&image, 2048);
    let shape: Vec<(usize, bool)> = parts.iter().map(|(c, s)| (c.len(), *s)).collect();
    assert_eq!(shape, vec![(2048, true), (2048, true), (904, false)]);
}
