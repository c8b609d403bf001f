#[path = "../common/mod.rs"]
mod common;

use uwblink::protocol::checksum::{crc16_xmodem, lrc8};

#[test]
fn crc16_reference_vectors() {
    assert_eq!(crc16_xmodem(b"123456789"), 0x31C3);
    assert_eq!(crc16_xmodem(&[]), 0x0000);
    assert_eq!(crc16_xmodem(&[0x00]), 0x0000);
    assert_eq!(crc16_xmodem(&[0x01]), 0x1021);
}

#[test]
fn lrc_is_twos_complement_of_sum() {
    assert_eq!(lrc8(&[0x01, 0x02, 0x03]), 0xFA);
    assert_eq!(lrc8(&[]), 0x00);
    // header + payload of a Patch-ROM download segment
    let covered = common::bytes("23 01 03 00 10 20");
    assert_eq!(lrc8(&covered), 0xA9);
}
