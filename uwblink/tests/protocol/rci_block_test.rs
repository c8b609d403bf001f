#[path = "../common/mod.rs"]
mod common;

use uwblink::Error;
use uwblink::constants::{RCI_BLOCK_LEN, RCI_CRC_OFFSET, SWUP_COMMAND};
use uwblink::protocol::checksum::crc16_xmodem;
use uwblink::protocol::rci::{build_rci_block, parse_rci_block, parse_rci_slice};

#[test]
fn transfer_manifest_block_layout() {
    let mut data = vec![0x02u8];
    data.extend_from_slice(&[0xEE; 128]);
    let block = build_rci_block(SWUP_COMMAND, 0x02, &data).unwrap();
    assert_eq!(&block[..5], &common::bytes("70 02 3A 81 02")[..]);
    assert!(block[4 + 129..RCI_CRC_OFFSET].iter().all(|&b| b == 0));

    let parsed = parse_rci_block(&block).unwrap();
    assert_eq!(parsed.subcmd, 0x02);
    assert_eq!(parsed.data, data);
}

#[test]
fn response_shifted_by_dummy_byte() {
    let mut raw = [0u8; RCI_BLOCK_LEN];
    raw[1..5].copy_from_slice(&[0x70, 0x11, 0x3A, 0x08]);
    raw[5..13].copy_from_slice(&common::bytes("00 00 00 00 03 00 00 00"));
    let crc = crc16_xmodem(&raw[..RCI_CRC_OFFSET]);
    raw[RCI_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());

    let parsed = parse_rci_block(&raw).unwrap();
    assert_eq!(parsed.cmd, 0x70);
    assert_eq!(parsed.subcmd, 0x11);
    assert_eq!(parsed.data[4], 0x03);
}

#[test]
fn null_command_block_parses_in_place() {
    let block = build_rci_block(0x00, 0x01, &[0xAA, 0xBB]).unwrap();
    let parsed = parse_rci_block(&block).unwrap();
    assert_eq!(
        (parsed.cmd, parsed.subcmd, parsed.data),
        (0x00, 0x01, vec![0xAA, 0xBB])
    );
}

#[test]
fn corrupted_block_is_rejected() {
    let mut block = build_rci_block(SWUP_COMMAND, 0x21, &[]).unwrap();
    block[100] = 0x01;
    assert!(matches!(
        parse_rci_block(&block),
        Err(Error::ChecksumMismatch { .. })
    ));
}

#[test]
fn short_read_is_not_a_block() {
    assert!(matches!(
        parse_rci_slice(&[0x70; 255]),
        Err(Error::InvalidLength {
            expected: 256,
            actual: 255
        })
    ));
}
