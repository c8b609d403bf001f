#[path = "../common/mod.rs"]
mod common;

use uwblink::Error;
use uwblink::protocol::{LinkFrame, build_link_header, parse_link_header};

#[test]
fn uci_response_header() {
    assert_eq!(parse_link_header(&[0x40, 0x02, 0x00, 0x03]), (false, 3));
}

#[test]
fn extended_length_uses_byte_two_as_low_byte() {
    assert_eq!(parse_link_header(&[0x40, 0x82, 0x00, 0x01]), (true, 256));
    assert_eq!(build_link_header(300).unwrap(), [0x00, 0x80, 0x2C, 0x01]);
    assert_eq!(build_link_header(255).unwrap(), [0x00, 0x00, 0x00, 0xFF]);
}

#[test]
fn command_payload_limit() {
    assert!(build_link_header(2048).is_ok());
    assert!(matches!(
        build_link_header(2049),
        Err(Error::InvalidLength {
            expected: 2048,
            actual: 2049
        })
    ));
}

#[test]
fn decode_device_info_response() {
    let raw = common::bytes(common::fixtures::CORE_DEVICE_INFO_RSP);
    let frame = LinkFrame::decode(&raw).unwrap();
    assert_eq!(frame.msg_type(), 0x40);
    assert_eq!(frame.opcode(), 0x02);
    assert_eq!(frame.payload.len(), 0x15);
    assert_eq!(frame.encode(), raw);

    assert!(LinkFrame::decode(&raw[..raw.len() - 1]).is_err());
}
