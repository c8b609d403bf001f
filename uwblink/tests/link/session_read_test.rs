#[path = "../common/mod.rs"]
mod common;

use common::fixtures::DEVICE_READY_NTF;
use uwblink::Error;
use uwblink::transport::MockTransport;

#[test]
fn one_byte_misalignment_is_recovered() {
    let mut mock = MockTransport::new();
    let mut shifted = vec![0x00];
    shifted.extend(common::bytes(DEVICE_READY_NTF));
    mock.push_response(shifted);
    let s = common::session(mock);
    assert_eq!(s.read().unwrap(), common::bytes(DEVICE_READY_NTF));
}

#[test]
fn frames_are_read_in_order() {
    let mut mock = MockTransport::new();
    mock.push_response(common::bytes(DEVICE_READY_NTF));
    mock.push_response(common::bytes("40 02 00 02 00 01"));
    let s = common::session(mock);
    assert_eq!(s.read().unwrap(), common::bytes(DEVICE_READY_NTF));
    assert_eq!(s.read().unwrap(), common::bytes("40 02 00 02 00 01"));
}

#[test]
fn low_power_device_reports_immediately() {
    let mut mock = MockTransport::new();
    mock.push_response(vec![0xFF; 16]);
    let s = common::session(mock);
    assert!(matches!(s.read(), Err(Error::DeviceLowPower)));
    assert!(s.into_inner().unwrap().now_ms < 10);
}

#[test]
fn oversized_response_is_rejected() {
    let mut mock = MockTransport::new();
    let mut frame = common::bytes("40 82 01 01");
    frame.extend(vec![0u8; 257]);
    mock.push_response(frame);
    let s = common::session(mock);
    assert!(matches!(
        s.read(),
        Err(Error::InvalidLength {
            expected: 256,
            actual: 257
        })
    ));
}

#[test]
fn read_survives_transfer_glitch() {
    let mut mock = MockTransport::new();
    mock.push_response(common::bytes(DEVICE_READY_NTF));
    mock.transfer_failures = 1;
    let s = common::session(mock);
    assert_eq!(s.read().unwrap(), common::bytes(DEVICE_READY_NTF));
}

#[test]
fn no_frame_times_out_without_chip_select_left_asserted() {
    let s = common::session(MockTransport::new());
    assert!(matches!(s.read(), Err(Error::TransportTimeout { .. })));
    let m = s.into_inner().unwrap();
    assert!(!m.cs_asserted);
    assert!(m.now_ms <= 250);
}
