#[path = "../common/mod.rs"]
mod common;

use uwblink::Error;
use uwblink::link::LinkConfig;
use uwblink::link::LinkSession;
use uwblink::transport::MockTransport;

#[test]
fn write_aborts_within_ceiling_when_ready_stuck() {
    let mut mock = MockTransport::new();
    mock.ready_stuck_high = true;
    let s = common::session(mock);
    let err = s.write(&common::bytes("20 02 00 00")).unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        Error::TransportTimeout {
            stage: "ready before write"
        }
    ));
    let m = s.into_inner().unwrap();
    assert!(m.now_ms >= 200 && m.now_ms <= 250, "aborted at {} ms", m.now_ms);
    assert_eq!(m.cs_cycles, 0);
}

#[test]
fn consecutive_writes_wait_out_device_busy() {
    let mut mock = MockTransport::new();
    mock.busy_ms = 30;
    let s = common::session(mock);
    s.write(&common::bytes("20 02 00 00")).unwrap();
    s.write(&common::bytes("20 03 00 00")).unwrap();
    let m = s.into_inner().unwrap();
    assert_eq!(m.sent.len(), 2);
    assert!(m.now_ms >= 30);
}

#[test]
fn configured_ceiling_is_honoured() {
    let mut mock = MockTransport::new();
    mock.ready_stuck_high = true;
    let config = LinkConfig {
        backoff_ceiling_ms: 40,
        ..LinkConfig::default()
    };
    let s = LinkSession::with_config(mock, config);
    assert!(s.write(&[0x20, 0x02, 0x00, 0x00]).is_err());
    assert!(s.into_inner().unwrap().now_ms <= 40);
}

#[test]
fn extended_command_fits_limit() {
    let s = common::session(MockTransport::new());
    let mut frame = common::bytes("2E 80 00 08");
    frame.extend(std::iter::repeat_n(0x11, 2048));
    s.write(&frame).unwrap();
    assert_eq!(s.into_inner().unwrap().sent[0].len(), 2052);
}
