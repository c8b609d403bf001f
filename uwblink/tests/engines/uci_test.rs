#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{
    CORE_CAPS_RSP, CORE_DEVICE_INFO_RSP, DEVICE_READY_NTF, HPD_NTF, SWUP_ACTIVATED_RSP,
    swup_package,
};
use uwblink::constants::RCI_BLOCK_LEN;
use uwblink::prelude::*;
use uwblink::test_support::SwupDeviceModel;
use uwblink::transport::MockTransport;
use uwblink::uci::{self, caps_tag, info_tag};

#[test]
fn device_info_is_decoded() {
    let mock = MockTransport::new().with_responder(|_| vec![common::bytes(CORE_DEVICE_INFO_RSP)]);
    let session = common::session(mock);
    let info = uci::core_device_info(&session).unwrap();
    assert_eq!((info.uci_major, info.uci_minor), (1, 1));
    assert_eq!(info.device_name().as_deref(), Some("SR040"));
    assert_eq!(info.firmware_version(), Some(0x0001_0203));
    assert_eq!(info.dsp_version(), Some(0x0004_0506));
    assert_eq!(
        info.param(info_tag::FIRMWARE_VERSION).unwrap().to_string(),
        "1.2.3"
    );
}

#[test]
fn capabilities_are_decoded_after_hpd_resend() {
    let mut hpd_sent = false;
    let mock = MockTransport::new().with_responder(move |_| {
        if !hpd_sent {
            hpd_sent = true;
            return vec![common::bytes(HPD_NTF)];
        }
        vec![common::bytes(CORE_CAPS_RSP)]
    });
    let session = common::session(mock);
    let caps = uci::core_capabilities(&session).unwrap();
    assert_eq!(caps.params.len(), 9);
    assert_eq!(caps.param(caps_tag::MAX_PAYLOAD_LEN).unwrap().value, vec![0xFF, 0x00]);
    assert_eq!(caps.count(caps_tag::MAX_SESSION_NUM), Some(5));
    assert_eq!(session.into_inner().unwrap().sent.len(), 2);
}

#[test]
fn boot_activate_and_update() {
    let mut model = SwupDeviceModel::active();
    let mut hpd_sent = false;
    let mut mock = MockTransport::new().with_responder(move |f| {
        if f.len() == RCI_BLOCK_LEN {
            return model.respond(f);
        }
        if !hpd_sent {
            hpd_sent = true;
            return vec![common::bytes(HPD_NTF)];
        }
        vec![common::bytes(SWUP_ACTIVATED_RSP)]
    });
    mock.push_response(common::bytes(DEVICE_READY_NTF));
    let session = common::session(mock);

    uci::await_device_ready(&session).unwrap();
    uci::activate_swup(&session).unwrap();
    session.switch_protocol().unwrap();

    let bytes = swup_package(2);
    let pkg = SwupPackage::new(&bytes).unwrap();
    let outcome = SwupUpdater::new(SwupClient::new(&session))
        .update(&pkg)
        .unwrap();
    assert_eq!(outcome.final_state, SwupDeviceState::Init);

    let sent = session.into_inner().unwrap().sent;
    // enable-swup twice (first one lost to HPD), then RCI blocks only
    assert_eq!(sent[0], sent[1]);
    assert!(sent[2..].iter().all(|f| f.len() == RCI_BLOCK_LEN));
}
