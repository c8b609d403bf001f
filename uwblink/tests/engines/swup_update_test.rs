#[path = "../common/mod.rs"]
mod common;

use common::fixtures::swup_package;
use uwblink::constants::RCI_BLOCK_LEN;
use uwblink::prelude::*;
use uwblink::test_support::SwupDeviceModel;

fn subcommands(sent: &[Vec<u8>]) -> Vec<u8> {
    sent.iter().map(|f| f[1]).collect()
}

#[test]
fn full_update_issues_expected_sequence() {
    let segments = 5;
    let session = common::session(SwupDeviceModel::active().into_mock());
    let bytes = swup_package(segments);
    let pkg = SwupPackage::new(&bytes).unwrap();

    let outcome = SwupUpdater::new(SwupClient::new(&session))
        .execute(&pkg)
        .unwrap();
    assert_eq!(outcome.finish_status, Some(SwupStatus::SUCCESS));

    let sent = session.into_inner().unwrap().sent;
    assert!(sent.iter().all(|f| f.len() == RCI_BLOCK_LEN));
    assert_eq!(sent.len(), 1 + 4 + segments + 4);

    let mut expected = vec![0x21, 0x14, 0x02, 0x02, 0x02, 0x02, 0x13];
    expected.extend(std::iter::repeat_n(0x01, segments));
    expected.extend([0x11, 0x12]);
    assert_eq!(subcommands(&sent), expected);

    // manifest chunks carry their index, components their segment number
    for (i, f) in sent[2..6].iter().enumerate() {
        assert_eq!(f[4], i as u8);
        assert_eq!(f[5], i as u8);
    }
    for (i, f) in sent[7..7 + segments].iter().enumerate() {
        assert_eq!(f[4], 0x00, "component index");
        assert_eq!(u16::from_le_bytes([f[5], f[6]]), i as u16);
        assert_eq!(&f[7..9], &[i as u8, 0xC0]);
    }
}

#[test]
fn component_rejection_aborts_with_device_status() {
    let mut model = SwupDeviceModel::active();
    model.fail_on = Some((0x01, 0xF7));
    let session = common::session(model.into_mock());
    let bytes = swup_package(3);
    let pkg = SwupPackage::new(&bytes).unwrap();

    let mut updater = SwupUpdater::new(SwupClient::new(&session));
    let err = updater.execute(&pkg).unwrap_err();
    match err {
        Error::DeviceReportedFailure { status, state } => {
            assert_eq!(status, SwupStatus::INCOMPLETE_TRANSFER);
            assert_eq!(state, SwupDeviceState::Transfer);
            assert!(status.to_string().contains("not all segments"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // no VerifyAll or FinishUpdate after the abort
    let sent = session.into_inner().unwrap().sent;
    assert_eq!(*subcommands(&sent).last().unwrap(), 0x01);
}

#[test]
fn device_outside_update_states_is_refused() {
    let mut model = SwupDeviceModel::active();
    model.state = 0;
    let session = common::session(model.into_mock());
    let bytes = swup_package(1);
    let pkg = SwupPackage::new(&bytes).unwrap();
    assert!(matches!(
        SwupUpdater::new(SwupClient::new(&session)).execute(&pkg),
        Err(Error::UnexpectedState {
            step: "GetDeviceInfo",
            actual: SwupDeviceState::Error,
            ..
        })
    ));
}

#[test]
fn invalid_package_fails_before_any_io() {
    assert!(matches!(
        SwupPackage::new(&[0u8; 600]),
        Err(Error::InvalidPackage(_))
    ));
}

#[test]
fn production_key_accepts_production_silicon() {
    let session = common::session(SwupDeviceModel::active().into_mock());
    let config = SwupConfig {
        key_version: KeyVersion::ProductionA20_06,
        ..SwupConfig::default()
    };
    let bytes = swup_package(2);
    let pkg = SwupPackage::new(&bytes).unwrap();
    let outcome = SwupUpdater::new(SwupClient::with_config(&session, config))
        .update(&pkg)
        .unwrap();
    assert!(!outcome.reinterpreted);
}
