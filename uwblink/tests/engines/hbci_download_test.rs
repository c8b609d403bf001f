#[path = "../common/mod.rs"]
mod common;

use common::fixtures::firmware_image;
use uwblink::hbci::{HifImageError, PatchRomError};
use uwblink::prelude::*;
use uwblink::test_support::HbciBootloaderModel;

#[test]
fn patch_rom_download_sequence() {
    let session = common::session(HbciBootloaderModel::default().into_mock());
    let image = firmware_image(4096 + 10);
    let mut dl = HbciDownloader::new(&session);
    dl.download(HbciMode::PatchRom, &image).unwrap();
    assert_eq!(dl.state(), HbciState::Success(HbciMode::PatchRom));

    let sent = session.into_inner().unwrap().sent;
    let headers: Vec<&[u8]> = sent.iter().map(|f| &f[..4]).collect();
    assert_eq!(headers[0], &common::bytes("01 21 00 00")[..]);
    assert_eq!(headers[1], &common::bytes("03 23 00 00")[..]);
    assert_eq!(headers[2], &common::bytes("01 21 00 00")[..]);
    // three segments, header then body each
    assert_eq!(headers[3], &common::bytes("23 01 01 88")[..]);
    assert_eq!(sent[4].len(), 2049);
    assert_eq!(headers[5], &common::bytes("23 01 01 88")[..]);
    assert_eq!(headers[7], &common::bytes("23 01 0B 00")[..]);
    assert_eq!(sent[8].len(), 11);
    assert_eq!(headers[9], &common::bytes("21 01 00 00")[..]);
    assert_eq!(sent.len(), 10);
}

#[test]
fn hif_image_pauses_before_status_query() {
    let session = common::session(HbciBootloaderModel::default().into_mock());
    let mut dl = HbciDownloader::new(&session);
    dl.download(HbciMode::HifImage, &firmware_image(100)).unwrap();
    let mock = session.into_inner().unwrap();
    assert!(mock.now_ms >= 100);
    assert_eq!(mock.sent.last().unwrap(), &common::bytes("51 01 00 00"));
}

#[test]
fn image_rejection_is_decoded() {
    let model = HbciBootloaderModel {
        image_status: 0x8D,
        ..HbciBootloaderModel::default()
    };
    let session = common::session(model.into_mock());
    let mut dl = HbciDownloader::new(&session);
    assert!(matches!(
        dl.download(HbciMode::HifImage, &firmware_image(64)),
        Err(Error::HbciRejected(HbciFailure::HifImage(
            HifImageError::InvalidHeaderSignature
        )))
    ));
    assert_eq!(dl.state(), HbciState::Failed);

    let model = HbciBootloaderModel {
        image_status: 0x86,
        ..HbciBootloaderModel::default()
    };
    let session = common::session(model.into_mock());
    assert!(matches!(
        HbciDownloader::new(&session).download(HbciMode::PatchRom, &firmware_image(64)),
        Err(Error::HbciRejected(HbciFailure::PatchRom(
            PatchRomError::InvalidSignatureSize
        )))
    ));
}

#[test]
fn boot_failure_stops_before_mode_select() {
    let model = HbciBootloaderModel {
        boot_status: 0xD1,
        ..HbciBootloaderModel::default()
    };
    let session = common::session(model.into_mock());
    assert!(matches!(
        HbciDownloader::new(&session).download(HbciMode::PatchRom, &firmware_image(64)),
        Err(Error::HbciRejected(HbciFailure::BootAutoload))
    ));
    assert_eq!(session.into_inner().unwrap().sent.len(), 1);
}

#[test]
fn chip_id_query_is_acknowledged() {
    let session = common::session(HbciBootloaderModel::default().into_mock());
    let dl = HbciDownloader::new(&session);
    let id = dl.query_info(GeneralQuery::ChipId).unwrap();
    assert_eq!(id, vec![0xC1; 16]);
    let sent = session.into_inner().unwrap().sent;
    assert_eq!(sent[1], common::bytes("04 01 00 00"));
}
