//! Dry run of a complete SWUP update against the simulated device.
//!
//! Usage:
//!   RUST_LOG=info cargo run -p uwblink --example swup_dry_run [segments]

use anyhow::Context;
use uwblink::constants::{RCI_BLOCK_LEN, SWUP_MANIFEST_LEN, SWUP_SEGMENT_LEN};
use uwblink::prelude::*;
use uwblink::test_support::SwupDeviceModel;
use uwblink::transport::MockTransport;
use uwblink::uci;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let segments: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("segment count must be a number")?,
        None => 8,
    };
    let package: Vec<u8> = (0..SWUP_MANIFEST_LEN + segments * SWUP_SEGMENT_LEN)
        .map(|i| (i % 253) as u8)
        .collect();
    let package = SwupPackage::new(&package)?;

    // UCI frames get the enable-swup answer, RCI blocks go to the bootloader
    let mut device = SwupDeviceModel::active();
    let mut mock = MockTransport::new().with_responder(move |frame| {
        if frame.len() == RCI_BLOCK_LEN {
            device.respond(frame)
        } else {
            vec![vec![0x4E, 0x12, 0x00, 0x01, 0x00]]
        }
    });
    mock.push_response(vec![0x60, 0x01, 0x00, 0x01, 0x01]);
    let session = LinkSession::new(mock);

    uci::await_device_ready(&session).context("waiting for boot notification")?;
    uci::activate_swup(&session).context("switching to SWUP")?;
    session.switch_protocol()?;

    let mut updater = SwupUpdater::new(SwupClient::new(&session));
    let outcome = updater.update(&package).context("swup update")?;

    let mock = session.into_inner()?;
    println!(
        "Update finished: status={:?} reinterpreted={} state={}",
        outcome.finish_status, outcome.reinterpreted, outcome.final_state
    );
    println!(
        "{} frames sent, {} ms simulated",
        mock.sent.len(),
        mock.now_ms
    );
    Ok(())
}
