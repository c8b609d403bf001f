// Shared helpers for the integration test crates. Each aggregated file
// pulls this in with `#[path = "../common/mod.rs"]`, so not every crate
// uses every helper.
#![allow(dead_code)]

pub mod fixtures;

use uwblink::link::LinkSession;
use uwblink::transport::MockTransport;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Decode a hex literal such as `"60 01 00 01 01"`.
pub fn bytes(s: &str) -> Vec<u8> {
    let compact: String = s.split_whitespace().collect();
    hex::decode(compact).expect("valid hex literal")
}

pub fn session(mock: MockTransport) -> LinkSession<MockTransport> {
    init_logger();
    LinkSession::new(mock)
}
