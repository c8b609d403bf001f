// uwblink/src/protocol/mod.rs

pub mod checksum;
pub mod hbci;
pub mod link;
pub mod parser;
pub mod rci;

pub use checksum::{crc16_xmodem, lrc8};
pub use hbci::{HbciApdu, build_hbci_apdu, parse_hbci_apdu, split_segments};
pub use link::{LinkFrame, build_link_header, parse_link_header};
pub use rci::{RciBlock, build_rci_block, parse_rci_block};
