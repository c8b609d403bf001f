//! Test support helpers intended for use by unit and integration tests.
//!
//! Device models here plug into [`MockTransport`] as responders, so tests
//! across the crate and the tests/ directory drive the engines against the
//! same simulated SWUP and HBCI firmware.
#![allow(dead_code)]

use crate::constants::{
    HBCI_HEADER_LEN, HBCI_LEN_MASK, HBCI_SEGMENT_FLAG, SWUP_COMMAND, SWUP_SUB_CLEAR_RAM_MANIFEST,
    SWUP_SUB_FINISH_UPDATE, SWUP_SUB_GET_DEVICE_INFO, SWUP_SUB_READ_DEVICE_ID,
    SWUP_SUB_START_UPDATE, SWUP_SUB_TRANSFER_COMPONENT, SWUP_SUB_TRANSFER_MANIFEST,
    SWUP_SUB_VERIFY_ALL, SWUP_SUB_VERIFY_COMPONENT,
};
use crate::protocol::hbci::build_hbci_apdu;
use crate::protocol::rci::{build_rci_block, parse_rci_slice};
use crate::transport::mock::MockTransport;

const STATE_INIT: u32 = 1;
const STATE_ACTIVE: u32 = 2;
const STATE_TRANSFER: u32 = 3;
const STATUS_ACCESS_DENIED: u32 = 0xF2;

/// Build a SWUP response block: `[status][state][extra]` in RCI framing.
#[doc(hidden)]
pub fn swup_response_block(subcmd: u8, status: u32, state: u32, extra: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + extra.len());
    data.extend_from_slice(&status.to_le_bytes());
    data.extend_from_slice(&state.to_le_bytes());
    data.extend_from_slice(extra);
    build_rci_block(SWUP_COMMAND, subcmd, &data)
        .map(|b| b.to_vec())
        .unwrap_or_default()
}

/// Simulated SWUP bootloader. Commands issued in the wrong state are
/// answered with `ACCESS_DENIED`.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct SwupDeviceModel {
    pub state: u32,
    pub product_id: [u8; 8],
    pub hardware_id: u32,
    pub type_check_id: [u8; 8],
    pub rom_id: [u8; 8],
    pub swup_version: [u8; 8],
    /// Answer this sub-command with the given status instead.
    pub fail_on: Option<(u8, u32)>,
    /// Status returned by `FinishUpdate`; `None` resets without answering.
    pub finish_status: Option<u32>,
}

impl SwupDeviceModel {
    /// Production device sitting in `Active`.
    pub fn active() -> Self {
        Self {
            state: STATE_ACTIVE,
            product_id: *b"SR040\0\0\0",
            hardware_id: 0x0004_0201,
            type_check_id: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, b'S', 0x00],
            rom_id: [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80],
            swup_version: [0x00, 0x01, 0x00, 0x00, 41, 0x00, 0x00, 0x00],
            fail_on: None,
            finish_status: Some(0),
        }
    }

    fn info_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&self.product_id);
        out.extend_from_slice(&self.hardware_id.to_le_bytes());
        out.extend_from_slice(&self.type_check_id);
        out.extend_from_slice(&self.rom_id);
        out.extend_from_slice(&self.swup_version);
        out
    }

    fn id_bytes(&self) -> Vec<u8> {
        let mut out = b"WAFER-0042\0".to_vec();
        out.push(7);
        out.extend_from_slice(&0x0102u16.to_le_bytes());
        out.extend_from_slice(&0x0304u16.to_le_bytes());
        out.extend_from_slice(&0xCAFE_0001u32.to_le_bytes());
        out
    }

    fn allowed(&self, subcmd: u8) -> bool {
        match subcmd {
            SWUP_SUB_CLEAR_RAM_MANIFEST | SWUP_SUB_TRANSFER_MANIFEST | SWUP_SUB_START_UPDATE => {
                self.state == STATE_ACTIVE
            }
            SWUP_SUB_TRANSFER_COMPONENT
            | SWUP_SUB_VERIFY_COMPONENT
            | SWUP_SUB_VERIFY_ALL
            | SWUP_SUB_FINISH_UPDATE => self.state == STATE_TRANSFER,
            _ => true,
        }
    }

    /// Reply to one received frame.
    pub fn respond(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        let Ok(req) = parse_rci_slice(frame) else {
            return Vec::new();
        };
        let sub = req.subcmd;
        if let Some((failing, status)) = self.fail_on {
            if failing == sub {
                return vec![swup_response_block(sub, status, self.state, &[])];
            }
        }
        if !self.allowed(sub) {
            return vec![swup_response_block(sub, STATUS_ACCESS_DENIED, self.state, &[])];
        }
        let extra = match sub {
            SWUP_SUB_GET_DEVICE_INFO => self.info_bytes(),
            SWUP_SUB_READ_DEVICE_ID => self.id_bytes(),
            SWUP_SUB_START_UPDATE => {
                self.state = STATE_TRANSFER;
                Vec::new()
            }
            SWUP_SUB_FINISH_UPDATE => {
                self.state = STATE_INIT;
                return match self.finish_status {
                    Some(status) => vec![swup_response_block(sub, status, self.state, &[])],
                    None => Vec::new(),
                };
            }
            _ => Vec::new(),
        };
        vec![swup_response_block(sub, 0, self.state, &extra)]
    }

    pub fn into_mock(mut self) -> MockTransport {
        MockTransport::new().with_responder(move |f| self.respond(f))
    }
}

/// Simulated HBCI bootloader accepting either download mode.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct HbciBootloaderModel {
    /// General status answered before a mode is selected.
    pub boot_status: u8,
    /// Answer instruction to the mode status query after the download.
    pub image_status: u8,
    pub chip_id: [u8; 16],
    pub selected: Option<u8>,
    pub expect_body: bool,
}

impl Default for HbciBootloaderModel {
    fn default() -> Self {
        Self {
            boot_status: 0x21,
            image_status: 0x01,
            chip_id: [0xC1; 16],
            selected: None,
            expect_body: false,
        }
    }
}

impl HbciBootloaderModel {
    fn header(cls: u8, ins: u8) -> Vec<u8> {
        vec![cls, ins, 0x00, 0x00]
    }

    fn ack() -> Vec<u8> {
        Self::header(0x04, 0x01)
    }

    pub fn respond(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        if self.expect_body {
            self.expect_body = false;
            return vec![Self::ack()];
        }
        if frame.len() < HBCI_HEADER_LEN {
            return Vec::new();
        }
        let (cls, ins) = (frame[0], frame[1]);
        let len = u16::from_le_bytes([frame[2], frame[3]]);
        match (cls, ins) {
            (0x01, 0x21) => {
                let status = self.selected.unwrap_or(self.boot_status);
                vec![Self::header(0x02, status)]
            }
            (0x01, 0x31) => {
                let answer = build_hbci_apdu(0x02, 0x31, &self.chip_id, false)
                    .map(|a| a.encode())
                    .unwrap_or_default();
                vec![answer]
            }
            (0x03, 0x23) | (0x03, 0x24) => {
                self.selected = Some(ins);
                vec![Self::ack()]
            }
            (0x23, 0x01) | (0x53, 0x01) => {
                self.expect_body = len & HBCI_LEN_MASK != 0 || len & HBCI_SEGMENT_FLAG != 0;
                vec![Self::ack()]
            }
            (0x21, 0x01) | (0x51, 0x01) => vec![Self::header(cls + 1, self.image_status)],
            (0x04, _) => vec![Self::ack()],
            _ => vec![Self::header(0x04, 0x82)],
        }
    }

    pub fn into_mock(mut self) -> MockTransport {
        MockTransport::new().with_responder(move |f| self.respond(f))
    }
}
