// uwblink/src/hbci/mod.rs
//! HBCI (host bootloader communication interface) firmware download.
//!
//! Requests and answers are APDUs addressed by a class byte (high nibble:
//! General / Patch-ROM / HIF-Image / IM4, low nibble: Query / Answer /
//! Command / Ack) and an instruction byte.

pub mod answers;
pub mod config;
pub mod download;

pub use answers::{HbciFailure, HifImageError, PatchRomError};
pub use config::HbciConfig;
pub use download::{GeneralQuery, HbciDownloader, HbciState};

use crate::types::HbciMode;

pub mod class {
    pub const GENERAL: u8 = 0x00;
    pub const PATCH_ROM: u8 = 0x20;
    pub const HIF_IMAGE: u8 = 0x50;
    pub const IM4_IMAGE: u8 = 0x60;
}

pub mod subclass {
    pub const QUERY: u8 = 0x01;
    pub const ANSWER: u8 = 0x02;
    pub const COMMAND: u8 = 0x03;
    pub const ACK: u8 = 0x04;
}

/// Instructions carried by `General | Ack` APDUs.
pub mod ack {
    pub const VALID_APDU: u8 = 0x01;
    pub const INVALID_LRC: u8 = 0x81;
    pub const INVALID_CLASS: u8 = 0x82;
    pub const INVALID_INSTRUCTION: u8 = 0x83;
    pub const INVALID_SEGMENT_LENGTH: u8 = 0x84;
}

/// General class instructions.
pub mod general {
    pub const QRY_STATUS: u8 = 0x21;
    pub const QRY_CHIP_ID: u8 = 0x31;
    pub const QRY_HELIOS_ID: u8 = 0x32;
    pub const QRY_CA_ROOT_PUB_KEY: u8 = 0x33;
    pub const QRY_NXP_PUB_KEY: u8 = 0x34;
    pub const QRY_ROM_VERSION: u8 = 0x35;

    pub const ANS_HBCI_READY: u8 = 0x21;
    pub const ANS_MODE_PATCH_ROM_READY: u8 = 0x23;
    pub const ANS_MODE_HIF_IMAGE_READY: u8 = 0x24;
    pub const ANS_MODE_IM4_IMAGE_READY: u8 = 0x25;
    pub const ANS_BOOT_SUCCESS: u8 = 0x41;
    pub const ANS_BOOT_AUTOLOAD_FAIL: u8 = 0xD1;
    pub const ANS_BOOT_GPIOCONF_CRC_FAIL: u8 = 0xD2;
    pub const ANS_BOOT_TRIM_CRC_FAIL: u8 = 0xD3;
    pub const ANS_BOOT_GPIOTRIM_CRC_FAIL: u8 = 0xD4;
    pub const ANS_HBCI_FAIL: u8 = 0xE1;
    pub const ANS_MODE_PATCH_ROM_FAIL: u8 = 0xE3;
    pub const ANS_MODE_HIF_IMAGE_FAIL: u8 = 0xE4;
    pub const ANS_MODE_IM4_IMAGE_FAIL: u8 = 0xE5;

    pub const CMD_MODE_PATCH_ROM: u8 = 0x23;
    pub const CMD_MODE_HIF_IMAGE: u8 = 0x24;
}

/// Patch-ROM and HIF-Image share these instruction values.
pub mod image {
    pub const QRY_STATUS: u8 = 0x01;
    pub const CMD_DOWNLOAD: u8 = 0x01;
    pub const ANS_SUCCESS: u8 = 0x01;
    pub const ANS_HIF_HEADER_SUCCESS: u8 = 0x04;
    pub const ANS_HIF_QUICKBOOT_SETTINGS_SUCCESS: u8 = 0x05;
    pub const ANS_HIF_EXECUTION_SETTINGS_SUCCESS: u8 = 0x06;
}

impl HbciMode {
    /// Class nibble of the mode's own APDUs.
    pub fn class(self) -> u8 {
        match self {
            HbciMode::PatchRom => class::PATCH_ROM,
            HbciMode::HifImage => class::HIF_IMAGE,
        }
    }

    /// General command instruction that selects the mode.
    pub fn select_instruction(self) -> u8 {
        match self {
            HbciMode::PatchRom => general::CMD_MODE_PATCH_ROM,
            HbciMode::HifImage => general::CMD_MODE_HIF_IMAGE,
        }
    }

    /// General answer instruction reporting the mode is ready.
    pub fn ready_answer(self) -> u8 {
        match self {
            HbciMode::PatchRom => general::ANS_MODE_PATCH_ROM_READY,
            HbciMode::HifImage => general::ANS_MODE_HIF_IMAGE_READY,
        }
    }
}
