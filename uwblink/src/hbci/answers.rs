// uwblink/src/hbci/answers.rs

use thiserror::Error;

use crate::hbci::{general, image};
use crate::types::HbciMode;

/// Why the device turned a download down.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HbciFailure {
    #[error("hbci interface failed")]
    HbciFail,
    #[error("boot autoload failed")]
    BootAutoload,
    #[error("boot GPIO configuration CRC failed")]
    BootGpioConfCrc,
    #[error("boot TRIM CRC failed")]
    BootTrimCrc,
    #[error("boot GPIO/TRIM CRC failed")]
    BootGpioTrimCrc,
    #[error("{0} mode could not be entered")]
    ModeFailed(HbciMode),
    #[error("IM4 image mode could not be entered")]
    Im4ModeFailed,
    #[error("unexpected general status {ins:#04x} (awaiting {awaiting:?})")]
    UnexpectedGeneralStatus {
        ins: u8,
        awaiting: Option<HbciMode>,
    },
    #[error("unknown general status {0:#04x}")]
    UnknownGeneralStatus(u8),
    #[error("patch rom rejected: {0}")]
    PatchRom(PatchRomError),
    #[error("hif image rejected: {0}")]
    HifImage(HifImageError),
    #[error("unknown {mode} status {ins:#04x}")]
    UnknownModeStatus { mode: HbciMode, ins: u8 },
    #[error("unknown answer class {0:#04x}")]
    UnknownClass(u8),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchRomError {
    #[error("file too large")]
    FileTooLarge,
    #[error("invalid patch file marker")]
    InvalidPatchFileMarker,
    #[error("too many patch table entries")]
    TooManyPatchTableEntries,
    #[error("invalid patch code size")]
    InvalidPatchCodeSize,
    #[error("invalid global patch marker")]
    InvalidGlobalPatchMarker,
    #[error("invalid signature size")]
    InvalidSignatureSize,
    #[error("invalid signature")]
    InvalidSignature,
}

impl PatchRomError {
    pub fn from_code(ins: u8) -> Option<Self> {
        use PatchRomError::*;
        Some(match ins {
            0x81 => FileTooLarge,
            0x82 => InvalidPatchFileMarker,
            0x83 => TooManyPatchTableEntries,
            0x84 => InvalidPatchCodeSize,
            0x85 => InvalidGlobalPatchMarker,
            0x86 => InvalidSignatureSize,
            0x87 => InvalidSignature,
            _ => return None,
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HifImageError {
    #[error("header too large")]
    HeaderTooLarge,
    #[error("header parse error")]
    HeaderParseError,
    #[error("invalid cipher type (crypto)")]
    InvalidCipherTypeCrypto,
    #[error("invalid cipher type (mode)")]
    InvalidCipherTypeMode,
    #[error("invalid cipher type (hash)")]
    InvalidCipherTypeHash,
    #[error("invalid cipher type (curve)")]
    InvalidCipherTypeCurve,
    #[error("invalid ECC key length")]
    InvalidEccKeyLength,
    #[error("invalid payload description")]
    InvalidPayloadDescription,
    #[error("invalid firmware version")]
    InvalidFirmwareVersion,
    #[error("invalid ECID mask")]
    InvalidEcidMask,
    #[error("invalid ECID value")]
    InvalidEcidValue,
    #[error("invalid encrypted payload hash")]
    InvalidEncryptedPayloadHash,
    #[error("invalid header signature")]
    InvalidHeaderSignature,
    #[error("install settings too large")]
    InstallSettingsTooLarge,
    #[error("install settings parse error")]
    InstallSettingsParseError,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("quickboot settings parse error")]
    QuickbootSettingsParseError,
    #[error("invalid static hash")]
    InvalidStaticHash,
    #[error("invalid dynamic hash")]
    InvalidDynamicHash,
    #[error("execution settings parse error")]
    ExecutionSettingsParseError,
    #[error("key read error")]
    KeyReadError,
}

impl HifImageError {
    const BY_CODE: [HifImageError; 21] = [
        HifImageError::HeaderTooLarge,
        HifImageError::HeaderParseError,
        HifImageError::InvalidCipherTypeCrypto,
        HifImageError::InvalidCipherTypeMode,
        HifImageError::InvalidCipherTypeHash,
        HifImageError::InvalidCipherTypeCurve,
        HifImageError::InvalidEccKeyLength,
        HifImageError::InvalidPayloadDescription,
        HifImageError::InvalidFirmwareVersion,
        HifImageError::InvalidEcidMask,
        HifImageError::InvalidEcidValue,
        HifImageError::InvalidEncryptedPayloadHash,
        HifImageError::InvalidHeaderSignature,
        HifImageError::InstallSettingsTooLarge,
        HifImageError::InstallSettingsParseError,
        HifImageError::PayloadTooLarge,
        HifImageError::QuickbootSettingsParseError,
        HifImageError::InvalidStaticHash,
        HifImageError::InvalidDynamicHash,
        HifImageError::ExecutionSettingsParseError,
        HifImageError::KeyReadError,
    ];

    /// Failure codes run contiguously from 0x81.
    pub fn from_code(ins: u8) -> Option<Self> {
        let idx = ins.checked_sub(0x81)? as usize;
        Self::BY_CODE.get(idx).copied()
    }
}

/// Interpret a `General | Answer` instruction. `awaiting` is `None` while
/// waiting for the bootloader itself, or the mode just selected.
pub fn check_general_answer(ins: u8, awaiting: Option<HbciMode>) -> Result<(), HbciFailure> {
    let unexpected = HbciFailure::UnexpectedGeneralStatus { ins, awaiting };
    match ins {
        general::ANS_HBCI_READY => awaiting.map_or(Ok(()), |_| Err(unexpected)),
        general::ANS_MODE_PATCH_ROM_READY | general::ANS_MODE_HIF_IMAGE_READY => match awaiting {
            Some(mode) if mode.ready_answer() == ins => Ok(()),
            _ => Err(unexpected),
        },
        general::ANS_MODE_IM4_IMAGE_READY | general::ANS_BOOT_SUCCESS => Err(unexpected),
        general::ANS_HBCI_FAIL => Err(HbciFailure::HbciFail),
        general::ANS_BOOT_AUTOLOAD_FAIL => Err(HbciFailure::BootAutoload),
        general::ANS_BOOT_GPIOCONF_CRC_FAIL => Err(HbciFailure::BootGpioConfCrc),
        general::ANS_BOOT_TRIM_CRC_FAIL => Err(HbciFailure::BootTrimCrc),
        general::ANS_BOOT_GPIOTRIM_CRC_FAIL => Err(HbciFailure::BootGpioTrimCrc),
        general::ANS_MODE_PATCH_ROM_FAIL => Err(HbciFailure::ModeFailed(HbciMode::PatchRom)),
        general::ANS_MODE_HIF_IMAGE_FAIL => Err(HbciFailure::ModeFailed(HbciMode::HifImage)),
        general::ANS_MODE_IM4_IMAGE_FAIL => Err(HbciFailure::Im4ModeFailed),
        other => Err(HbciFailure::UnknownGeneralStatus(other)),
    }
}

/// Interpret the answer to a mode status query.
pub fn check_mode_answer(mode: HbciMode, ins: u8) -> Result<(), HbciFailure> {
    if ins == image::ANS_SUCCESS {
        return Ok(());
    }
    let known = match mode {
        HbciMode::PatchRom => PatchRomError::from_code(ins).map(HbciFailure::PatchRom),
        HbciMode::HifImage => HifImageError::from_code(ins).map(HbciFailure::HifImage),
    };
    Err(known.unwrap_or(HbciFailure::UnknownModeStatus { mode, ins }))
}
