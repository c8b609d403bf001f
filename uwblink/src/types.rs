// uwblink/src/types.rs

use derive_more::From;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handshake line identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Device ready to receive.
    Ready,
    /// Device has data for the host.
    Irq,
}

/// Electrical level of a handshake line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    /// Both lines are active-low.
    pub fn is_asserted(self) -> bool {
        self == Level::Low
    }
}

/// Result of a bounded edge wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWait {
    Signaled,
    TimedOut,
}

/// Device state reported inside every SWUP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SwupDeviceState {
    Error,
    Init,
    Active,
    Transfer,
    /// A value outside the documented set, kept raw for diagnostics.
    Other(u32),
}

impl From<u32> for SwupDeviceState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => SwupDeviceState::Error,
            1 => SwupDeviceState::Init,
            2 => SwupDeviceState::Active,
            3 => SwupDeviceState::Transfer,
            other => SwupDeviceState::Other(other),
        }
    }
}

impl fmt::Display for SwupDeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwupDeviceState::Error => f.write_str("ERROR"),
            SwupDeviceState::Init => f.write_str("INIT"),
            SwupDeviceState::Active => f.write_str("ACTIVE"),
            SwupDeviceState::Transfer => f.write_str("TRANSFER"),
            SwupDeviceState::Other(raw) => write!(f, "UNKNOWN({:#x})", raw),
        }
    }
}

/// Raw SWUP status word (`u32`, little-endian on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwupStatus(pub u32);

impl SwupStatus {
    pub const SUCCESS: Self = Self(0x0000_0000);
    pub const VERIFICATION_FAILED: Self = Self(0x0000_007D);
    pub const PARAMETER_ERROR: Self = Self(0x0000_00F0);
    pub const LENGTH_ERROR: Self = Self(0x0000_00F1);
    pub const ACCESS_DENIED: Self = Self(0x0000_00F2);
    pub const INCOMPLETE_TRANSFER: Self = Self(0x0000_00F7);
    pub const CRC_ERROR: Self = Self(0x0000_00F8);
    pub const HEADER_ERROR: Self = Self(0x0000_00F9);
    pub const UNKNOWN_COMMAND: Self = Self(0x0000_00FA);
    pub const NOT_IMPLEMENTED: Self = Self(0x0000_00FE);
    pub const GENERIC_ERROR: Self = Self(0xFFFF_FFFF);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Human-readable description of the status word.
    pub fn description(self) -> &'static str {
        match self {
            Self::SUCCESS => "command executed successfully",
            Self::VERIFICATION_FAILED => "verification of the transferred image failed",
            Self::PARAMETER_ERROR => "invalid parameter in command",
            Self::LENGTH_ERROR => "invalid command length",
            Self::ACCESS_DENIED => "command not allowed in the current device state",
            Self::INCOMPLETE_TRANSFER => "not all segments were transferred",
            Self::CRC_ERROR => "frame CRC check failed",
            Self::HEADER_ERROR => "invalid frame header",
            Self::UNKNOWN_COMMAND => "unknown command",
            Self::NOT_IMPLEMENTED => "command not implemented",
            Self::GENERIC_ERROR => "generic error",
            _ => "unknown status",
        }
    }
}

impl fmt::Display for SwupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} ({})", self.0, self.description())
    }
}

/// Key family the host expects the device to be provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyVersion {
    /// No type-check enforcement.
    #[default]
    Unknown,
    /// Engineering samples, key `ENGvZ20_05`.
    EngineeringZ20_05,
    /// Production silicon, key `PRODvA20_06`.
    ProductionA20_06,
}

impl KeyVersion {
    /// Numeric identifier used in release tooling.
    pub fn raw(self) -> u32 {
        match self {
            KeyVersion::Unknown => 0,
            KeyVersion::EngineeringZ20_05 => 0x0E0_2005,
            KeyVersion::ProductionA20_06 => 0x0A_0206,
        }
    }

    /// Whether a device reporting `type_check` in its type-check id may
    /// receive a package signed for this key family.
    pub fn accepts(self, type_check: u8) -> bool {
        match self {
            KeyVersion::Unknown => true,
            KeyVersion::EngineeringZ20_05 => matches!(type_check, 0x0B | 0x0C),
            KeyVersion::ProductionA20_06 => type_check == b'S',
        }
    }
}

/// First segment number of a component transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SegmentNumbering {
    ZeroBased,
    OneBased,
    /// Derive from the reported SWUP version.
    #[default]
    Auto,
}

impl SegmentNumbering {
    /// Resolve the first segment number for a device.
    pub fn first_segment(self, info: &DeviceInfo) -> u16 {
        match self {
            SegmentNumbering::ZeroBased => 0,
            SegmentNumbering::OneBased => 1,
            SegmentNumbering::Auto => {
                // older engineering silicon numbers segments from one
                if info.swup_version[4] < 40 && info.swup_version[6] == 0x04 {
                    1
                } else {
                    0
                }
            }
        }
    }
}

/// Record returned by `GetDeviceInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceInfo {
    pub product_id: [u8; 8],
    pub hardware_id: u32,
    pub type_check_id: [u8; 8],
    pub rom_id: [u8; 8],
    pub swup_version: [u8; 8],
}

impl DeviceInfo {
    /// Byte compared against the key version policy.
    pub fn type_check(&self) -> u8 {
        self.type_check_id[crate::constants::SWUP_TYPE_CHECK_INDEX]
    }
}

/// Record returned by `ReadDeviceId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceId {
    pub wafer_id: [u8; 11],
    pub wafer_number: u8,
    pub wafer_x: u16,
    pub wafer_y: u16,
    pub serial_number: u32,
}

/// HBCI download mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HbciMode {
    PatchRom,
    HifImage,
}

impl fmt::Display for HbciMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HbciMode::PatchRom => f.write_str("patch-rom"),
            HbciMode::HifImage => f.write_str("hif-image"),
        }
    }
}
