// uwblink/src/prelude.rs

pub use crate::hbci::{GeneralQuery, HbciConfig, HbciDownloader, HbciFailure, HbciState};
pub use crate::link::{LinkConfig, LinkSession};
pub use crate::swup::{SwupClient, SwupConfig, SwupPackage, SwupUpdater, UpdateOutcome};
pub use crate::transport::{Delay, HandshakeLines, SpiBus, SpiHandshakeTransport};
pub use crate::uci::{UciCapabilities, UciDeviceInfo};
pub use crate::{
    DeviceId, DeviceInfo, Error, HbciMode, KeyVersion, Result, SegmentNumbering, SwupDeviceState,
    SwupStatus,
};

// Re-export small utilities for convenience
pub use crate::utils::{Hex, bytes_to_hex_spaced, ms};
