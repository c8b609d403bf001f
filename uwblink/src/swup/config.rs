//! SWUP exchange defaults

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{KeyVersion, SegmentNumbering};

/// Elapsed-time ceiling for one SWUP write or response read (ms)
pub const TURNAROUND_CEILING_MS: u64 = 1000;

/// Extra reads attempted while no response block is available
pub const RESPONSE_RETRIES: usize = 9;

/// Pause between response read attempts (ms)
pub const RESPONSE_RETRY_DELAY_MS: u64 = 100;

/// Request resends after a response fails its CRC
pub const CHECKSUM_RESENDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwupConfig {
    pub turnaround_ceiling_ms: u64,
    pub response_retries: usize,
    pub response_retry_delay_ms: u64,
    pub checksum_resends: usize,
    pub segment_numbering: SegmentNumbering,
    pub key_version: KeyVersion,
}

impl Default for SwupConfig {
    fn default() -> Self {
        Self {
            turnaround_ceiling_ms: TURNAROUND_CEILING_MS,
            response_retries: RESPONSE_RETRIES,
            response_retry_delay_ms: RESPONSE_RETRY_DELAY_MS,
            checksum_resends: CHECKSUM_RESENDS,
            segment_numbering: SegmentNumbering::Auto,
            key_version: KeyVersion::Unknown,
        }
    }
}
