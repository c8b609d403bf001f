//! HBCI download configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::HBCI_MAX_MOSI_CHUNK;

/// Longest wait for an answer APDU (ms)
pub const TURNAROUND_CEILING_MS: u64 = 10_000;

/// Pause between a HIF image download and its status query (ms)
pub const HIF_SETTLE_MS: u64 = 100;

/// Re-queries after an answer fails its LRC
pub const CHECKSUM_RESENDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HbciConfig {
    pub chunk_size: usize,
    pub turnaround_ceiling_ms: u64,
    pub hif_settle_ms: u64,
    pub checksum_resends: usize,
}

impl Default for HbciConfig {
    fn default() -> Self {
        Self {
            chunk_size: HBCI_MAX_MOSI_CHUNK,
            turnaround_ceiling_ms: TURNAROUND_CEILING_MS,
            hif_settle_ms: HIF_SETTLE_MS,
            checksum_resends: CHECKSUM_RESENDS,
        }
    }
}
