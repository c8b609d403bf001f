//! Link session timing defaults

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_COMMAND_PAYLOAD_LEN, MAX_RESPONSE_PAYLOAD_LEN};

/// Elapsed-time ceiling for one handshake phase (ms)
pub const BACKOFF_CEILING_MS: u64 = 200;

/// Longest single backoff sleep (ms)
pub const MAX_BACKOFF_DELAY_MS: u64 = 50;

/// Upper bound of one edge wait (ms)
pub const EDGE_WAIT_MS: u64 = 100;

/// Settle time before re-checking irq after its edge (ms)
pub const IRQ_RECHECK_DELAY_MS: u64 = 1;

/// Polls (1 ms apart) for irq release before giving up on it
pub const IRQ_DEASSERT_POLLS: usize = 200;

/// Bytes discarded when switching the device from UCI to RCI framing
pub const PROTOCOL_SWITCH_FLUSH_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    pub backoff_ceiling_ms: u64,
    pub edge_wait_ms: u64,
    pub irq_recheck_delay_ms: u64,
    pub irq_deassert_polls: usize,
    pub max_command_payload: usize,
    pub max_response_payload: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            backoff_ceiling_ms: BACKOFF_CEILING_MS,
            edge_wait_ms: EDGE_WAIT_MS,
            irq_recheck_delay_ms: IRQ_RECHECK_DELAY_MS,
            irq_deassert_polls: IRQ_DEASSERT_POLLS,
            max_command_payload: MAX_COMMAND_PAYLOAD_LEN,
            max_response_payload: MAX_RESPONSE_PAYLOAD_LEN,
        }
    }
}
