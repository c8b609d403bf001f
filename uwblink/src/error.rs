// uwblink/src/error.rs

use thiserror::Error;

use crate::hbci::HbciFailure;
use crate::types::{KeyVersion, SwupDeviceState, SwupStatus};

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// A handshake line never reached the expected level before the
    /// backoff ceiling. Callers retry the whole command on this variant.
    #[error("transport timeout while waiting for {stage}")]
    TransportTimeout { stage: &'static str },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("protocol nack: cls={cls:#04x} ins={ins:#04x}")]
    ProtocolNack { cls: u8, ins: u8 },

    #[error("device is in low-power mode")]
    DeviceLowPower,

    #[error("device reported failure: status={status}, state={state}")]
    DeviceReportedFailure {
        status: SwupStatus,
        state: SwupDeviceState,
    },

    #[error("hbci download rejected: {0}")]
    HbciRejected(HbciFailure),

    #[error("unexpected device state after {step}: expected {expected}, got {actual}")]
    UnexpectedState {
        step: &'static str,
        expected: SwupDeviceState,
        actual: SwupDeviceState,
    },

    #[error("key version {key:?} does not accept type check {type_check:#04x}")]
    KeyVersionMismatch { key: KeyVersion, type_check: u8 },

    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("frame format error: {0}")]
    FrameFormat(String),

    #[error("unexpected response code: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("invalid update package: {0}")]
    InvalidPackage(String),

    #[error("link session lock poisoned")]
    SessionPoisoned,
}

impl Error {
    /// Errors after which re-issuing the same command may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransportTimeout { .. } | Error::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
