// uwblink/src/swup/client.rs

use log::{debug, info, warn};

use crate::constants::{
    RCI_BLOCK_LEN, SWUP_COMMAND, SWUP_DEVICE_ID_RESPONSE_LEN, SWUP_DEVICE_INFO_RESPONSE_LEN,
    SWUP_RESPONSE_PREFIX_LEN, SWUP_SEGMENT_LEN, SWUP_SUB_CLEAR_RAM_MANIFEST,
    SWUP_SUB_FINISH_UPDATE, SWUP_SUB_GET_DEVICE_INFO, SWUP_SUB_READ_DEVICE_ID,
    SWUP_SUB_START_UPDATE, SWUP_SUB_TRANSFER_COMPONENT, SWUP_SUB_TRANSFER_MANIFEST,
    SWUP_SUB_VERIFY_ALL, SWUP_SUB_VERIFY_COMPONENT, SWUP_TRANSFER_COMPONENT_LEN,
    SWUP_TRANSFER_MANIFEST_LEN,
};
use crate::link::LinkSession;
use crate::protocol::parser::{array_at, byte_at, le_u16_at, le_u32_at};
use crate::protocol::rci::{RciBlock, build_rci_block, parse_rci_slice};
use crate::swup::config::SwupConfig;
use crate::transport::traits::SpiHandshakeTransport;
use crate::types::{DeviceId, DeviceInfo, SwupDeviceState, SwupStatus};
use crate::{Error, Result};

/// Status pair every SWUP response starts with, plus the command's own
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwupResponse<T> {
    pub status: SwupStatus,
    pub state: SwupDeviceState,
    pub body: T,
}

impl<T> SwupResponse<T> {
    /// Turn a non-success status into [`Error::DeviceReportedFailure`].
    pub fn ensure_success(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::DeviceReportedFailure {
                status: self.status,
                state: self.state,
            })
        }
    }
}

pub(crate) fn command_name(subcmd: u8) -> &'static str {
    match subcmd {
        SWUP_SUB_TRANSFER_COMPONENT => "TransferComponent",
        SWUP_SUB_TRANSFER_MANIFEST => "TransferManifest",
        SWUP_SUB_VERIFY_COMPONENT => "VerifyComponent",
        SWUP_SUB_VERIFY_ALL => "VerifyAll",
        SWUP_SUB_FINISH_UPDATE => "FinishUpdate",
        SWUP_SUB_START_UPDATE => "StartUpdate",
        SWUP_SUB_CLEAR_RAM_MANIFEST => "ClearRamManifest",
        SWUP_SUB_GET_DEVICE_INFO => "GetDeviceInfo",
        SWUP_SUB_READ_DEVICE_ID => "ReadDeviceId",
        _ => "unknown",
    }
}

fn status_prefix(data: &[u8]) -> Result<(SwupStatus, SwupDeviceState)> {
    let status = SwupStatus(le_u32_at(data, 0)?);
    let state = SwupDeviceState::from(le_u32_at(data, 4)?);
    Ok((status, state))
}

fn expect_segment(chunk: &[u8]) -> Result<()> {
    if chunk.len() != SWUP_SEGMENT_LEN {
        return Err(Error::InvalidLength {
            expected: SWUP_SEGMENT_LEN,
            actual: chunk.len(),
        });
    }
    Ok(())
}

/// One method per SWUP command, each a single RCI request/response
/// exchange over the link session.
pub struct SwupClient<'a, P> {
    session: &'a LinkSession<P>,
    config: SwupConfig,
}

impl<'a, P: SpiHandshakeTransport> SwupClient<'a, P> {
    pub fn new(session: &'a LinkSession<P>) -> Self {
        Self::with_config(session, SwupConfig::default())
    }

    pub fn with_config(session: &'a LinkSession<P>, config: SwupConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &SwupConfig {
        &self.config
    }

    pub fn session(&self) -> &'a LinkSession<P> {
        self.session
    }

    /// Read one response block. While none is available the read is
    /// repeated `response_retries` times, `response_retry_delay_ms` apart.
    /// A device still computing and a glitching bus look the same here.
    fn read_response(&self) -> Result<Vec<u8>> {
        let mut retries = 0;
        loop {
            match self
                .session
                .read_block(RCI_BLOCK_LEN, self.config.turnaround_ceiling_ms)
            {
                Err(Error::TransportTimeout { stage }) if retries < self.config.response_retries => {
                    retries += 1;
                    debug!("no swup response ({}), retry {}", stage, retries);
                    let pause = self.config.response_retry_delay_ms;
                    self.session.with_platform(|p| p.delay_ms(pause))?;
                }
                other => return other,
            }
        }
    }

    /// Send a request and return its validated response block.
    fn exchange(&self, subcmd: u8, data: &[u8]) -> Result<RciBlock> {
        let request = build_rci_block(SWUP_COMMAND, subcmd, data)?;
        let mut resends = 0;
        loop {
            self.session
                .write_rci(&request, self.config.turnaround_ceiling_ms)?;
            let raw = self.read_response()?;
            match parse_rci_slice(&raw) {
                Ok(block) => {
                    if block.cmd != SWUP_COMMAND {
                        return Err(Error::UnexpectedResponse {
                            expected: SWUP_COMMAND,
                            actual: block.cmd,
                        });
                    }
                    if block.subcmd != subcmd {
                        return Err(Error::UnexpectedResponse {
                            expected: subcmd,
                            actual: block.subcmd,
                        });
                    }
                    return Ok(block);
                }
                Err(Error::ChecksumMismatch { expected, actual })
                    if resends < self.config.checksum_resends =>
                {
                    resends += 1;
                    warn!(
                        "{} response crc {:#06x} != {:#06x}, resending",
                        command_name(subcmd),
                        actual,
                        expected
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn command(&self, subcmd: u8, data: &[u8]) -> Result<SwupResponse<()>> {
        let block = self.exchange(subcmd, data)?;
        let (status, state) = status_prefix(&block.data)?;
        debug!(
            "{}: status={} state={}",
            command_name(subcmd),
            status,
            state
        );
        Ok(SwupResponse {
            status,
            state,
            body: (),
        })
    }

    /// Exchange a command whose response carries a fixed record; the
    /// record is only decoded once the status reports success.
    fn record<T>(
        &self,
        subcmd: u8,
        expected_len: u8,
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<SwupResponse<T>> {
        let block = self.exchange(subcmd, &[])?;
        let (status, state) = status_prefix(&block.data)?;
        SwupResponse {
            status,
            state,
            body: (),
        }
        .ensure_success()?;
        if block.data.len() != expected_len as usize {
            return Err(Error::InvalidLength {
                expected: expected_len as usize,
                actual: block.data.len(),
            });
        }
        let body = decode(&block.data[SWUP_RESPONSE_PREFIX_LEN..])?;
        Ok(SwupResponse {
            status,
            state,
            body,
        })
    }

    pub fn get_device_info(&self) -> Result<SwupResponse<DeviceInfo>> {
        info!("GetDeviceInfo");
        self.record(SWUP_SUB_GET_DEVICE_INFO, SWUP_DEVICE_INFO_RESPONSE_LEN, |d| {
            Ok(DeviceInfo {
                product_id: array_at(d, 0)?,
                hardware_id: le_u32_at(d, 8)?,
                type_check_id: array_at(d, 12)?,
                rom_id: array_at(d, 20)?,
                swup_version: array_at(d, 28)?,
            })
        })
    }

    pub fn read_device_id(&self) -> Result<SwupResponse<DeviceId>> {
        info!("ReadDeviceId");
        self.record(SWUP_SUB_READ_DEVICE_ID, SWUP_DEVICE_ID_RESPONSE_LEN, |d| {
            Ok(DeviceId {
                wafer_id: array_at(d, 0)?,
                wafer_number: byte_at(d, 11)?,
                wafer_x: le_u16_at(d, 12)?,
                wafer_y: le_u16_at(d, 14)?,
                serial_number: le_u32_at(d, 16)?,
            })
        })
    }

    pub fn clear_ram_manifest(&self) -> Result<SwupResponse<()>> {
        info!("ClearRamManifest");
        self.command(SWUP_SUB_CLEAR_RAM_MANIFEST, &[])
    }

    /// Send manifest chunk `index` (128 bytes).
    pub fn transfer_manifest(&self, index: u8, chunk: &[u8]) -> Result<SwupResponse<()>> {
        expect_segment(chunk)?;
        info!("TransferManifest #{}", index);
        let mut data = Vec::with_capacity(SWUP_TRANSFER_MANIFEST_LEN);
        data.push(index);
        data.extend_from_slice(chunk);
        self.command(SWUP_SUB_TRANSFER_MANIFEST, &data)
    }

    pub fn start_update(&self) -> Result<SwupResponse<()>> {
        info!("StartUpdate");
        self.command(SWUP_SUB_START_UPDATE, &[])
    }

    /// Send one 128-byte segment of a component.
    pub fn transfer_component(
        &self,
        component: u8,
        segment: u16,
        chunk: &[u8],
    ) -> Result<SwupResponse<()>> {
        expect_segment(chunk)?;
        debug!("TransferComponent #{}", segment);
        let mut data = Vec::with_capacity(SWUP_TRANSFER_COMPONENT_LEN);
        data.push(component);
        data.extend_from_slice(&segment.to_le_bytes());
        data.extend_from_slice(chunk);
        self.command(SWUP_SUB_TRANSFER_COMPONENT, &data)
    }

    pub fn verify_component(&self, component: u8) -> Result<SwupResponse<()>> {
        info!("VerifyComponent #{}", component);
        self.command(SWUP_SUB_VERIFY_COMPONENT, &[component])
    }

    pub fn verify_all(&self) -> Result<SwupResponse<()>> {
        info!("VerifyAll");
        self.command(SWUP_SUB_VERIFY_ALL, &[])
    }

    /// The device resets once this succeeds, so the response may never
    /// arrive.
    pub fn finish_update(&self) -> Result<SwupResponse<()>> {
        info!("FinishUpdate");
        self.command(SWUP_SUB_FINISH_UPDATE, &[])
    }
}
