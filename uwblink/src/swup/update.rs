// uwblink/src/swup/update.rs

use std::slice::ChunksExact;

use log::{error, info, warn};

use crate::constants::{SWUP_MANIFEST_CHUNKS, SWUP_MANIFEST_LEN, SWUP_SEGMENT_LEN};
use crate::swup::client::{SwupClient, SwupResponse};
use crate::transport::traits::SpiHandshakeTransport;
use crate::types::{SwupDeviceState, SwupStatus};
use crate::utils::Hex;
use crate::{Error, Result};

/// Components are addressed by index; current packages carry one.
const COMPONENT_INDEX: u8 = 0;

/// A SWUP package: a 512-byte manifest followed by 128-byte component
/// segments.
#[derive(Debug, Clone, Copy)]
pub struct SwupPackage<'a> {
    bytes: &'a [u8],
}

impl<'a> SwupPackage<'a> {
    /// Validate the package shape before any I/O.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < SWUP_MANIFEST_LEN {
            return Err(Error::InvalidPackage(format!(
                "{} bytes is shorter than the {}-byte manifest",
                bytes.len(),
                SWUP_MANIFEST_LEN
            )));
        }
        let components = bytes.len() - SWUP_MANIFEST_LEN;
        if components == 0 || components % SWUP_SEGMENT_LEN != 0 {
            return Err(Error::InvalidPackage(format!(
                "component area of {} bytes is not a non-empty multiple of {}",
                components, SWUP_SEGMENT_LEN
            )));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn manifest_chunks(&self) -> ChunksExact<'a, u8> {
        self.bytes[..SWUP_MANIFEST_LEN].chunks_exact(SWUP_SEGMENT_LEN)
    }

    pub fn segments(&self) -> ChunksExact<'a, u8> {
        self.bytes[SWUP_MANIFEST_LEN..].chunks_exact(SWUP_SEGMENT_LEN)
    }

    pub fn segment_count(&self) -> usize {
        (self.bytes.len() - SWUP_MANIFEST_LEN) / SWUP_SEGMENT_LEN
    }
}

/// How a completed update ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Raw `FinishUpdate` status; `None` when the device left `Transfer`
    /// after `VerifyAll` and no finish was sent.
    pub finish_status: Option<SwupStatus>,
    /// `FinishUpdate` looked like a failure (generic error, or no answer
    /// because the device reset) and was counted as success.
    pub reinterpreted: bool,
    pub final_state: SwupDeviceState,
}

/// Drives a package through the device's SWUP state machine. Every step
/// trusts the state the device reports back, not local bookkeeping.
pub struct SwupUpdater<'a, P> {
    client: SwupClient<'a, P>,
    last_state: Option<SwupDeviceState>,
}

impl<'a, P: SpiHandshakeTransport> SwupUpdater<'a, P> {
    pub fn new(client: SwupClient<'a, P>) -> Self {
        Self {
            client,
            last_state: None,
        }
    }

    pub fn client(&self) -> &SwupClient<'a, P> {
        &self.client
    }

    /// State reported by the most recent response, if any.
    pub fn last_state(&self) -> Option<SwupDeviceState> {
        self.last_state
    }

    /// Record the reported state and reject non-success statuses.
    fn observe<T>(&mut self, response: SwupResponse<T>) -> Result<SwupResponse<T>> {
        self.last_state = Some(response.state);
        response.ensure_success()
    }

    fn expect_state<T>(
        &mut self,
        step: &'static str,
        response: SwupResponse<T>,
        expected: SwupDeviceState,
    ) -> Result<SwupResponse<T>> {
        let response = self.observe(response)?;
        if response.state != expected {
            return Err(Error::UnexpectedState {
                step,
                expected,
                actual: response.state,
            });
        }
        Ok(response)
    }

    /// Identify the device, then run [`execute`](Self::execute).
    pub fn update(&mut self, package: &SwupPackage<'_>) -> Result<UpdateOutcome> {
        let info = self.client.get_device_info()?;
        self.last_state = Some(info.state);
        let info = info.body;
        info!(
            "device: product={} hardware={:#010x} type_check={} rom={} swup={}",
            Hex(&info.product_id),
            info.hardware_id,
            Hex(&info.type_check_id),
            Hex(&info.rom_id),
            Hex(&info.swup_version)
        );
        let id = self.client.read_device_id()?.body;
        info!(
            "wafer {} #{} at ({:#06x}, {:#06x}), serial {:#010x}",
            Hex(&id.wafer_id),
            id.wafer_number,
            id.wafer_x,
            id.wafer_y,
            id.serial_number
        );
        self.execute(package)
    }

    /// Run the update from whatever state the device reports: from
    /// `Active` the manifest is sent first, from `Transfer` the component
    /// transfer resumes directly.
    pub fn execute(&mut self, package: &SwupPackage<'_>) -> Result<UpdateOutcome> {
        let r = self.run(package);
        match &r {
            Ok(outcome) => info!(
                "swup update complete, device state {}",
                outcome.final_state
            ),
            Err(e) => match self.last_state {
                Some(state) => error!("swup update aborted in state {}: {}", state, e),
                None => error!("swup update aborted: {}", e),
            },
        }
        r
    }

    fn run(&mut self, package: &SwupPackage<'_>) -> Result<UpdateOutcome> {
        let config = *self.client.config();
        let info = self.client.get_device_info()?;
        let info = self.observe(info)?;

        let type_check = info.body.type_check();
        if !config.key_version.accepts(type_check) {
            return Err(Error::KeyVersionMismatch {
                key: config.key_version,
                type_check,
            });
        }
        let first_segment = config.segment_numbering.first_segment(&info.body);

        match info.state {
            SwupDeviceState::Active => self.send_manifest(package)?,
            SwupDeviceState::Transfer => {
                info!("device already in transfer, resuming component transfer")
            }
            other => {
                return Err(Error::UnexpectedState {
                    step: "GetDeviceInfo",
                    expected: SwupDeviceState::Active,
                    actual: other,
                });
            }
        }

        self.send_components(package, first_segment)?;

        let verified = self.client.verify_all()?;
        let verified = self.observe(verified)?;
        info!("VerifyAll passed");
        if verified.state != SwupDeviceState::Transfer {
            warn!(
                "device left transfer after VerifyAll ({}), not finishing",
                verified.state
            );
            return Ok(UpdateOutcome {
                finish_status: None,
                reinterpreted: false,
                final_state: verified.state,
            });
        }
        self.finish()
    }

    fn send_manifest(&mut self, package: &SwupPackage<'_>) -> Result<()> {
        let cleared = self.client.clear_ram_manifest()?;
        self.expect_state("ClearRamManifest", cleared, SwupDeviceState::Active)?;

        for (index, chunk) in package.manifest_chunks().enumerate() {
            let r = self.client.transfer_manifest(index as u8, chunk)?;
            self.expect_state("TransferManifest", r, SwupDeviceState::Active)?;
        }
        info!("manifest transferred ({} chunks)", SWUP_MANIFEST_CHUNKS);

        let started = self.client.start_update()?;
        self.expect_state("StartUpdate", started, SwupDeviceState::Transfer)?;
        Ok(())
    }

    fn send_components(&mut self, package: &SwupPackage<'_>, first_segment: u16) -> Result<()> {
        let count = package.segment_count();
        info!(
            "transferring {} segments starting at #{}",
            count, first_segment
        );
        for (segment, chunk) in (first_segment..).zip(package.segments()) {
            let r = self
                .client
                .transfer_component(COMPONENT_INDEX, segment, chunk)?;
            self.expect_state("TransferComponent", r, SwupDeviceState::Transfer)?;
        }
        info!("component transfer complete");
        Ok(())
    }

    fn finish(&mut self) -> Result<UpdateOutcome> {
        match self.client.finish_update() {
            Ok(r) if r.status.is_success() => {
                self.last_state = Some(r.state);
                Ok(UpdateOutcome {
                    finish_status: Some(r.status),
                    reinterpreted: false,
                    final_state: r.state,
                })
            }
            Ok(r) if r.status == SwupStatus::GENERIC_ERROR => {
                self.last_state = Some(r.state);
                info!("FinishUpdate reported generic error, device is resetting");
                Ok(UpdateOutcome {
                    finish_status: Some(r.status),
                    reinterpreted: true,
                    final_state: r.state,
                })
            }
            Ok(r) => {
                warn!("FinishUpdate returned {}", r.status);
                self.last_state = Some(r.state);
                Err(Error::DeviceReportedFailure {
                    status: r.status,
                    state: r.state,
                })
            }
            Err(Error::TransportTimeout { stage }) => {
                info!(
                    "no FinishUpdate response ({}), device is resetting",
                    stage
                );
                Ok(UpdateOutcome {
                    finish_status: Some(SwupStatus::GENERIC_ERROR),
                    reinterpreted: true,
                    final_state: self.last_state.unwrap_or(SwupDeviceState::Transfer),
                })
            }
            Err(e) => Err(e),
        }
    }
}
