// uwblink/src/uci.rs
//! The few UCI exchanges needed around an update: waiting for the boot
//! notification, switching the device into its SWUP bootloader, and
//! reading core device information and capabilities.

use std::fmt;

use log::{debug, info, warn};

use crate::constants::{
    LINK_HEADER_LEN, UCI_CORE_CAPS_CMD, UCI_CORE_CAPS_RSP_LEN, UCI_CORE_DEVICE_INFO_CMD,
    UCI_DEVICE_READY_NTF, UCI_DEVICE_STATE_HPD, UCI_ENABLE_SWUP_CMD,
};
use crate::link::LinkSession;
use crate::protocol::parser::{byte_at, slice_at};
use crate::transport::traits::SpiHandshakeTransport;
use crate::utils::Hex;
use crate::{Error, Result};

/// Parameter tags of `CORE_GET_DEVICE_INFO`.
pub mod info_tag {
    pub const MIDDLEWARE_VERSION: u8 = 0xA0;
    pub const DEVICE_NAME: u8 = 0xE3;
    pub const FIRMWARE_VERSION: u8 = 0xE4;
    pub const DEVICE_VERSION: u8 = 0xE5;
    pub const SERIAL_NUMBER: u8 = 0xE6;
    pub const DSP_VERSION: u8 = 0xE7;
    pub const RANGER4_VERSION: u8 = 0xE8;
    pub const CCC_VERSION: u8 = 0xE9;
}

/// Parameter tags of `CORE_GET_CAPS_INFO`.
pub mod caps_tag {
    pub const MAX_PAYLOAD_LEN: u8 = 0xE3;
    pub const MIN_SLOT_LEN: u8 = 0xE4;
    pub const MAX_SESSION_NUM: u8 = 0xE5;
    pub const MAX_ANCHOR_NUM: u8 = 0xE6;
    pub const MIN_UWB_FREQ: u8 = 0xE7;
    pub const MAX_UWB_FREQ: u8 = 0xE8;
}

/// One tag-length-value parameter of a UCI response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tag: u8,
    pub value: Vec<u8>,
}

impl Tlv {
    /// First three value bytes as a big-endian version word.
    pub fn version_word(&self) -> Option<u32> {
        match self.value.as_slice() {
            [a, b, c, ..] => Some(u32::from_be_bytes([0, *a, *b, *c])),
            _ => None,
        }
    }
}

/// Dotted decimal, e.g. `2.1.7`.
impl fmt::Display for Tlv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.value.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

/// Split `data` into TLVs; a parameter running past the end is an error.
pub fn parse_tlvs(data: &[u8]) -> Result<Vec<Tlv>> {
    let mut params = Vec::new();
    let mut idx = 0;
    while idx < data.len() {
        let tag = byte_at(data, idx)?;
        let len = byte_at(data, idx + 1)? as usize;
        let value = slice_at(data, idx + 2, len)?.to_vec();
        params.push(Tlv { tag, value });
        idx += 2 + len;
    }
    Ok(params)
}

/// Decoded `CORE_GET_DEVICE_INFO` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciDeviceInfo {
    pub uci_major: u8,
    pub uci_minor: u8,
    pub params: Vec<Tlv>,
}

impl UciDeviceInfo {
    /// Layout: `[status][uci major][uci minor][param count] [tlv...]`.
    /// The count byte is skipped; parameters run to the end of the payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let status = byte_at(payload, 0)?;
        if status != 0x00 {
            return Err(Error::UnexpectedResponse {
                expected: 0x00,
                actual: status,
            });
        }
        let version = slice_at(payload, 1, 3)?;
        Ok(Self {
            uci_major: version[0],
            uci_minor: version[1],
            params: parse_tlvs(&payload[4..])?,
        })
    }

    pub fn param(&self, tag: u8) -> Option<&Tlv> {
        self.params.iter().find(|p| p.tag == tag)
    }

    /// NUL padding is stripped.
    pub fn device_name(&self) -> Option<String> {
        self.param(info_tag::DEVICE_NAME).map(|p| {
            let name = p.value.split(|&b| b == 0).next().unwrap_or_default();
            String::from_utf8_lossy(name).into_owned()
        })
    }

    pub fn firmware_version(&self) -> Option<u32> {
        self.param(info_tag::FIRMWARE_VERSION)
            .and_then(Tlv::version_word)
    }

    pub fn dsp_version(&self) -> Option<u32> {
        self.param(info_tag::DSP_VERSION).and_then(Tlv::version_word)
    }
}

/// Decoded `CORE_GET_CAPS_INFO` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciCapabilities {
    pub params: Vec<Tlv>,
}

impl UciCapabilities {
    /// Layout: `[status] [tlv...]`.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let status = byte_at(payload, 0)?;
        if status != 0x00 {
            return Err(Error::UnexpectedResponse {
                expected: 0x00,
                actual: status,
            });
        }
        Ok(Self {
            params: parse_tlvs(&payload[1..])?,
        })
    }

    pub fn param(&self, tag: u8) -> Option<&Tlv> {
        self.params.iter().find(|p| p.tag == tag)
    }

    /// Single-byte count parameters (`MAX_SESSION_NUM`, `MAX_ANCHOR_NUM`).
    pub fn count(&self, tag: u8) -> Option<u8> {
        self.param(tag).and_then(|p| p.value.first().copied())
    }
}

fn info_label(tag: u8) -> &'static str {
    match tag {
        info_tag::MIDDLEWARE_VERSION => "MiddlewareVersion",
        info_tag::DEVICE_NAME => "DeviceName",
        info_tag::FIRMWARE_VERSION => "FirmwareVersion",
        info_tag::DEVICE_VERSION => "DeviceVersion",
        info_tag::SERIAL_NUMBER => "SerialNumber",
        info_tag::DSP_VERSION => "DspVersion",
        info_tag::RANGER4_VERSION => "Ranger4Version",
        info_tag::CCC_VERSION => "CccVersion",
        _ => "Vendor",
    }
}

fn caps_label(tag: u8) -> &'static str {
    match tag {
        caps_tag::MAX_PAYLOAD_LEN => "MAX_PAYLOAD_LEN",
        caps_tag::MIN_SLOT_LEN => "MIN_SLOT_LEN",
        caps_tag::MAX_SESSION_NUM => "MAX_SESSION_NUM",
        caps_tag::MAX_ANCHOR_NUM => "MAX_ANCHOR_NUM",
        caps_tag::MIN_UWB_FREQ => "MIN_UWB_FREQ",
        caps_tag::MAX_UWB_FREQ => "MAX_UWB_FREQ",
        _ => "VENDOR",
    }
}

/// Commands written before giving up (the first send included).
const MAX_SENDS: usize = 4;

/// Unrelated frames tolerated per send.
const READ_RETRIES: usize = 4;

const READ_RETRY_DELAY_MS: u64 = 100;

enum Verdict {
    Accept,
    Resend,
    Skip,
}

fn is_hpd_notification(frame: &[u8]) -> bool {
    frame.len() > 4 && frame[0] == 0x60 && frame[1] == 0x01 && frame[4] == UCI_DEVICE_STATE_HPD
}

/// Write `cmd` and read frames until `classify` accepts one. A
/// hard-power-down notification means the command was lost; resend it.
fn exchange<P, F>(session: &LinkSession<P>, cmd: &[u8], classify: F) -> Result<Vec<u8>>
where
    P: SpiHandshakeTransport,
    F: Fn(&[u8]) -> Verdict,
{
    'send: for send in 1..=MAX_SENDS {
        debug!("uci tx (attempt {}): {}", send, Hex(cmd));
        session.write(cmd)?;
        for _ in 0..=READ_RETRIES {
            let frame = match session.read() {
                Ok(f) => f,
                Err(Error::TransportTimeout { .. }) => {
                    session.with_platform(|p| p.delay_ms(READ_RETRY_DELAY_MS))?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            match classify(&frame) {
                Verdict::Accept => return Ok(frame),
                Verdict::Resend => {
                    warn!("device not listening ({}), resending", Hex(&frame));
                    continue 'send;
                }
                Verdict::Skip => {
                    debug!("ignoring uci frame {}", Hex(&frame));
                    session.with_platform(|p| p.delay_ms(READ_RETRY_DELAY_MS))?;
                }
            }
        }
        break;
    }
    Err(Error::TransportTimeout {
        stage: "uci response",
    })
}

/// Read one frame and require the device-ready notification.
pub fn await_device_ready<P: SpiHandshakeTransport>(session: &LinkSession<P>) -> Result<()> {
    let frame = session.read()?;
    if frame != UCI_DEVICE_READY_NTF {
        return Err(Error::FrameFormat(format!(
            "expected device-ready notification, got {}",
            Hex(&frame)
        )));
    }
    info!("device ready");
    Ok(())
}

/// Switch the device from UCI into the SWUP bootloader. Older firmware
/// answers with a generic `40 00` response instead of `4E 12`.
///
/// The caller should [`switch_protocol`](LinkSession::switch_protocol)
/// before the first RCI exchange.
pub fn activate_swup<P: SpiHandshakeTransport>(session: &LinkSession<P>) -> Result<()> {
    let resp = exchange(session, &UCI_ENABLE_SWUP_CMD, |f| {
        if f.len() == LINK_HEADER_LEN || is_hpd_notification(f) {
            Verdict::Resend
        } else if f.len() == 5 && ((f[0] == 0x4E && f[1] == 0x12) || (f[0] == 0x40 && f[1] == 0x00))
        {
            Verdict::Accept
        } else {
            Verdict::Skip
        }
    })?;
    if resp[3] != 0x01 || resp[4] != 0x00 {
        return Err(Error::UnexpectedResponse {
            expected: 0x00,
            actual: resp[4],
        });
    }
    info!("swup activated");
    Ok(())
}

/// `CORE_GET_DEVICE_INFO`: UCI version and the vendor parameters.
pub fn core_device_info<P: SpiHandshakeTransport>(
    session: &LinkSession<P>,
) -> Result<UciDeviceInfo> {
    let resp = exchange(session, &UCI_CORE_DEVICE_INFO_CMD, |f| {
        if is_hpd_notification(f) {
            Verdict::Resend
        } else if f.len() > LINK_HEADER_LEN && f[0] == 0x40 && f[1] == 0x02 {
            Verdict::Accept
        } else {
            Verdict::Skip
        }
    })?;
    let info = UciDeviceInfo::parse(&resp[LINK_HEADER_LEN..])?;
    info!("uci version {}.{}", info.uci_major, info.uci_minor);
    for p in &info.params {
        if p.tag == info_tag::DEVICE_NAME {
            let name = info.device_name().unwrap_or_default();
            info!("  {:<18}: {}", info_label(p.tag), name);
        } else {
            info!("  {:<18}: {}", info_label(p.tag), p);
        }
    }
    Ok(info)
}

/// `CORE_GET_CAPS_INFO`. Only a response of the full expected length is
/// taken; anything shorter than a header means the command was lost.
pub fn core_capabilities<P: SpiHandshakeTransport>(
    session: &LinkSession<P>,
) -> Result<UciCapabilities> {
    let resp = exchange(session, &UCI_CORE_CAPS_CMD, |f| {
        if f.len() <= LINK_HEADER_LEN || is_hpd_notification(f) {
            Verdict::Resend
        } else if f.len() == UCI_CORE_CAPS_RSP_LEN && f[0] == 0x40 && f[1] == 0x03 {
            Verdict::Accept
        } else {
            Verdict::Skip
        }
    })?;
    let caps = UciCapabilities::parse(&resp[LINK_HEADER_LEN..])?;
    for p in &caps.params {
        debug!("  {:<16}: {}", caps_label(p.tag), p);
    }
    Ok(caps)
}
