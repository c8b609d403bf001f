// uwblink/src/hbci/download.rs

use log::{debug, error, info, warn};

use crate::constants::{HBCI_CLASS_MASK, HBCI_ERROR_STATUS_MASK, HBCI_LEN_MASK, HBCI_SEGMENT_FLAG};
use crate::hbci::answers::{check_general_answer, check_mode_answer};
use crate::hbci::config::HbciConfig;
use crate::hbci::{HbciFailure, ack, class, general, image, subclass};
use crate::link::LinkSession;
use crate::protocol::hbci::{build_hbci_apdu, parse_hbci_apdu, split_segments};
use crate::protocol::parser::le_u16_at;
use crate::transport::traits::SpiHandshakeTransport;
use crate::types::HbciMode;
use crate::{Error, Result};

/// Progress of a download, as last confirmed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HbciState {
    Idle,
    Ready,
    ModeReady(HbciMode),
    Success(HbciMode),
    Failed,
}

/// Information the bootloader answers to a General query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralQuery {
    ChipId,
    HeliosId,
    CaRootPubKey,
    NxpPubKey,
    RomVersion,
}

impl GeneralQuery {
    pub fn instruction(self) -> u8 {
        match self {
            GeneralQuery::ChipId => general::QRY_CHIP_ID,
            GeneralQuery::HeliosId => general::QRY_HELIOS_ID,
            GeneralQuery::CaRootPubKey => general::QRY_CA_ROOT_PUB_KEY,
            GeneralQuery::NxpPubKey => general::QRY_NXP_PUB_KEY,
            GeneralQuery::RomVersion => general::QRY_ROM_VERSION,
        }
    }

    /// Exact number of data bytes the answer must carry.
    pub fn answer_len(self) -> usize {
        match self {
            GeneralQuery::ChipId => 16,
            GeneralQuery::HeliosId => 4,
            GeneralQuery::CaRootPubKey | GeneralQuery::NxpPubKey => 64,
            GeneralQuery::RomVersion => 1,
        }
    }
}

/// Answer header: class, instruction, raw length word.
#[derive(Debug, Clone, Copy)]
struct AnswerHeader {
    cls: u8,
    ins: u8,
    len: u16,
}

impl AnswerHeader {
    fn parse(raw: &[u8]) -> Result<Self> {
        let len = le_u16_at(raw, 2)?;
        Ok(Self {
            cls: raw[0],
            ins: raw[1],
            len,
        })
    }
}

/// Drives the class/instruction exchange of an HBCI download.
pub struct HbciDownloader<'a, P> {
    session: &'a LinkSession<P>,
    config: HbciConfig,
    state: HbciState,
}

impl<'a, P: SpiHandshakeTransport> HbciDownloader<'a, P> {
    pub fn new(session: &'a LinkSession<P>) -> Self {
        Self::with_config(session, HbciConfig::default())
    }

    pub fn with_config(session: &'a LinkSession<P>, config: HbciConfig) -> Self {
        Self {
            session,
            config,
            state: HbciState::Idle,
        }
    }

    pub fn state(&self) -> HbciState {
        self.state
    }

    fn transceive(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.session
            .hbci_transceive(bytes, self.config.turnaround_ceiling_ms)
    }

    /// Send a header-only query and return the answer header.
    fn query(&self, cls: u8, ins: u8) -> Result<AnswerHeader> {
        let apdu = build_hbci_apdu(cls, ins, &[], false)?;
        AnswerHeader::parse(&self.transceive(&apdu.header())?)
    }

    fn expect_ack(answer: &[u8]) -> Result<()> {
        let h = AnswerHeader::parse(answer)?;
        if h.cls != class::GENERAL | subclass::ACK || h.ins != ack::VALID_APDU {
            if h.ins == ack::INVALID_LRC {
                error!("nack: bootloader rejected the lrc (cls={:#04x})", h.cls);
            } else {
                error!("nack: cls={:#04x} ins={:#04x}", h.cls, h.ins);
            }
            return Err(Error::ProtocolNack {
                cls: h.cls,
                ins: h.ins,
            });
        }
        Ok(())
    }

    /// Map a status answer that should come from the General class.
    fn check_general(h: AnswerHeader, awaiting: Option<HbciMode>) -> Result<()> {
        match h.cls {
            c if c == class::GENERAL | subclass::ANSWER => {
                check_general_answer(h.ins, awaiting).map_err(Error::HbciRejected)
            }
            c if c == class::GENERAL | subclass::ACK => Err(Error::ProtocolNack {
                cls: h.cls,
                ins: h.ins,
            }),
            other => Err(Error::HbciRejected(HbciFailure::UnknownClass(other))),
        }
    }

    /// Send `data` under `(cls, ins)`, split into segments. Each segment
    /// goes out as its header first, then payload + LRC, and both must be
    /// acknowledged with `ValidAPDU`. Returns the number of segments.
    pub fn put_command(&self, cls: u8, ins: u8, data: &[u8]) -> Result<usize> {
        let segments = split_segments(data, self.config.chunk_size);
        let count = segments.len();
        for (i, (chunk, segment)) in segments.into_iter().enumerate() {
            let apdu = build_hbci_apdu(cls, ins, chunk, segment)?;
            debug!(
                "put {:#04x}/{:#04x} segment {}/{} ({} bytes)",
                cls,
                ins,
                i + 1,
                count,
                chunk.len()
            );
            Self::expect_ack(&self.transceive(&apdu.header())?)?;
            if !chunk.is_empty() {
                Self::expect_ack(&self.transceive(&apdu.body())?)?;
            }
        }
        Ok(count)
    }

    /// Read one General information record, acknowledging the answer the
    /// way the bootloader expects before its LRC is verified.
    pub fn query_info(&self, query: GeneralQuery) -> Result<Vec<u8>> {
        let mut resends = 0;
        loop {
            let apdu = build_hbci_apdu(
                class::GENERAL | subclass::QUERY,
                query.instruction(),
                &[],
                false,
            )?;
            let raw = self.transceive(&apdu.header())?;
            let h = AnswerHeader::parse(&raw)?;
            let segment = h.len & HBCI_SEGMENT_FLAG != 0;
            let data_len = ((h.len & HBCI_LEN_MASK) as usize).saturating_sub(1);
            if !segment && data_len == 0 {
                return Err(Error::InvalidLength {
                    expected: query.answer_len(),
                    actual: 0,
                });
            }

            let expected_cls = (apdu.cls & HBCI_CLASS_MASK) | subclass::ANSWER;
            let verdict = if h.cls != expected_cls {
                ack::INVALID_CLASS
            } else if h.ins != query.instruction() {
                ack::INVALID_INSTRUCTION
            } else if segment || data_len != query.answer_len() {
                ack::INVALID_SEGMENT_LENGTH
            } else {
                ack::VALID_APDU
            };
            let reply = build_hbci_apdu(class::GENERAL | subclass::ACK, verdict, &[], false)?;
            self.transceive(&reply.header())?;
            if verdict & HBCI_ERROR_STATUS_MASK != 0 {
                return Err(Error::ProtocolNack {
                    cls: h.cls,
                    ins: h.ins,
                });
            }

            match parse_hbci_apdu(&raw) {
                Ok(answer) => return Ok(answer.payload),
                Err(Error::ChecksumMismatch { expected, actual })
                    if resends < self.config.checksum_resends =>
                {
                    resends += 1;
                    warn!(
                        "{:?} answer lrc {:#04x} != {:#04x}, querying again",
                        query, actual, expected
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Full download: wait for the bootloader, select `mode`, send the
    /// image and confirm the mode's status answer.
    pub fn download(&mut self, mode: HbciMode, firmware: &[u8]) -> Result<()> {
        info!("hbci {} download: {} bytes", mode, firmware.len());
        let r = self.run(mode, firmware);
        match &r {
            Ok(()) => {
                self.state = HbciState::Success(mode);
                info!("hbci {} download complete", mode);
            }
            Err(e) => {
                self.state = HbciState::Failed;
                error!("hbci {} download failed: {}", mode, e);
            }
        }
        r
    }

    fn run(&mut self, mode: HbciMode, firmware: &[u8]) -> Result<()> {
        let status = self.query(class::GENERAL | subclass::QUERY, general::QRY_STATUS)?;
        Self::check_general(status, None)?;
        self.state = HbciState::Ready;

        self.put_command(
            class::GENERAL | subclass::COMMAND,
            mode.select_instruction(),
            &[],
        )?;

        let status = self.query(class::GENERAL | subclass::QUERY, general::QRY_STATUS)?;
        Self::check_general(status, Some(mode))?;
        self.state = HbciState::ModeReady(mode);

        let segments = self.put_command(
            mode.class() | subclass::COMMAND,
            image::CMD_DOWNLOAD,
            firmware,
        )?;
        debug!("{} segments accepted", segments);

        if mode == HbciMode::HifImage {
            let settle = self.config.hif_settle_ms;
            self.session.with_platform(|p| p.delay_ms(settle))?;
        }

        let status = self.query(mode.class() | subclass::QUERY, image::QRY_STATUS)?;
        if status.cls == mode.class() | subclass::ANSWER {
            return check_mode_answer(mode, status.ins).map_err(Error::HbciRejected);
        }
        // still answering in the General class: the image was not taken
        Self::check_general(status, Some(mode))?;
        Err(Error::HbciRejected(HbciFailure::UnexpectedGeneralStatus {
            ins: status.ins,
            awaiting: Some(mode),
        }))
    }
}
