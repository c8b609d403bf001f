// uwblink/src/protocol/hbci.rs

use crate::constants::{HBCI_HEADER_LEN, HBCI_LEN_MASK, HBCI_MAX_MOSI_CHUNK, HBCI_SEGMENT_FLAG};
use crate::protocol::checksum::lrc8;
use crate::protocol::parser::{ensure_len, le_u16_at};
use crate::{Error, Result};

/// HBCI APDU: `[cls][ins][len_lo][len_hi] [payload] [lrc]`.
///
/// `len` counts the payload plus the LRC byte. A non-final segment carries
/// exactly the segment flag (bit 15) with zero length bits; its body runs
/// to the end of the transfer. A zero length means a header-only APDU
/// without LRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbciApdu {
    pub cls: u8,
    pub ins: u8,
    pub len: u16,
    pub payload: Vec<u8>,
    pub lrc: Option<u8>,
}

impl HbciApdu {
    pub fn is_segment(&self) -> bool {
        self.len & HBCI_SEGMENT_FLAG != 0
    }

    /// Announced body length (payload + LRC). Zero for a non-final segment,
    /// whose length is implied by the transfer.
    pub fn body_len(&self) -> usize {
        (self.len & HBCI_LEN_MASK) as usize
    }

    pub fn header(&self) -> [u8; HBCI_HEADER_LEN] {
        let [lo, hi] = self.len.to_le_bytes();
        [self.cls, self.ins, lo, hi]
    }

    /// Payload followed by the LRC, i.e. everything after the header.
    pub fn body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 1);
        out.extend_from_slice(&self.payload);
        out.extend(self.lrc);
        out
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header().to_vec();
        out.extend_from_slice(&self.body());
        out
    }
}

/// Build an APDU, computing `len` and the LRC over header and payload.
pub fn build_hbci_apdu(cls: u8, ins: u8, payload: &[u8], segment: bool) -> Result<HbciApdu> {
    if payload.len() > HBCI_MAX_MOSI_CHUNK {
        return Err(Error::InvalidLength {
            expected: HBCI_MAX_MOSI_CHUNK,
            actual: payload.len(),
        });
    }
    let len = if segment {
        HBCI_SEGMENT_FLAG
    } else if payload.is_empty() {
        0
    } else {
        (payload.len() + 1) as u16
    };
    let mut apdu = HbciApdu {
        cls,
        ins,
        len,
        payload: payload.to_vec(),
        lrc: None,
    };
    if !payload.is_empty() {
        let mut covered = apdu.header().to_vec();
        covered.extend_from_slice(payload);
        apdu.lrc = Some(lrc8(&covered));
    }
    Ok(apdu)
}

/// Parse an APDU and verify its LRC. A segment body is taken to be
/// everything after the header.
pub fn parse_hbci_apdu(bytes: &[u8]) -> Result<HbciApdu> {
    ensure_len(bytes, HBCI_HEADER_LEN)?;
    let len = le_u16_at(bytes, 2)?;
    let body_len = match (len & HBCI_LEN_MASK) as usize {
        0 if len & HBCI_SEGMENT_FLAG != 0 => bytes.len() - HBCI_HEADER_LEN,
        n => n,
    };
    let mut apdu = HbciApdu {
        cls: bytes[0],
        ins: bytes[1],
        len,
        payload: Vec::new(),
        lrc: None,
    };
    if body_len == 0 {
        return Ok(apdu);
    }

    ensure_len(bytes, HBCI_HEADER_LEN + body_len)?;
    let lrc_idx = HBCI_HEADER_LEN + body_len - 1;
    let actual = bytes[lrc_idx];
    let expected = lrc8(&bytes[..lrc_idx]);
    if expected != actual {
        return Err(Error::ChecksumMismatch {
            expected: expected as u16,
            actual: actual as u16,
        });
    }
    apdu.payload = bytes[HBCI_HEADER_LEN..lrc_idx].to_vec();
    apdu.lrc = Some(actual);
    Ok(apdu)
}

/// Split an image into download chunks of at most `chunk_size` bytes.
/// Each item carries the segment flag: set on every chunk except the last.
/// An empty image yields a single empty, final chunk.
pub fn split_segments(image: &[u8], chunk_size: usize) -> Vec<(&[u8], bool)> {
    if image.is_empty() || chunk_size == 0 {
        return vec![(image, false)];
    }
    let count = image.len().div_ceil(chunk_size);
    image
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, c)| (c, i + 1 < count))
        .collect()
}
