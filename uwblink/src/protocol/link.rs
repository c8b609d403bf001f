// uwblink/src/protocol/link.rs

use crate::constants::{LINK_EXT_LEN_FLAG, LINK_HEADER_LEN, MAX_COMMAND_PAYLOAD_LEN};
use crate::{Error, Result};

/// Decode a link header into `(is_extended, payload_len)`.
///
/// Normal form carries the length in byte 3. The extended form (byte 1
/// bit 7) promotes byte 3 to the high byte and uses byte 2 as the low byte.
pub fn parse_link_header(header: &[u8; LINK_HEADER_LEN]) -> (bool, usize) {
    let extended = header[1] & LINK_EXT_LEN_FLAG != 0;
    let len = if extended {
        ((header[3] as usize) << 8) | header[2] as usize
    } else {
        header[3] as usize
    };
    (extended, len)
}

/// Build a link header with zeroed type/opcode bytes for `payload_len`.
/// The extended form is chosen when the length does not fit one byte.
pub fn build_link_header(payload_len: usize) -> Result<[u8; LINK_HEADER_LEN]> {
    header_with(0, 0, payload_len)
}

fn header_with(msg_type: u8, opcode: u8, payload_len: usize) -> Result<[u8; LINK_HEADER_LEN]> {
    if payload_len > MAX_COMMAND_PAYLOAD_LEN {
        return Err(Error::InvalidLength {
            expected: MAX_COMMAND_PAYLOAD_LEN,
            actual: payload_len,
        });
    }
    let opcode = opcode & !LINK_EXT_LEN_FLAG;
    if payload_len > u8::MAX as usize {
        Ok([
            msg_type,
            opcode | LINK_EXT_LEN_FLAG,
            (payload_len & 0xFF) as u8,
            (payload_len >> 8) as u8,
        ])
    } else {
        Ok([msg_type, opcode, 0, payload_len as u8])
    }
}

/// A header-delimited link frame (UCI framing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub header: [u8; LINK_HEADER_LEN],
    pub payload: Vec<u8>,
}

impl LinkFrame {
    /// Build a frame from its message type byte, opcode byte and payload.
    pub fn new(msg_type: u8, opcode: u8, payload: &[u8]) -> Result<Self> {
        Ok(Self {
            header: header_with(msg_type, opcode, payload.len())?,
            payload: payload.to_vec(),
        })
    }

    pub fn msg_type(&self) -> u8 {
        self.header[0]
    }

    pub fn opcode(&self) -> u8 {
        self.header[1] & !LINK_EXT_LEN_FLAG
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LINK_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode a complete frame. The byte count must match the header.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LINK_HEADER_LEN {
            return Err(Error::InvalidLength {
                expected: LINK_HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let mut header = [0u8; LINK_HEADER_LEN];
        header.copy_from_slice(&bytes[..LINK_HEADER_LEN]);
        let (_, len) = parse_link_header(&header);
        if bytes.len() != LINK_HEADER_LEN + len {
            return Err(Error::InvalidLength {
                expected: LINK_HEADER_LEN + len,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            header,
            payload: bytes[LINK_HEADER_LEN..].to_vec(),
        })
    }
}
