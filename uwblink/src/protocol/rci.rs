// uwblink/src/protocol/rci.rs
//! Fixed 256-byte RCI block codec.
//!
//! Layout: `[cmd][subcmd][frame_type][len] [data; len] [padding] [crc_lo][crc_hi]`.
//! The CRC16/XMODEM trailer covers bytes `[0, 254)`.

use crate::constants::{
    MISALIGNED_DUMMY, RCI_BLOCK_LEN, RCI_CRC_OFFSET, RCI_DATA_OFFSET, RCI_MAX_DATA_LEN,
    SWUP_FRAME_TYPE,
};
use crate::protocol::checksum::crc16_xmodem;
use crate::{Error, Result};

/// Decoded RCI block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RciBlock {
    pub cmd: u8,
    pub subcmd: u8,
    pub frame_type: u8,
    pub data: Vec<u8>,
}

impl RciBlock {
    pub fn into_parts(self) -> (u8, Vec<u8>) {
        (self.subcmd, self.data)
    }
}

/// Build a zero-padded block carrying `data` and its CRC trailer.
pub fn build_rci_block(cmd: u8, subcmd: u8, data: &[u8]) -> Result<[u8; RCI_BLOCK_LEN]> {
    if data.len() > RCI_MAX_DATA_LEN {
        return Err(Error::InvalidLength {
            expected: RCI_MAX_DATA_LEN,
            actual: data.len(),
        });
    }
    let mut block = [0u8; RCI_BLOCK_LEN];
    block[0] = cmd;
    block[1] = subcmd;
    block[2] = SWUP_FRAME_TYPE;
    block[3] = data.len() as u8;
    block[RCI_DATA_OFFSET..RCI_DATA_OFFSET + data.len()].copy_from_slice(data);
    let crc = crc16_xmodem(&block[..RCI_CRC_OFFSET]);
    block[RCI_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    Ok(block)
}

/// Verify the CRC trailer and decode the block header and data.
///
/// A leading dummy `0x00` (one-byte misalignment on the bus) shifts the
/// header by one. The frame type byte anchors the header, so a block whose
/// `cmd` is itself `0x00` is not mistaken for a shifted one. The CRC is
/// always checked over the raw block.
pub fn parse_rci_block(block: &[u8; RCI_BLOCK_LEN]) -> Result<RciBlock> {
    let expected = crc16_xmodem(&block[..RCI_CRC_OFFSET]);
    let actual = u16::from_le_bytes([block[RCI_CRC_OFFSET], block[RCI_CRC_OFFSET + 1]]);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }

    let off = usize::from(is_shifted(block));
    let len = block[off + 3] as usize;
    let start = off + RCI_DATA_OFFSET;
    if start + len > RCI_CRC_OFFSET {
        return Err(Error::InvalidLength {
            expected: RCI_CRC_OFFSET - start,
            actual: len,
        });
    }
    Ok(RciBlock {
        cmd: block[off],
        subcmd: block[off + 1],
        frame_type: block[off + 2],
        data: block[start..start + len].to_vec(),
    })
}

fn is_shifted(block: &[u8; RCI_BLOCK_LEN]) -> bool {
    block[0] == MISALIGNED_DUMMY && block[2] != SWUP_FRAME_TYPE && block[3] == SWUP_FRAME_TYPE
}

/// Convenience for callers holding a slice (e.g. a read buffer).
pub fn parse_rci_slice(bytes: &[u8]) -> Result<RciBlock> {
    let block: &[u8; RCI_BLOCK_LEN] = bytes.try_into().map_err(|_| Error::InvalidLength {
        expected: RCI_BLOCK_LEN,
        actual: bytes.len(),
    })?;
    parse_rci_block(block)
}
