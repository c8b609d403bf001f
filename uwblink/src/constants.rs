// uwblink/src/constants.rs
//! Wire constants shared by the codecs, the link session and the update engines.

/// Size of every link header (UCI and RCI framing share it).
pub const LINK_HEADER_LEN: usize = 4;

/// Bit 7 of header byte 1 selects the extended-length form.
pub const LINK_EXT_LEN_FLAG: u8 = 0x80;

/// Largest payload a host command frame may carry.
pub const MAX_COMMAND_PAYLOAD_LEN: usize = 2048;

/// Largest payload a device response frame may carry.
pub const MAX_RESPONSE_PAYLOAD_LEN: usize = 256;

/// Bytes clocked out before the header is known. One extra byte absorbs
/// the dummy `0x00` a misaligned device shifts out first.
pub const READ_PROBE_LEN: usize = 5;

/// Probe byte value that marks a one-byte misalignment.
pub const MISALIGNED_DUMMY: u8 = 0x00;

/// Probe byte value reported by a device in low-power mode.
pub const LOW_POWER_MARKER: u8 = 0xFF;

// ---------------------------------------------------------------------------
// RCI block
// ---------------------------------------------------------------------------

/// Every RCI block is exactly this long.
pub const RCI_BLOCK_LEN: usize = 256;

/// CRC16 covers bytes `[0, RCI_CRC_OFFSET)`.
pub const RCI_CRC_OFFSET: usize = 254;

/// Offset of command data inside a block.
pub const RCI_DATA_OFFSET: usize = 4;

/// Largest data field a block can carry.
pub const RCI_MAX_DATA_LEN: usize = RCI_CRC_OFFSET - RCI_DATA_OFFSET;

/// Command byte for every SWUP request.
pub const SWUP_COMMAND: u8 = 0x70;

/// Frame type byte for every SWUP request.
pub const SWUP_FRAME_TYPE: u8 = 0x3A;

// ---------------------------------------------------------------------------
// SWUP
// ---------------------------------------------------------------------------

pub const SWUP_SUB_TRANSFER_COMPONENT: u8 = 0x01;
pub const SWUP_SUB_TRANSFER_MANIFEST: u8 = 0x02;
pub const SWUP_SUB_VERIFY_COMPONENT: u8 = 0x10;
pub const SWUP_SUB_VERIFY_ALL: u8 = 0x11;
pub const SWUP_SUB_FINISH_UPDATE: u8 = 0x12;
pub const SWUP_SUB_START_UPDATE: u8 = 0x13;
pub const SWUP_SUB_CLEAR_RAM_MANIFEST: u8 = 0x14;
pub const SWUP_SUB_GET_DEVICE_INFO: u8 = 0x21;
pub const SWUP_SUB_READ_DEVICE_ID: u8 = 0x22;

/// Request data lengths.
pub const SWUP_TRANSFER_COMPONENT_LEN: usize = 131;
pub const SWUP_TRANSFER_MANIFEST_LEN: usize = 129;
pub const SWUP_VERIFY_COMPONENT_LEN: usize = 1;

/// Response length bytes the device reports for the two record queries.
pub const SWUP_DEVICE_INFO_RESPONSE_LEN: u8 = 0x2C;
pub const SWUP_DEVICE_ID_RESPONSE_LEN: u8 = 0x1C;

/// Manifest and component segment geometry.
pub const SWUP_SEGMENT_LEN: usize = 128;
pub const SWUP_MANIFEST_CHUNKS: usize = 4;
pub const SWUP_MANIFEST_LEN: usize = SWUP_SEGMENT_LEN * SWUP_MANIFEST_CHUNKS;

/// `status` and `deviceState` precede every response payload.
pub const SWUP_RESPONSE_PREFIX_LEN: usize = 8;

/// Type-check byte examined against the key version policy.
pub const SWUP_TYPE_CHECK_INDEX: usize = 6;

// ---------------------------------------------------------------------------
// HBCI
// ---------------------------------------------------------------------------

pub const HBCI_HEADER_LEN: usize = 4;
pub const HBCI_SEGMENT_FLAG: u16 = 0x8000;
pub const HBCI_LEN_MASK: u16 = 0x7FFF;
pub const HBCI_MAX_MOSI_CHUNK: usize = 2048;
pub const HBCI_MAX_MISO_PAYLOAD: usize = 256;

pub const HBCI_CLASS_MASK: u8 = 0xF0;
/// Instructions with this bit set are failure answers.
pub const HBCI_ERROR_STATUS_MASK: u8 = 0x80;

// ---------------------------------------------------------------------------
// UCI helpers
// ---------------------------------------------------------------------------

/// Device status notification: `DEVICE_STATUS_NTF` with state READY.
pub const UCI_DEVICE_READY_NTF: [u8; 5] = [0x60, 0x01, 0x00, 0x01, 0x01];

/// Device status value reported after a hard power down.
pub const UCI_DEVICE_STATE_HPD: u8 = 0xFC;

/// Proprietary command that switches the device into its SWUP bootloader.
pub const UCI_ENABLE_SWUP_CMD: [u8; 5] = [0x2E, 0x12, 0x00, 0x01, 0x00];

/// `CORE_GET_DEVICE_INFO_CMD`.
pub const UCI_CORE_DEVICE_INFO_CMD: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// `CORE_GET_CAPS_INFO_CMD`.
pub const UCI_CORE_CAPS_CMD: [u8; 4] = [0x20, 0x03, 0x00, 0x00];

/// Full length of the capabilities response frame, header included.
pub const UCI_CORE_CAPS_RSP_LEN: usize = 46;
