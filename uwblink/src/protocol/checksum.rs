// uwblink/src/protocol/checksum.rs

const CRC16_POLY: u16 = 0x1021;

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC16_TABLE: [u16; 256] = build_crc16_table();

/// CRC16/XMODEM: poly 0x1021, MSB first, init 0x0000, no final xor.
pub fn crc16_xmodem(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |crc, &b| {
        let idx = ((crc >> 8) ^ b as u16) & 0xFF;
        (crc << 8) ^ CRC16_TABLE[idx as usize]
    })
}

/// Longitudinal redundancy check used by HBCI APDUs.
/// LRC = (0xFF - sum(bytes)) + 1 (mod 256)
pub fn lrc8(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}
