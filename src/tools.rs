//! CRC7 and small bit helpers.

/// CRC7 (polynomial x^7 + x^3 + 1, MSB first) over `message`.
pub fn crc7(message: &[u8]) -> u8 {
    let mut shift_reg: u8 = 0;
    for &byte in message {
        for bit in (0..8).rev() {
            shift_reg <<= 1;
            if ((shift_reg >> 7) ^ ((byte >> bit) & 1)) != 0 {
                shift_reg ^= 0x89;
            }
        }
    }
    shift_reg
}

/// CRC7 placed in bits 7:1 with the end bit set, as it appears on the wire
/// and in the last byte of CID/CSD.
pub fn crc7_trailer(message: &[u8]) -> u8 {
    (crc7(message) << 1) | 1
}

/// Extracts `len` bits of `value` starting at bit `start`.
#[inline]
pub fn extract32(value: u32, start: u32, len: u32) -> u32 {
    (value >> start) & (u32::MAX >> (32 - len))
}
