//! FPM383C checksum algorithm
//!
//! The checksum is a plain wrapping sum, not a CRC:
//! 1. Start from the package identifier byte
//! 2. Add both bytes of the big-endian length field
//! 3. Add every payload byte
//! 4. Keep the low 16 bits

use tracing::trace;

/// Calculate FPM383C packet checksum
///
/// # Algorithm
///
/// ```text
/// sum = kind + length_hi + length_lo + payload[0] + ... + payload[n-1]   (mod 65536)
/// ```
///
/// # Examples
///
/// ```
/// use fpm383_core::checksum;
///
/// // GetImage: identifier 0x01, length 0x0003, instruction 0x01
/// assert_eq!(checksum::calculate(0x01, 0x0003, &[0x01]), 0x0005);
/// ```
pub fn calculate(kind: u8, length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = length.to_be_bytes();

    let checksum = payload
        .iter()
        .fold(
            u16::from(kind)
                .wrapping_add(u16::from(len_hi))
                .wrapping_add(u16::from(len_lo)),
            |sum, &byte| sum.wrapping_add(u16::from(byte)),
        );

    trace!(
        kind = kind,
        length = length,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(kind: u8, length: u16, payload: &[u8], expected: u16) -> bool {
    calculate(kind, length, payload) == expected
}
