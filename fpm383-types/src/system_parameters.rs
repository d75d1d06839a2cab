//! Module system parameters (ReadSysPara)

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use fpm383_core::constants::packet_sizes;

use crate::error::{Error, Result};

/// Basic module parameters
///
/// Decoded from the 16 bytes that follow the confirmation code of a
/// ReadSysPara answer: eight big-endian 16-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    /// Captures merged per enrollment
    pub enroll_times: u16,

    /// Size of one template in bytes
    pub template_size: u16,

    /// Number of library slots
    pub library_capacity: u16,

    /// Match score level code
    pub score_level: u16,

    /// Device address (high and low halves joined)
    pub device_address: u32,

    /// Data package size code (0..=3)
    pub packet_size_code: u16,

    /// Baud rate multiplier N (baud = N x 9600)
    pub baud_multiplier: u16,
}

impl SystemParameters {
    /// Size of the encoded parameter block
    pub const SIZE: usize = 16;

    /// Decode the parameter block
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Parse {
                what: "system parameters",
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            enroll_times: BigEndian::read_u16(&bytes[0..2]),
            template_size: BigEndian::read_u16(&bytes[2..4]),
            library_capacity: BigEndian::read_u16(&bytes[4..6]),
            score_level: BigEndian::read_u16(&bytes[6..8]),
            device_address: BigEndian::read_u32(&bytes[8..12]),
            packet_size_code: BigEndian::read_u16(&bytes[12..14]),
            baud_multiplier: BigEndian::read_u16(&bytes[14..16]),
        })
    }

    /// Maximum payload per data packet
    pub fn max_payload(&self) -> Result<usize> {
        packet_sizes::BY_CODE
            .get(self.packet_size_code as usize)
            .copied()
            .ok_or_else(|| {
                Error::Validation(format!(
                    "packet size code {} out of range",
                    self.packet_size_code
                ))
            })
    }

    /// UART baud rate
    pub fn baud_rate(&self) -> u32 {
        u32::from(self.baud_multiplier) * 9600
    }
}

impl fmt::Display for SystemParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module[addr: 0x{:08X}, library: {}, template: {}B, baud: {}]",
            self.device_address,
            self.library_capacity,
            self.template_size,
            self.baud_rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BLOCK: [u8; 16] = [
        0x00, 0x04, // enroll times
        0x06, 0x00, // template size 1536
        0x00, 0x3C, // capacity 60
        0x00, 0x03, // score level
        0xFF, 0xFF, 0xFF, 0xFF, // address
        0x00, 0x02, // packet size code
        0x00, 0x06, // baud N
    ];

    #[test]
    fn test_parse() {
        let params = SystemParameters::parse(&BLOCK).unwrap();

        assert_eq!(
            params,
            SystemParameters {
                enroll_times: 4,
                template_size: 1536,
                library_capacity: 60,
                score_level: 3,
                device_address: 0xFFFF_FFFF,
                packet_size_code: 2,
                baud_multiplier: 6,
            }
        );
        assert_eq!(params.max_payload().unwrap(), 128);
        assert_eq!(params.baud_rate(), 57_600);
    }

    #[test]
    fn test_parse_short() {
        assert!(matches!(
            SystemParameters::parse(&BLOCK[..10]),
            Err(Error::Parse { expected: 16, actual: 10, .. })
        ));
    }

    #[test]
    fn test_bad_packet_size_code() {
        let mut block = BLOCK;
        block[13] = 7;
        let params = SystemParameters::parse(&block).unwrap();
        assert!(params.max_payload().is_err());
    }
}
