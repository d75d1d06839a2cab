//! FPM383C packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    constants::HEADER,
    error::{Error, Result},
};

/// Package identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Instruction from the host
    Command = 0x01,

    /// Data packet, more follow
    Data = 0x02,

    /// Answer from the module
    Response = 0x07,

    /// Last data packet of a transfer
    EndOfData = 0x08,
}

impl From<PacketKind> for u8 {
    fn from(kind: PacketKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Response),
            0x08 => Ok(Self::EndOfData),
            _ => Err(Error::UnknownPacketKind(value)),
        }
    }
}

/// FPM383C protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌─────────┬─────────┬────────────┬─────────┬─────────────┬──────────┐
/// │ Header  │ Address │ Identifier │ Length  │   Payload   │ Checksum │
/// │ 2 bytes │ 4 bytes │   1 byte   │ 2 bytes │   N bytes   │ 2 bytes  │
/// │ EF 01   │ (BE u32)│            │ (BE u16)│             │ (BE u16) │
/// └─────────┴─────────┴────────────┴─────────┴─────────────┴──────────┘
/// ```
///
/// `Length` counts the payload plus the checksum. For command packets the
/// payload starts with the instruction code, for responses with the
/// confirmation code.
///
/// # Examples
///
/// ```
/// use fpm383_core::{Packet, constants::BROADCAST_ADDRESS};
///
/// let packet = Packet::command(BROADCAST_ADDRESS, 0x01, &[]);
/// let encoded = packet.encode(Packet::MAX_PAYLOAD_SIZE).unwrap();
/// assert_eq!(
///     encoded.as_ref(),
///     &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]
/// );
///
/// let decoded = Packet::decode(encoded).unwrap();
/// assert_eq!(decoded.instruction(), Some(0x01));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Device address
    pub address: u32,

    /// Package identifier
    pub kind: PacketKind,

    /// Instruction/confirmation code followed by parameters, or raw data
    pub payload: Bytes,
}

impl Packet {
    /// Header + address + identifier + length
    pub const PREFIX_SIZE: usize = 9;

    /// Trailing checksum size
    pub const CHECKSUM_SIZE: usize = 2;

    /// Largest payload a 16-bit length field can describe
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - Self::CHECKSUM_SIZE;

    /// Create a packet with an arbitrary payload
    pub fn new(address: u32, kind: PacketKind, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            kind,
            payload: payload.into(),
        }
    }

    /// Create a command packet: instruction code followed by parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use fpm383_core::{Packet, PacketKind};
    ///
    /// let packet = Packet::command(0xFFFF_FFFF, 0x02, &[0x01]);
    /// assert_eq!(packet.kind, PacketKind::Command);
    /// assert_eq!(packet.payload.as_ref(), &[0x02, 0x01]);
    /// ```
    pub fn command(address: u32, instruction: u8, params: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(1 + params.len());
        payload.put_u8(instruction);
        payload.put_slice(params);

        Self::new(address, PacketKind::Command, payload.freeze())
    }

    /// Value of the length field (payload + checksum)
    ///
    /// Only meaningful for packets that fit [`Self::MAX_PAYLOAD_SIZE`].
    pub fn length(&self) -> u16 {
        (self.payload.len() + Self::CHECKSUM_SIZE) as u16
    }

    /// Calculate checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.kind.into(), self.length(), &self.payload)
    }

    /// Encode packet to bytes
    ///
    /// `max_payload` is the module's packet size limit; it is clamped to
    /// what the length field can carry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PacketTooLarge`] if the payload exceeds the limit.
    pub fn encode(&self, max_payload: usize) -> Result<BytesMut> {
        let max = max_payload.min(Self::MAX_PAYLOAD_SIZE);
        if self.payload.len() > max {
            return Err(Error::PacketTooLarge {
                size: self.payload.len(),
                max,
            });
        }

        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_slice(&HEADER);
        buf.put_u32(self.address);
        buf.put_u8(self.kind.into());
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        Ok(buf)
    }

    /// Validate the fixed prefix and return the declared length field
    ///
    /// Lets a stream reader learn how many more bytes belong to the packet.
    ///
    /// # Errors
    ///
    /// - [`Error::BadHeader`] if the start code is wrong
    /// - [`Error::PacketTooShort`] if fewer than [`Self::PREFIX_SIZE`] bytes are given
    pub fn declared_length(prefix: &[u8]) -> Result<usize> {
        check_header(prefix)?;

        if prefix.len() < Self::PREFIX_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::PREFIX_SIZE,
                actual: prefix.len(),
            });
        }

        Ok(u16::from_be_bytes([prefix[7], prefix[8]]) as usize)
    }

    /// Decode packet from bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The start code is not `EF 01`
    /// - Buffer is shorter than prefix + checksum
    /// - The length field disagrees with the byte count
    /// - The package identifier is unknown
    /// - Checksum verification fails
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        let declared = Self::declared_length(&buf)?;
        let actual = buf.len() - Self::PREFIX_SIZE;

        if declared != actual {
            return Err(Error::LengthMismatch { declared, actual });
        }

        if declared < Self::CHECKSUM_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::PREFIX_SIZE + Self::CHECKSUM_SIZE,
                actual: buf.len(),
            });
        }

        buf.advance(HEADER.len());
        let address = buf.get_u32();
        let kind_raw = buf.get_u8();
        let length = buf.get_u16();

        let kind = PacketKind::try_from(kind_raw)?;

        let payload_len = declared - Self::CHECKSUM_SIZE;
        let payload = buf.split_to(payload_len).freeze();
        let checksum_received = buf.get_u16();

        let checksum_calculated = checksum::calculate(kind_raw, length, &payload);
        if checksum_calculated != checksum_received {
            return Err(Error::ChecksumMismatch {
                expected: checksum_calculated,
                received: checksum_received,
            });
        }

        Ok(Self {
            address,
            kind,
            payload,
        })
    }

    /// Instruction code of a command packet
    pub fn instruction(&self) -> Option<u8> {
        match self.kind {
            PacketKind::Command => self.payload.first().copied(),
            _ => None,
        }
    }

    /// Raw confirmation byte of a response packet
    pub fn confirmation(&self) -> Option<u8> {
        match self.kind {
            PacketKind::Response => self.payload.first().copied(),
            _ => None,
        }
    }

    /// Bytes after the instruction/confirmation code
    pub fn params(&self) -> Bytes {
        if self.payload.is_empty() {
            Bytes::new()
        } else {
            self.payload.slice(1..)
        }
    }

    /// Check if this packet carries transfer data
    pub fn is_data(&self) -> bool {
        matches!(self.kind, PacketKind::Data | PacketKind::EndOfData)
    }

    /// Get total packet size on the wire
    pub fn size(&self) -> usize {
        Self::PREFIX_SIZE + self.payload.len() + Self::CHECKSUM_SIZE
    }
}

fn check_header(buf: &[u8]) -> Result<()> {
    match buf {
        [h0, h1, ..] if [*h0, *h1] == HEADER => Ok(()),
        [h0, h1, ..] => Err(Error::BadHeader {
            found: u16::from_be_bytes([*h0, *h1]),
        }),
        _ => Err(Error::PacketTooShort {
            expected: Packet::PREFIX_SIZE,
            actual: buf.len(),
        }),
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("address", &format!("0x{:08X}", self.address))
            .field("kind", &self.kind)
            .field("payload", &hex::encode_upper(&self.payload))
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{:?}](address=0x{:08X}, len={})",
            self.kind,
            self.address,
            self.payload.len()
        )
    }
}
