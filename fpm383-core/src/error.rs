//! Error types for fpm383-core

/// Result type alias for fpm383 protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to carry the fixed prefix and checksum
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// First two bytes are not the `EF 01` start code
    #[error("Bad header: expected 0xEF01, got 0x{found:04X}")]
    BadHeader {
        found: u16,
    },

    /// Declared length field disagrees with the bytes actually present
    #[error("Length mismatch: header declares {declared} bytes, {actual} bytes present")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Payload exceeds the module's packet size
    #[error("Packet too large: {size} payload bytes (max: {max} bytes)")]
    PacketTooLarge {
        size: usize,
        max: usize,
    },

    /// Package identifier byte is not one of command/data/response/end-of-data
    #[error("Unknown package identifier: 0x{0:02X}")]
    UnknownPacketKind(u8),

    /// Command name not present in the catalog
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Instruction code not present in the catalog
    #[error("Unknown instruction code: 0x{0:02X}")]
    UnknownInstruction(u8),

    /// Confirmation code the registry does not know
    #[error("Unknown confirmation code: 0x{0:02X}")]
    UnknownCode(u8),

    /// Parameter block does not fit the command's instruction length
    #[error("{command} takes {expected} parameter bytes, got {actual}")]
    ParameterLength {
        command: crate::command::Command,
        expected: usize,
        actual: usize,
    },

    /// Requested packet size is outside what the module supports
    #[error("Invalid packet size: {0} bytes")]
    InvalidPacketSize(usize),

    /// Exchange state machine was driven out of order
    #[error("Invalid exchange transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::session::ExchangeState,
        to: crate::session::ExchangeState,
    },
}

impl Error {
    /// Check if the error means the bytes on the wire were malformed
    ///
    /// Such a response is never interpreted as a command result.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::PacketTooShort { .. }
                | Self::BadHeader { .. }
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
                | Self::UnknownPacketKind(_)
        )
    }

    /// Check if the error is a programming or firmware-version mismatch
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_)
                | Self::UnknownInstruction(_)
                | Self::UnknownCode(_)
                | Self::ParameterLength { .. }
        )
    }
}
