//! High-level error types

use fpm383_core::{Command, ConfirmationCode, PacketKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] fpm383_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] fpm383_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] fpm383_types::Error),

    /// No bytes arrived before the deadline
    #[error("No response within {millis} ms")]
    Timeout { millis: u64 },

    /// The module answered with a documented failure code
    #[error("{command} failed: {code}")]
    SensorFailure {
        command: Command,
        code: ConfirmationCode,
    },

    /// A registered code this command never returns
    #[error("{command} answered with undocumented code 0x{code:02X}")]
    UnexpectedCode { command: Command, code: u8 },

    #[error("Unexpected packet: expected {expected:?}, got {actual:?}")]
    UnexpectedPacket {
        expected: PacketKind,
        actual: PacketKind,
    },

    /// Successful answer without the fields the command promises
    #[error("{command} answer too short: length field {actual}, expected at least {expected}")]
    ShortResponse {
        command: Command,
        expected: u16,
        actual: u16,
    },

    #[error("Response from address 0x{actual:08X}, expected 0x{expected:08X}")]
    AddressMismatch { expected: u32, actual: u32 },

    /// Data phase did not end within the packet ceiling
    #[error("Data transfer exceeded {limit} packets")]
    DataOverrun { limit: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Check if the caller may retry the same command on the same link
    ///
    /// Sensor conditions ("no finger", "image too faint") and timeouts leave
    /// the module ready for the next request.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::SensorFailure { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Check if the response on the wire violated the protocol
    pub fn is_protocol_error(&self) -> bool {
        match self {
            Self::Core(e) => e.is_malformed() || matches!(e, fpm383_core::Error::UnknownCode(_)),
            Self::Types(_)
            | Self::UnexpectedCode { .. }
            | Self::UnexpectedPacket { .. }
            | Self::ShortResponse { .. }
            | Self::AddressMismatch { .. }
            | Self::DataOverrun { .. } => true,
            _ => false,
        }
    }

    /// Confirmation code of a sensor failure
    pub fn confirmation(&self) -> Option<ConfirmationCode> {
        match self {
            Self::SensorFailure { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sensor_failure_display() {
        let err = Error::SensorFailure {
            command: Command::GetImage,
            code: ConfirmationCode::NoFinger,
        };
        assert_eq!(err.to_string(), "GetImage(0x01) failed: No finger on sensor (0x02)");
        assert!(err.is_recoverable());
        assert!(!err.is_protocol_error());
        assert_eq!(err.confirmation(), Some(ConfirmationCode::NoFinger));
    }

    #[test]
    fn test_error_classes() {
        let malformed = Error::from(fpm383_core::Error::ChecksumMismatch {
            expected: 0x0005,
            received: 0x0006,
        });
        assert!(malformed.is_protocol_error());
        assert!(!malformed.is_recoverable());

        assert!(Error::Timeout { millis: 500 }.is_recoverable());
        assert!(Error::from(fpm383_core::Error::UnknownCode(0x40)).is_protocol_error());
        assert!(!Error::from(fpm383_core::Error::UnknownCommand("Open".into())).is_protocol_error());
        assert!(Error::UnexpectedCode { command: Command::Empty, code: 0x02 }.is_protocol_error());
        assert_eq!(Error::InvalidArgument("x".into()).confirmation(), None);
    }
}
