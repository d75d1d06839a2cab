//! # fpm383-core
//!
//! Core protocol implementation for FPM383C fingerprint modules.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure and encoding/decoding
//! - Checksum calculation
//! - Command catalog and confirmation code registry
//! - Parameter block packing
//! - Exchange session state
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod confirmation;
pub mod constants;
pub mod error;
pub mod packet;
pub mod params;
pub mod session;

pub use command::{Command, CommandSpec};
pub use confirmation::{Category, ConfirmationCode};
pub use error::{Error, Result};
pub use packet::{Packet, PacketKind};
pub use params::{EnrollFlags, IdentifyFlags};
pub use session::{ExchangeState, Session};
