//! # fpm383
//!
//! Async driver for FPM383C fingerprint modules over their serial packet
//! protocol.
//!
//! ## Features
//!
//! - Byte-exact packet codec with checksum and length validation
//! - Static command catalog and confirmation code registry
//! - One request in flight per module, enforced by the driver
//! - Streamed AutoEnroll / AutoIdentify stage events
//! - Template upload/download over data packets
//! - Serial port and serial-over-TCP transports
//!
//! ## Quick Start
//!
//! ```no_run
//! use fpm383::{Driver, EnrollFlags};
//!
//! #[tokio::main]
//! async fn main() -> fpm383::Result<()> {
//!     let driver = Driver::serial("/dev/ttyUSB0", 57_600);
//!     driver.connect().await?;
//!
//!     let report = driver.auto_enroll(1, 4, EnrollFlags::empty()).await?;
//!     for event in &report.events {
//!         println!("{}", event);
//!     }
//!
//!     driver.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod error;
mod exchange;
pub mod stream;

// Re-exports
pub use driver::{Driver, Reply};
pub use error::{Error, Result};
pub use stream::{StageReport, StageStream, StreamEnd};

// Re-export protocol and transport types
pub use fpm383_core::{
    Category, Command, ConfirmationCode, EnrollFlags, ExchangeState, IdentifyFlags, Packet,
    PacketKind, Session,
};
pub use fpm383_transport::{SerialTransport, TcpTransport, Transport};
pub use fpm383_types::{
    EnrollStage, Flow, IdentifyStage, IndexTable, SearchHit, StageEvent, SystemParameters,
};
