//! Protocol constants

/// Start code that opens every packet
pub const HEADER: [u8; 2] = [0xEF, 0x01];

/// Broadcast device address (module factory default)
pub const BROADCAST_ADDRESS: u32 = 0xFFFF_FFFF;

/// Byte the module emits once after power-up
pub const READY_SIGNAL: u8 = 0x55;

/// Default timeout for plain commands (milliseconds)
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 500;

/// Default timeout for image-capture commands (milliseconds)
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 3_000;

/// Default wait for each stage packet of auto-enroll/auto-identify (milliseconds)
pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 10_000;

/// Quiet period that ends a drain of stale inbound bytes (milliseconds)
pub const SETTLE_WINDOW_MS: u64 = 50;

/// Default maximum payload per packet (data package size code 2)
pub const DEFAULT_MAX_PAYLOAD: usize = 128;

/// Default UART baud rate
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Upper bound on data packets accepted in one transfer
pub const MAX_DATA_PACKETS: usize = 512;

/// Template id that makes AutoIdentify search the whole library
pub const SEARCH_ALL: u16 = 0xFFFF;

/// Template (character) buffers
pub mod buffers {
    /// First character buffer
    pub const CHAR_BUFFER_1: u8 = 1;

    /// Second character buffer
    pub const CHAR_BUFFER_2: u8 = 2;
}

/// Writable system registers (WriteReg)
pub mod registers {
    /// Baud rate multiplier N (baud = N x 9600)
    pub const BAUD_RATE: u8 = 4;

    /// Match security level 1..=5
    pub const SECURITY_LEVEL: u8 = 5;

    /// Data package size code 0..=3
    pub const PACKET_SIZE: u8 = 6;
}

/// Data package size codes reported by ReadSysPara
pub mod packet_sizes {
    /// Payload bytes per data packet, indexed by size code
    pub const BY_CODE: [usize; 4] = [32, 64, 128, 256];
}
