//! Exchange session for one FPM383C module
//!
//! A session tracks:
//! - Device address used for outgoing packets
//! - Module-reported maximum payload per packet
//! - State of the current request/response exchange
//! - Whether stale bytes may still be in flight from an earlier exchange

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use tracing::trace;

use crate::constants::{BROADCAST_ADDRESS, DEFAULT_MAX_PAYLOAD, packet_sizes};
use crate::error::{Error, Result};

/// Exchange state
///
/// ```text
/// Idle -> Sent -> AwaitingResponse -> Decoded -> Success | Failure | ProtocolError
///                        |                 \
///                        +-> Timeout        +-> AwaitingResponse (next stage or data packet)
///                        +-> ProtocolError
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Nothing in flight
    Idle,

    /// Request written to the transport
    Sent,

    /// Waiting for response bytes
    AwaitingResponse,

    /// A response packet passed codec checks
    Decoded,

    /// Confirmation code 0x00
    Success,

    /// Documented non-zero confirmation code
    Failure,

    /// No response within the deadline
    Timeout,

    /// Malformed or undocumented response
    ProtocolError,
}

impl ExchangeState {
    /// Check if the exchange has concluded
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failure | Self::Timeout | Self::ProtocolError
        )
    }

    fn can_enter(self, next: Self) -> bool {
        use ExchangeState::*;

        match (self, next) {
            (_, Idle) => true,
            (from, Sent) => from == Idle || from.is_terminal(),
            (Sent | Decoded | Success, AwaitingResponse) => true,
            (AwaitingResponse, Decoded | Timeout | ProtocolError) => true,
            (Decoded, Success | Failure | ProtocolError) => true,
            _ => false,
        }
    }
}

/// Session state
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Address written into every packet
    address: AtomicU32,

    /// Largest payload the module accepts
    max_payload: AtomicUsize,

    /// Current exchange state
    state: parking_lot::RwLock<ExchangeState>,

    /// An exchange ended without reading everything the module sent
    unsettled: AtomicBool,
}

impl Session {
    /// Create a session for the given device address
    pub fn new(address: u32) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                address: AtomicU32::new(address),
                max_payload: AtomicUsize::new(DEFAULT_MAX_PAYLOAD),
                state: parking_lot::RwLock::new(ExchangeState::Idle),
                unsettled: AtomicBool::new(false),
            }),
        }
    }

    /// Get device address
    pub fn address(&self) -> u32 {
        self.inner.address.load(Ordering::Acquire)
    }

    /// Set device address
    pub fn set_address(&self, address: u32) {
        self.inner.address.store(address, Ordering::Release);
    }

    /// Check if packets go to the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.address() == BROADCAST_ADDRESS
    }

    /// Get maximum payload per packet
    pub fn max_payload(&self) -> usize {
        self.inner.max_payload.load(Ordering::Acquire)
    }

    /// Set maximum payload per packet
    ///
    /// Must be one of the sizes the module can report (32, 64, 128, 256).
    pub fn set_max_payload(&self, size: usize) -> Result<()> {
        if !packet_sizes::BY_CODE.contains(&size) {
            return Err(Error::InvalidPacketSize(size));
        }
        self.inner.max_payload.store(size, Ordering::Release);
        Ok(())
    }

    /// Get current exchange state
    pub fn state(&self) -> ExchangeState {
        *self.inner.state.read()
    }

    /// Move the exchange to `next`
    pub fn transition(&self, next: ExchangeState) -> Result<()> {
        let mut state = self.inner.state.write();

        if !state.can_enter(next) {
            return Err(Error::InvalidTransition {
                from: *state,
                to: next,
            });
        }

        trace!(from = ?*state, to = ?next, "Exchange transition");
        *state = next;
        Ok(())
    }

    /// Start a new exchange: `Idle -> Sent` regardless of how the last one ended
    pub fn begin(&self) {
        let mut state = self.inner.state.write();
        trace!(from = ?*state, "Exchange begin");
        *state = ExchangeState::Sent;
    }

    /// Note that the module may still send bytes for a finished exchange
    ///
    /// Set after a timeout, a malformed read or an abandoned stage stream.
    /// Answers are matched to requests by arrival order only, so those bytes
    /// must not be read as the next command's answer.
    pub fn mark_unsettled(&self) {
        trace!("Exchange left unsettled");
        self.inner.unsettled.store(true, Ordering::Release);
    }

    /// Check if stale bytes may be in flight
    pub fn is_unsettled(&self) -> bool {
        self.inner.unsettled.load(Ordering::Acquire)
    }

    /// Clear the unsettled mark, returning whether it was set
    pub fn take_unsettled(&self) -> bool {
        self.inner.unsettled.swap(false, Ordering::AcqRel)
    }

    /// Drop back to `Idle` (transport failure or reset)
    pub fn reset(&self) {
        *self.inner.state.write() = ExchangeState::Idle;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(BROADCAST_ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExchangeState::*;

    #[test]
    fn test_session_new() {
        let session = Session::default();
        assert_eq!(session.address(), BROADCAST_ADDRESS);
        assert!(session.is_broadcast());
        assert_eq!(session.max_payload(), DEFAULT_MAX_PAYLOAD);
        assert_eq!(session.state(), Idle);
    }

    #[test]
    fn test_request_response_path() {
        let session = Session::default();
        session.begin();
        session.transition(AwaitingResponse).unwrap();
        session.transition(Decoded).unwrap();
        session.transition(Success).unwrap();

        assert_eq!(session.state(), Success);
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_streamed_path() {
        let session = Session::default();
        session.begin();
        for _ in 0..3 {
            session.transition(AwaitingResponse).unwrap();
            session.transition(Decoded).unwrap();
        }
        session.transition(Failure).unwrap();
        assert_eq!(session.state(), Failure);
    }

    #[test]
    fn test_timeout_path() {
        let session = Session::default();
        session.begin();
        session.transition(AwaitingResponse).unwrap();
        session.transition(Timeout).unwrap();

        // Next command starts from the terminal state
        session.transition(Sent).unwrap();
    }

    #[test]
    fn test_invalid_transitions() {
        let session = Session::default();

        assert!(session.transition(Decoded).is_err());
        assert!(session.transition(Success).is_err());

        session.begin();
        assert!(matches!(
            session.transition(Success),
            Err(Error::InvalidTransition { from: Sent, to: Success })
        ));
        assert!(session.transition(Sent).is_err());
    }

    #[test]
    fn test_max_payload_bounds() {
        let session = Session::default();
        session.set_max_payload(256).unwrap();
        assert_eq!(session.max_payload(), 256);

        assert!(session.set_max_payload(100).is_err());
        assert_eq!(session.max_payload(), 256);
    }

    #[test]
    fn test_unsettled_mark() {
        let session = Session::default();
        assert!(!session.is_unsettled());
        assert!(!session.take_unsettled());

        session.clone().mark_unsettled();
        assert!(session.is_unsettled());
        assert!(session.take_unsettled());
        assert!(!session.take_unsettled());
    }

    #[test]
    fn test_session_clone() {
        let session1 = Session::default();
        let session2 = session1.clone();

        session1.set_address(0x1234_5678);
        assert_eq!(session2.address(), 0x1234_5678);
        assert!(!session2.is_broadcast());
    }
}
