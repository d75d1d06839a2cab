//! One request/response exchange over a byte transport
//!
//! Packets are read in two steps: the 9-byte prefix first, then exactly as
//! many bytes as its length field declares. Bytes of a following packet are
//! never consumed.
//!
//! Answers carry no request tag, so an exchange that ends early (timeout,
//! malformed read, abandoned stage stream) marks the session unsettled and
//! the next dispatch drains whatever the module still sends first.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use fpm383_core::constants::{MAX_DATA_PACKETS, SETTLE_WINDOW_MS};
use fpm383_core::{Command, ConfirmationCode, ExchangeState, Packet, PacketKind, Session};
use fpm383_transport::Transport;

use crate::error::{Error, Result};

/// Validate params, encode the command packet and write it
///
/// Stale bytes from an unsettled exchange are discarded before the write.
/// Leaves the session in `Sent`.
pub(crate) async fn dispatch(
    link: &mut dyn Transport,
    session: &Session,
    command: Command,
    params: &[u8],
) -> Result<()> {
    let spec = command.spec();
    spec.check_params(params)?;

    let request = Packet::command(session.address(), spec.instruction_code, params);

    if session.take_unsettled() {
        if let Err(e) = discard_pending(link).await {
            session.mark_unsettled();
            return Err(e);
        }
    }

    debug!(%command, params = %hex::encode_upper(params), "Dispatching");

    session.begin();
    if let Err(e) = send_packet(link, session, &request).await {
        session.reset();
        return Err(e);
    }

    Ok(())
}

/// Encode and write one packet within the session's payload limit
pub(crate) async fn send_packet(
    link: &mut dyn Transport,
    session: &Session,
    packet: &Packet,
) -> Result<()> {
    let data = packet.encode(session.max_payload())?;

    trace!(bytes = %hex::encode_upper(&data), "TX");

    link.send(&data).await?;
    Ok(())
}

/// Read one packet, recording the outcome in the session
///
/// `AwaitingResponse` then `Decoded`, `Timeout` or `ProtocolError`. A
/// transport failure drops the session back to `Idle`.
pub(crate) async fn receive(
    link: &mut dyn Transport,
    session: &Session,
    timeout: Duration,
) -> Result<Packet> {
    session.transition(ExchangeState::AwaitingResponse)?;

    match read_packet(link, timeout).await {
        Ok(packet) => {
            session.transition(ExchangeState::Decoded)?;
            Ok(packet)
        }
        Err(e @ Error::Timeout { .. }) => {
            warn!("{}", e);
            session.mark_unsettled();
            session.transition(ExchangeState::Timeout)?;
            Err(e)
        }
        Err(e @ Error::Transport(_)) => {
            session.reset();
            Err(e)
        }
        Err(e) => {
            warn!("Malformed response: {}", e);
            session.mark_unsettled();
            session.transition(ExchangeState::ProtocolError)?;
            Err(e)
        }
    }
}

/// Classify a decoded answer to `command`
///
/// Returns the confirmation code when it is one the command documents,
/// whether success or failure. Anything else is a protocol error and moves
/// the session to `ProtocolError`.
pub(crate) fn confirm(
    session: &Session,
    command: Command,
    packet: &Packet,
) -> Result<ConfirmationCode> {
    let checked = classify(session, command, packet);
    if let Err(e) = &checked {
        warn!(%command, "Rejected response: {}", e);
        session.transition(ExchangeState::ProtocolError)?;
    }
    checked
}

fn classify(session: &Session, command: Command, packet: &Packet) -> Result<ConfirmationCode> {
    if packet.kind != PacketKind::Response {
        return Err(Error::UnexpectedPacket {
            expected: PacketKind::Response,
            actual: packet.kind,
        });
    }

    check_address(session, packet)?;

    let raw = packet.confirmation().ok_or(Error::ShortResponse {
        command,
        expected: command.spec().answer_length,
        actual: packet.length(),
    })?;

    let code = ConfirmationCode::try_from(raw)?;

    if !command.spec().allows(raw) {
        return Err(Error::UnexpectedCode { command, code: raw });
    }

    Ok(code)
}

/// Reject packets from another module when a specific address is configured
pub(crate) fn check_address(session: &Session, packet: &Packet) -> Result<()> {
    if !session.is_broadcast() && packet.address != session.address() {
        return Err(Error::AddressMismatch {
            expected: session.address(),
            actual: packet.address,
        });
    }
    Ok(())
}

async fn read_packet(link: &mut dyn Transport, timeout: Duration) -> Result<Packet> {
    let deadline = Instant::now() + timeout;
    let mut buf = BytesMut::with_capacity(Packet::PREFIX_SIZE + Packet::CHECKSUM_SIZE + 32);

    fill(link, &mut buf, Packet::PREFIX_SIZE, deadline).await?;

    if buf.is_empty() {
        return Err(Error::Timeout {
            millis: timeout.as_millis() as u64,
        });
    }

    let declared = Packet::declared_length(&buf)?;
    fill(link, &mut buf, Packet::PREFIX_SIZE + declared, deadline).await?;

    trace!(bytes = %hex::encode_upper(&buf), "RX");

    // A short body surfaces here as a length mismatch
    Ok(Packet::decode(buf)?)
}

const DRAIN_CHUNK: usize = 256;

/// Read and drop inbound bytes until the link stays quiet for the settle window
async fn discard_pending(link: &mut dyn Transport) -> Result<()> {
    let window = Duration::from_millis(SETTLE_WINDOW_MS);
    let mut discarded = 0usize;

    for _ in 0..MAX_DATA_PACKETS {
        match link.receive(DRAIN_CHUNK, window).await {
            Ok(chunk) if chunk.is_empty() => break,
            Ok(chunk) => {
                trace!(bytes = %hex::encode_upper(&chunk), "Discarded");
                discarded += chunk.len();
            }
            Err(e) if e.is_timeout() => break,
            Err(e) => return Err(e.into()),
        }
    }

    if discarded > 0 {
        warn!(discarded, "Dropped stale bytes from an earlier exchange");
    } else {
        debug!("Link settled");
    }
    Ok(())
}

/// Read until `buf` holds `want` bytes or the deadline passes
async fn fill(
    link: &mut dyn Transport,
    buf: &mut BytesMut,
    want: usize,
    deadline: Instant,
) -> Result<()> {
    while buf.len() < want {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match link.receive(want - buf.len(), remaining).await {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(e) if e.is_timeout() => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
