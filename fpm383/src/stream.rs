//! Stage streams of the composite AutoEnroll / AutoIdentify flows
//!
//! One request makes the module report every step of the flow as its own
//! response packet. The stream owns the transport lock until the flow ends,
//! so no other command can interleave with the stage packets. Dropping a
//! stream before its flow ended marks the session unsettled, so the next
//! command drains the stages the module still reports.

use std::time::Duration;

use tokio::sync::MutexGuard;
use tracing::{debug, info, warn};

use fpm383_core::constants::MAX_DATA_PACKETS;
use fpm383_core::{Command, ExchangeState, Session};
use fpm383_transport::Transport;
use fpm383_types::{Flow, StageEvent};

use crate::error::{Error, Result};
use crate::exchange;

/// Why a stage stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Final stage arrived, or a stage reported a failure code
    Completed,

    /// No packet within the stage timeout
    Idle,

    /// A stage packet was malformed or undocumented
    Faulted,
}

/// Everything a drained stream produced
#[derive(Debug)]
pub struct StageReport {
    /// Events in arrival order, including those before a fault
    pub events: Vec<StageEvent>,

    /// How the stream ended
    pub end: StreamEnd,

    /// The fault, unless it was already taken through [`StageStream::next_event`]
    pub error: Option<Error>,
}

impl StageReport {
    /// Last event received
    pub fn last(&self) -> Option<&StageEvent> {
        self.events.last()
    }

    /// Check if the flow reached its final stage with success
    pub fn is_success(&self) -> bool {
        self.end == StreamEnd::Completed
            && self
                .last()
                .is_some_and(|event| event.is_success() && event.is_final_stage())
    }
}

/// Live stream of stage events
///
/// Obtained from [`Driver::stream_auto_enroll`](crate::Driver::stream_auto_enroll)
/// or [`Driver::stream_auto_identify`](crate::Driver::stream_auto_identify).
pub struct StageStream<'a> {
    link: MutexGuard<'a, Box<dyn Transport>>,
    session: &'a Session,
    command: Command,
    flow: Flow,
    stage_timeout: Duration,
    events: Vec<StageEvent>,
    end: Option<StreamEnd>,
}

impl<'a> StageStream<'a> {
    pub(crate) fn new(
        link: MutexGuard<'a, Box<dyn Transport>>,
        session: &'a Session,
        command: Command,
        flow: Flow,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            link,
            session,
            command,
            flow,
            stage_timeout,
            events: Vec::new(),
            end: None,
        }
    }

    /// Command that started the flow
    pub fn command(&self) -> Command {
        self.command
    }

    /// Events delivered so far
    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// How the stream ended, once it has
    pub fn end(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Wait for the next stage packet
    ///
    /// Returns `None` once the stream has ended. A fault is yielded exactly
    /// once, after which the stream is over.
    pub async fn next_event(&mut self) -> Option<Result<StageEvent>> {
        if self.end.is_some() {
            return None;
        }

        if self.events.len() >= MAX_DATA_PACKETS {
            return Some(Err(self.fault(Error::DataOverrun {
                limit: MAX_DATA_PACKETS,
            })));
        }

        let packet = match exchange::receive(&mut **self.link, self.session, self.stage_timeout).await {
            Ok(packet) => packet,
            Err(Error::Timeout { .. }) => {
                info!(
                    command = %self.command,
                    events = self.events.len(),
                    "Stage stream idle, ending"
                );
                self.end = Some(StreamEnd::Idle);
                return None;
            }
            Err(e) => return Some(Err(self.fault(e))),
        };

        let code = match exchange::confirm(self.session, self.command, &packet) {
            Ok(code) => code,
            Err(e) => return Some(Err(self.fault(e))),
        };

        let params = packet.params();
        let decoded = match self.flow {
            Flow::Enroll => StageEvent::enroll(code, &params),
            Flow::Identify => StageEvent::identify(code, &params),
        };

        let event = match decoded {
            Ok(event) => event,
            Err(e) => {
                if let Err(te) = self.session.transition(ExchangeState::ProtocolError) {
                    return Some(Err(self.fault(te.into())));
                }
                return Some(Err(self.fault(e.into())));
            }
        };

        debug!("{}", event);
        self.events.push(event);

        if event.is_terminal() {
            let state = if event.is_success() {
                ExchangeState::Success
            } else {
                ExchangeState::Failure
            };
            if let Err(e) = self.session.transition(state) {
                return Some(Err(self.fault(e.into())));
            }

            info!(command = %self.command, "Flow ended: {}", event);
            self.end = Some(StreamEnd::Completed);
        }

        Some(Ok(event))
    }

    /// Drain the remaining events and release the transport
    pub async fn finish(mut self) -> StageReport {
        let mut error = None;

        while let Some(item) = self.next_event().await {
            if let Err(e) = item {
                error = Some(e);
            }
        }

        StageReport {
            events: std::mem::take(&mut self.events),
            end: self.end.unwrap_or(StreamEnd::Faulted),
            error,
        }
    }

    fn fault(&mut self, error: Error) -> Error {
        warn!(
            command = %self.command,
            delivered = self.events.len(),
            "Stage stream fault: {}",
            error
        );
        self.end = Some(StreamEnd::Faulted);
        error
    }
}

impl Drop for StageStream<'_> {
    fn drop(&mut self) {
        match self.end {
            Some(StreamEnd::Completed) | Some(StreamEnd::Idle) => {}
            None | Some(StreamEnd::Faulted) => {
                if self.end.is_none() {
                    warn!(
                        command = %self.command,
                        delivered = self.events.len(),
                        "Stage stream dropped before the flow ended"
                    );
                }
                self.session.mark_unsettled();
            }
        }
    }
}
