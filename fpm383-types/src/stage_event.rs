//! Stage events of the streamed AutoEnroll / AutoIdentify flows

use std::fmt;

use fpm383_core::ConfirmationCode;

use crate::error::{Error, Result};

/// Which composite flow produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Enroll,
    Identify,
}

/// AutoEnroll stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrollStage {
    /// Parameters accepted, flow started
    Legality,

    /// Image captured
    Capture,

    /// Features generated
    Features,

    /// Finger lifted
    FingerLeave,

    /// Features merged into a template
    Merge,

    /// Library checked for the same finger
    DuplicateCheck,

    /// Template stored
    Store,

    /// Stage code this driver does not name
    Other(u8),
}

impl From<u8> for EnrollStage {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Legality,
            0x01 => Self::Capture,
            0x02 => Self::Features,
            0x03 => Self::FingerLeave,
            0x04 => Self::Merge,
            0x05 => Self::DuplicateCheck,
            0x06 => Self::Store,
            other => Self::Other(other),
        }
    }
}

/// AutoIdentify stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifyStage {
    /// Parameters accepted, flow started
    Legality,

    /// Image captured
    Capture,

    /// Search finished
    Result,

    /// Stage code this driver does not name
    Other(u8),
}

impl From<u8> for IdentifyStage {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Legality,
            0x01 => Self::Capture,
            0x05 => Self::Result,
            other => Self::Other(other),
        }
    }
}

/// One decoded stage packet
///
/// Enroll answers carry `[stage, sub_status]` after the confirmation code;
/// identify answers carry `[stage, id_hi, id_lo, score_hi, score_lo]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEvent {
    /// Flow that produced the event
    pub flow: Flow,

    /// Raw stage code
    pub stage_code: u8,

    /// Sub-status (enroll: capture index or step detail)
    pub sub_status: Option<u8>,

    /// Confirmation code of this stage
    pub confirmation: ConfirmationCode,

    /// Matched template id (identify result)
    pub matched_id: Option<u16>,

    /// Match score (identify result)
    pub score: Option<u16>,
}

impl StageEvent {
    /// Decode an AutoEnroll stage from the bytes after the confirmation code
    pub fn enroll(confirmation: ConfirmationCode, params: &[u8]) -> Result<Self> {
        let stage_code = *params.first().ok_or(Error::Parse {
            what: "enroll stage",
            expected: 1,
            actual: 0,
        })?;

        Ok(Self {
            flow: Flow::Enroll,
            stage_code,
            sub_status: params.get(1).copied(),
            confirmation,
            matched_id: None,
            score: None,
        })
    }

    /// Decode an AutoIdentify stage from the bytes after the confirmation code
    pub fn identify(confirmation: ConfirmationCode, params: &[u8]) -> Result<Self> {
        let stage_code = *params.first().ok_or(Error::Parse {
            what: "identify stage",
            expected: 1,
            actual: 0,
        })?;

        let (matched_id, score) = match params {
            [_, i0, i1, s0, s1, ..] => (
                Some(u16::from_be_bytes([*i0, *i1])),
                Some(u16::from_be_bytes([*s0, *s1])),
            ),
            _ => (None, None),
        };

        Ok(Self {
            flow: Flow::Identify,
            stage_code,
            sub_status: None,
            confirmation,
            matched_id,
            score,
        })
    }

    /// Typed enroll stage
    pub fn enroll_stage(&self) -> Option<EnrollStage> {
        match self.flow {
            Flow::Enroll => Some(EnrollStage::from(self.stage_code)),
            Flow::Identify => None,
        }
    }

    /// Typed identify stage
    pub fn identify_stage(&self) -> Option<IdentifyStage> {
        match self.flow {
            Flow::Identify => Some(IdentifyStage::from(self.stage_code)),
            Flow::Enroll => None,
        }
    }

    /// Check if the stage succeeded
    pub fn is_success(&self) -> bool {
        self.confirmation.is_success()
    }

    /// Check if this is the flow's last stage
    pub fn is_final_stage(&self) -> bool {
        match self.flow {
            Flow::Enroll => self.enroll_stage() == Some(EnrollStage::Store),
            Flow::Identify => self.identify_stage() == Some(IdentifyStage::Result),
        }
    }

    /// Check if the module sends nothing more after this event
    ///
    /// A failed stage aborts the flow on the module side.
    pub fn is_terminal(&self) -> bool {
        !self.is_success() || self.is_final_stage()
    }
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.flow {
            Flow::Enroll => write!(
                f,
                "Enroll[{:?}/{}]: {}",
                EnrollStage::from(self.stage_code),
                self.sub_status.unwrap_or_default(),
                self.confirmation
            ),
            Flow::Identify => write!(
                f,
                "Identify[{:?}]: {} (id={:?}, score={:?})",
                IdentifyStage::from(self.stage_code),
                self.confirmation,
                self.matched_id,
                self.score
            ),
        }
    }
}
