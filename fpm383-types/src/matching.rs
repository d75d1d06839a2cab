//! Results of template comparison and library search

use std::fmt;

use crate::error::{Error, Result};

/// Library search hit (Search)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    /// Library page of the matching template
    pub page_id: u16,

    /// Match score
    pub score: u16,
}

impl SearchHit {
    /// Decode `[page_hi, page_lo, score_hi, score_lo]`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [p0, p1, s0, s1, ..] => Ok(Self {
                page_id: u16::from_be_bytes([*p0, *p1]),
                score: u16::from_be_bytes([*s0, *s1]),
            }),
            _ => Err(Error::Parse {
                what: "search hit",
                expected: 4,
                actual: bytes.len(),
            }),
        }
    }
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} (score {})", self.page_id, self.score)
    }
}

/// Decode a big-endian 16-bit value (match score, template count)
pub fn parse_u16(what: &'static str, bytes: &[u8]) -> Result<u16> {
    match bytes {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(Error::Parse {
            what,
            expected: 2,
            actual: bytes.len(),
        }),
    }
}
