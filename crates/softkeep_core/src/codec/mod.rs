//! Opaque identifier codec.
//!
//! # Responsibility
//! - Map positive record ids to short, non-sequential tokens and back.
//! - Produce standard salted hashids tokens through `harsh`.
//!
//! # Invariants
//! - `decode(encode(x)) == Some(x)` for every positive `x`.
//! - Only canonical tokens produced under the same secret decode.
//! - Encoding and decoding are pure; the codec holds read-only state and is
//!   safe to share across threads.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod hashid;

pub use hashid::IdCodec;

/// Reason a token failed to decode.
///
/// This never escapes the query layer: gateways fold it into an empty
/// match so callers see a single "no such record" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Empty,
    /// Token contains a character outside the codec alphabet.
    ForeignCharacter,
    /// Token structure is not a single encoded value.
    Malformed,
    /// Decoded value does not fit a record id.
    Overflow,
    /// Token decodes, but is not what `encode` produces for that value.
    Mismatch,
}

impl TokenError {
    /// Stable metadata label used in log events.
    pub fn code(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::ForeignCharacter => "foreign_character",
            Self::Malformed => "malformed",
            Self::Overflow => "overflow",
            Self::Mismatch => "mismatch",
        }
    }
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid identifier token ({})", self.code())
    }
}

impl Error for TokenError {}
