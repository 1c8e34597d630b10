//! Error Handling.
//!
//! This is a private module. Its public content is being re-exported by the
//! parent module.

use std::{fmt, ops};
use thiserror::Error;
use crate::tag::Tag;


//------------ DecodeError ---------------------------------------------------

/// An error happened while decoding a message.
///
/// Any of these errors is fatal for the message being decoded. The decoder
/// that produced it will not continue and the session it belongs to should
/// be closed.
///
/// Every variant carries the position in the stream where the problem was
/// detected. Where a grammar was involved, the name of the grammar and the
/// state it was in are included, too.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    /// The length octets are invalid or announce an excessive length.
    #[error("malformed length at offset {pos}: {reason}")]
    MalformedLength {
        pos: Pos,
        reason: &'static str,
    },

    /// The encoding is correct but uses a form we don’t support.
    ///
    /// This covers the high-tag-number form and indefinite lengths.
    #[error("unsupported encoding at offset {pos}: {reason}")]
    UnsupportedEncoding {
        pos: Pos,
        reason: &'static str,
    },

    /// The grammar has no transition for the tag in the current state.
    #[error("unexpected {tag} in {grammar} state {state} at offset {pos}")]
    UnexpectedTag {
        grammar: &'static str,
        state: &'static str,
        tag: Tag,
        pos: Pos,
    },

    /// A mandatory value was encoded with zero length.
    #[error("empty {tag} in {grammar} state {state} at offset {pos}")]
    ZeroLengthField {
        grammar: &'static str,
        state: &'static str,
        tag: Tag,
        pos: Pos,
    },

    /// The content of a primitive value could not be decoded.
    #[error(
        "invalid {tag} in {grammar} state {state} at offset {pos}: {error}"
    )]
    InvalidValue {
        grammar: &'static str,
        state: &'static str,
        tag: Tag,
        pos: Pos,
        error: FieldError,
    },

    /// A value doesn’t fit into the value it is part of.
    ///
    /// `remaining` is what was left of the enclosing value and `needed` is
    /// the total size of the value that was announced.
    #[error(
        "value at offset {pos} needs {needed} octets \
         but only {remaining} remain in enclosing value"
    )]
    NestedLengthMismatch {
        pos: Pos,
        remaining: usize,
        needed: usize,
    },

    /// A structure ended before all its mandatory fields were present.
    #[error("{grammar} ended in state {state} at offset {pos}")]
    IncompleteValue {
        grammar: &'static str,
        state: &'static str,
        pos: Pos,
    },

    /// The stream ended in the middle of a message.
    #[error("stream ended at offset {pos} inside a message")]
    TruncatedInput {
        pos: Pos,
    },
}

impl DecodeError {
    /// Returns the stream position the error was detected at.
    pub fn pos(&self) -> Pos {
        match *self {
            DecodeError::MalformedLength { pos, .. } => pos,
            DecodeError::UnsupportedEncoding { pos, .. } => pos,
            DecodeError::UnexpectedTag { pos, .. } => pos,
            DecodeError::ZeroLengthField { pos, .. } => pos,
            DecodeError::InvalidValue { pos, .. } => pos,
            DecodeError::NestedLengthMismatch { pos, .. } => pos,
            DecodeError::IncompleteValue { pos, .. } => pos,
            DecodeError::TruncatedInput { pos } => pos,
        }
    }

    /// Converts an error produced by an action.
    pub(crate) fn field(
        error: FieldError,
        grammar: &'static str,
        state: &'static str,
        tag: Tag,
        pos: Pos,
    ) -> Self {
        match error {
            FieldError::Empty => {
                DecodeError::ZeroLengthField { grammar, state, tag, pos }
            }
            error => {
                DecodeError::InvalidValue { grammar, state, tag, pos, error }
            }
        }
    }
}


//------------ FieldError ----------------------------------------------------

/// An action failed to process a value.
///
/// Actions only see the content octets of a value, so this error carries
/// no context. The decoder adds it when converting into a [`DecodeError`].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum FieldError {
    /// The value is empty but mustn’t be.
    #[error("empty value")]
    Empty,

    /// An INTEGER or ENUMERATED is empty or not minimally encoded.
    #[error("invalid integer encoding")]
    InvalidInteger,

    /// An integer doesn’t fit into the type of the field.
    #[error("integer out of range")]
    IntegerRange,

    /// A BOOLEAN doesn’t consist of exactly one octet.
    #[error("invalid boolean")]
    InvalidBoolean,

    /// A NULL has content.
    #[error("NULL with content")]
    InvalidNull,

    /// A BIT STRING is malformed.
    #[error("invalid bit string")]
    InvalidBitString,

    /// A character string contains illegal characters.
    #[error("invalid {0}")]
    InvalidString(&'static str),

    /// A GeneralizedTime is malformed.
    #[error("invalid time")]
    InvalidTime,

    /// The value is well-formed but not allowed here.
    #[error("{0}")]
    Unexpected(&'static str),
}


//------------ Pos -----------------------------------------------------------

/// The logical position within a stream.
///
/// This is the number of octets fed into a decoder before the position.
/// Values of this type are only used for diagnostics which is why we use
/// a newtype.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Pos(usize);

impl Pos {
    /// Returns the position as a `usize`.
    pub fn to_usize(self) -> usize {
        self.0
    }
}

impl From<usize> for Pos {
    fn from(pos: usize) -> Pos {
        Pos(pos)
    }
}

impl ops::Add<usize> for Pos {
    type Output = Self;

    fn add(self, rhs: usize) -> Self {
        Pos(self.0 + rhs)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}


//============ Tests =========================================================
