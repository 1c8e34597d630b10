//! Reading the header of an encoded value.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use crate::length::{Length, LengthError};
use crate::mode::Mode;
use crate::tag::Tag;
use super::error::{DecodeError, Pos};


//------------ Header --------------------------------------------------------

/// The identifier and length octets of an encoded value.
///
/// This is what the tokenizer produces for each value: the tag, the
/// declared length of the content, and the number of octets the header
/// itself occupied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    /// The tag of the value.
    tag: Tag,

    /// The declared length of the content.
    length: usize,

    /// The number of octets of identifier and length octets.
    header_len: usize,
}

impl Header {
    /// Attempts to read a header from the beginning of `data`.
    ///
    /// Returns `Ok(None)` if `data` ends before the header does. This is
    /// not an error, the caller simply has to wait for more data.
    ///
    /// The declared length is checked against `max_length` before anything
    /// else happens, so a hostile peer can’t make us buffer more than that.
    /// The `pos` argument is the stream position of the start of `data` and
    /// is only used for errors.
    pub fn take_from(
        data: &[u8], mode: Mode, max_length: usize, pos: Pos,
    ) -> Result<Option<Self>, DecodeError> {
        let first = match data.first() {
            Some(first) => *first,
            None => return Ok(None)
        };
        let tag = match Tag::from_octet(first) {
            Some(tag) => tag,
            None => {
                return Err(DecodeError::UnsupportedEncoding {
                    pos, reason: "high tag number"
                })
            }
        };
        let (length, len_len) = match Length::take_from(&data[1..], mode) {
            Ok(Some(some)) => some,
            Ok(None) => return Ok(None),
            Err(LengthError::Malformed(reason)) => {
                return Err(DecodeError::MalformedLength {
                    pos: pos + 1, reason
                })
            }
            Err(LengthError::Unsupported(reason)) => {
                return Err(DecodeError::UnsupportedEncoding {
                    pos: pos + 1, reason
                })
            }
        };
        if length.to_usize() > max_length {
            return Err(DecodeError::MalformedLength {
                pos: pos + 1, reason: "length exceeds maximum"
            })
        }
        Ok(Some(Header {
            tag,
            length: length.to_usize(),
            header_len: 1 + len_len,
        }))
    }

    /// Returns the tag of the value.
    pub fn tag(self) -> Tag {
        self.tag
    }

    /// Returns the declared length of the content.
    pub fn length(self) -> usize {
        self.length
    }

    /// Returns the length of the header.
    pub fn header_len(self) -> usize {
        self.header_len
    }

    /// Returns the total length of the encoded value.
    ///
    /// This is the header length plus the content length.
    pub fn total_len(self) -> usize {
        self.header_len.saturating_add(self.length)
    }
}


//============ Tests =========================================================
