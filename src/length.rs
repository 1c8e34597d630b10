//! The length octets.
//!
//! This is a private module. The [`Length`] defined herein is re-exported by
//! the crate root.

use crate::encode::Target;
use crate::mode::Mode;


//------------ Length -------------------------------------------------------

/// The definite length of the content octets of an encoded value.
///
/// # BER Encoding
///
/// The length can be encoded in one of two basic ways. Which one is used is
/// determined by the most significant bit of the first octet. If it is not
/// set, the length octets is one octet long and the remaining bits of this
/// first octet provide the definite length. Thus, if the first octet is
/// less than 128, it provides the definite length already.
///
/// If the most significant bit is set, the remaining bits of the first
/// octet specify the number of octets that follow to encode the actual
/// length. If they specify that there are zero more octets, i.e., the
/// value of the first octet is 128, the length is indefinite. We don’t
/// support indefinite lengths. Otherwise, those following octets give the
/// big-endian encoding of the definite length of the content octets. The
/// first octet value 0xFF is reserved.
///
/// Under DER, a definite length must be encoded in the minimum number of
/// octets.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Length(usize);

impl Length {
    const LEN: usize = 0usize.to_ne_bytes().len();

    /// A length of zero.
    pub const ZERO: Self = Length(0);

    /// Creates a new length.
    pub const fn new(len: usize) -> Self {
        Length(len)
    }

    /// Returns the length as a `usize`.
    pub const fn to_usize(self) -> usize {
        self.0
    }

    /// Parses the length octets at the beginning of `data`.
    ///
    /// Returns the length and the number of length octets or `Ok(None)` if
    /// `data` ends before the length octets do.
    pub(crate) fn take_from(
        data: &[u8], mode: Mode
    ) -> Result<Option<(Self, usize)>, LengthError> {
        let first = match data.first() {
            Some(first) => *first,
            None => return Ok(None)
        };
        let count = match first {
            // Bit 7 clear: single.
            n if (n & 0x80) == 0 => {
                return Ok(Some((Length(usize::from(n)), 1)))
            }
            0x80 => {
                return Err(LengthError::Unsupported(
                    "indefinite length"
                ))
            }
            0xFF => {
                return Err(LengthError::Malformed("illegal length octets"))
            }
            n => usize::from(n & 0x7F)
        };
        let Some(octets) = data.get(1..=count) else {
            return Ok(None)
        };

        if mode.is_restricted() {
            // The first octet can’t be zero and it can’t be less than 0x80
            // if it is the only one. In both cases, there is a shorter
            // encoding.
            if octets[0] == 0 || (octets[0] < 0x80 && count == 1) {
                return Err(LengthError::Malformed(
                    "illegal length in DER"
                ))
            }
        }

        // Leading zeros are fine in BER, but whatever is left must fit.
        let start = octets.iter().position(|&x| x != 0).unwrap_or(count);
        let significant = &octets[start..];
        if significant.len() > Self::LEN {
            return Err(LengthError::Malformed("excessive length"))
        }
        let mut res = [0u8; Self::LEN];
        res[Self::LEN - significant.len()..].copy_from_slice(significant);
        Ok(Some((Length(usize::from_be_bytes(res)), count + 1)))
    }

    /// Returns the number of length octets needed for this length.
    pub fn encoded_len(self) -> usize {
        match self.significant_octets() {
            0 => 1,
            n => n + 1,
        }
    }

    /// Appends the length octets to a target.
    ///
    /// This always uses the minimal form: short form up to 127 and the long
    /// form with no leading zero octets above that.
    pub fn write_encoded<T: Target>(self, target: &mut T) {
        match self.significant_octets() {
            0 => target.append_u8(self.0 as u8),
            n => {
                // `n` is at most the size of a usize, far below 127.
                target.append_u8(0x80 | n as u8);
                target.append_slice(&self.0.to_be_bytes()[Self::LEN - n..])
            }
        }
    }

    /// Returns the number of octets the long form needs for the length.
    ///
    /// Returns zero if the short form can be used.
    fn significant_octets(self) -> usize {
        if self.0 < 0x80 {
            0
        }
        else {
            Self::LEN - (self.0.leading_zeros() / 8) as usize
        }
    }
}

impl From<usize> for Length {
    fn from(len: usize) -> Self {
        Length(len)
    }
}

impl std::ops::Add for Length {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Length(self.0 + rhs.0)
    }
}

impl std::ops::Add<usize> for Length {
    type Output = Self;

    fn add(self, rhs: usize) -> Self {
        Length(self.0 + rhs)
    }
}


//------------ LengthError ---------------------------------------------------

/// Parsing the length octets failed.
///
/// This is turned into a proper decode error by the header reader which
/// knows the stream position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LengthError {
    /// The length octets are not valid.
    Malformed(&'static str),

    /// The length octets use a form we don’t support.
    Unsupported(&'static str),
}


//============ Tests =========================================================
