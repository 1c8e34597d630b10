//! Decoding primitive values.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use bytes::Bytes;
use crate::int;
use crate::tag::Tag;
use super::error::FieldError;


//------------ Primitive -----------------------------------------------------

/// The content of a primitive value handed to an action.
///
/// The decoder collects all content octets of a primitive value before it
/// invokes the action of the transition, so a value of this type always
/// contains the complete content. The content is kept as a `Bytes` value
/// split off the receive buffer, so actions that want to keep the raw
/// octets can do so without copying.
///
/// A number of methods are available to deal with the encodings defined for
/// various types. These are prefixed by `to_` to indicate that they are
/// intended to convert the content to a certain type. The conversion fails
/// with a [`FieldError`] if the content isn’t correctly encoded for the
/// type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Primitive {
    /// The tag of the value.
    tag: Tag,

    /// The content octets.
    content: Bytes,
}

impl Primitive {
    /// Creates a new primitive from tag and content.
    pub fn new(tag: Tag, content: Bytes) -> Self {
        Primitive { tag, content }
    }

    /// Returns the tag of the value.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the content octets.
    pub fn as_slice(&self) -> &[u8] {
        self.content.as_ref()
    }

    /// Returns the number of content octets.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns whether the content is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Checks that the content isn’t empty.
    pub fn check_not_empty(&self) -> Result<(), FieldError> {
        if self.content.is_empty() {
            Err(FieldError::Empty)
        }
        else {
            Ok(())
        }
    }

    /// Converts the content into a bytes value.
    pub fn to_bytes(&self) -> Bytes {
        self.content.clone()
    }

    /// Converts the content of an INTEGER into an `i32`.
    pub fn to_i32(&self) -> Result<i32, FieldError> {
        int::i32_from_content(&self.content)
    }

    /// Converts the content of an INTEGER into an `i64`.
    pub fn to_i64(&self) -> Result<i64, FieldError> {
        int::i64_from_content(&self.content)
    }

    /// Converts the content of an INTEGER into a `u32`.
    pub fn to_u32(&self) -> Result<u32, FieldError> {
        int::u32_from_content(&self.content)
    }

    /// Converts the content of an ENUMERATED into an `i32`.
    ///
    /// ENUMERATED uses the same content encoding as INTEGER.
    pub fn to_enumerated(&self) -> Result<i32, FieldError> {
        self.to_i32()
    }

    /// Converts the content of a BOOLEAN.
    ///
    /// Any non-zero octet is true as BER allows.
    pub fn to_bool(&self) -> Result<bool, FieldError> {
        match self.as_slice() {
            [0] => Ok(false),
            [_] => Ok(true),
            _ => Err(FieldError::InvalidBoolean)
        }
    }

    /// Checks that the content is that of a NULL.
    pub fn to_null(&self) -> Result<(), FieldError> {
        if self.content.is_empty() {
            Ok(())
        }
        else {
            Err(FieldError::InvalidNull)
        }
    }

    /// Converts the content into a string that must be valid UTF-8.
    ///
    /// This is used for UTF8String as well as for LDAP strings which are
    /// OCTET STRINGs containing UTF-8.
    pub fn to_utf8(&self) -> Result<String, FieldError> {
        String::from_utf8(
            self.content.to_vec()
        ).map_err(|_| FieldError::InvalidString("UTF-8 string"))
    }

    /// Converts the content of a string restricted to ASCII.
    ///
    /// Kerberos strings are GeneralString but RFC 4120 restricts them to
    /// IA5 characters, so this is used for both.
    pub fn to_ia5(&self) -> Result<String, FieldError> {
        if !self.content.is_ascii() {
            return Err(FieldError::InvalidString("IA5 string"))
        }
        self.to_utf8()
    }

    /// Converts the content of a Kerberos time.
    ///
    /// KerberosTime is a GeneralizedTime restricted to the form
    /// `YYYYMMDDHHMMSSZ`. The value is returned as the string.
    pub fn to_generalized_time(&self) -> Result<String, FieldError> {
        let content = self.as_slice();
        let valid = content.len() == 15
            && content[..14].iter().all(u8::is_ascii_digit)
            && content[14] == b'Z';
        if !valid {
            return Err(FieldError::InvalidTime)
        }
        self.to_utf8().map_err(|_| FieldError::InvalidTime)
    }

    /// Converts the content of a BIT STRING used for flags.
    ///
    /// Kerberos flags are BIT STRINGs of at least 32 bits where bit zero is
    /// the most significant bit. The first 32 bits are returned as a `u32`
    /// with bit zero in the most significant position. Missing bits are
    /// zero and bits beyond 32 are ignored.
    pub fn to_bit_flags(&self) -> Result<u32, FieldError> {
        let (unused, bits) = match self.as_slice().split_first() {
            Some(some) => some,
            None => return Err(FieldError::InvalidBitString)
        };
        if *unused > 7 || (bits.is_empty() && *unused != 0) {
            return Err(FieldError::InvalidBitString)
        }
        let mut res = [0u8; 4];
        for (target, octet) in res.iter_mut().zip(bits) {
            *target = *octet;
        }
        Ok(u32::from_be_bytes(res))
    }
}


//============ Tests =========================================================
