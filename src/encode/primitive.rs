//! Primitive values.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use bytes::Bytes;
use crate::tag::Tag;
use super::target::Target;
use super::values::{Values, total_len, write_header};


//------------ PrimitiveContent ----------------------------------------------

/// A type encoded as the content of a primitive value.
///
/// Implementing types only need to say how their content octets look and
/// get [`encode`][Self::encode] and [`encode_as`][Self::encode_as] for
/// free which produce the complete value.
///
/// The trait requires `Copy` so that the value encoder can hold the value
/// itself. For types that aren’t `Copy`, implement it for a reference.
pub trait PrimitiveContent: Copy {
    /// The universal tag used by [`encode`][Self::encode].
    const TAG: Tag;

    /// Returns the number of content octets.
    fn encoded_len(self) -> usize;

    /// Appends the content octets to `target`.
    fn write_encoded<T: Target>(self, target: &mut T);

    /// Returns the encoder for a value with the universal tag.
    fn encode(self) -> Primitive<Self> {
        self.encode_as(Self::TAG)
    }

    /// Returns the encoder for a value with the given tag.
    ///
    /// This is how implicitly tagged fields are encoded. The constructed
    /// bit is cleared from `tag`.
    fn encode_as(self, tag: Tag) -> Primitive<Self> {
        Primitive { tag: tag.into_primitive(), content: self }
    }

    /// Returns the content octets in a new vec.
    fn encode_to_vec(self) -> Vec<u8> {
        let mut res = Vec::with_capacity(self.encoded_len());
        self.write_encoded(&mut res);
        res
    }
}

// See crate::int for the integer types.

/// NULL has no content.
impl PrimitiveContent for () {
    const TAG: Tag = Tag::NULL;

    fn encoded_len(self) -> usize {
        0
    }

    fn write_encoded<T: Target>(self, _: &mut T) { }
}

/// DER requires all bits set for true.
impl PrimitiveContent for bool {
    const TAG: Tag = Tag::BOOLEAN;

    fn encoded_len(self) -> usize {
        1
    }

    fn write_encoded<T: Target>(self, target: &mut T) {
        target.append_u8(if self { 0xFF } else { 0 })
    }
}

impl PrimitiveContent for &'_ [u8] {
    const TAG: Tag = Tag::OCTET_STRING;

    fn encoded_len(self) -> usize {
        self.len()
    }

    fn write_encoded<T: Target>(self, target: &mut T) {
        target.append_slice(self)
    }
}

impl PrimitiveContent for &'_ Bytes {
    const TAG: Tag = Tag::OCTET_STRING;

    fn encoded_len(self) -> usize {
        self.len()
    }

    fn write_encoded<T: Target>(self, target: &mut T) {
        target.append_slice(self)
    }
}

/// Strings encode as UTF8String by default.
///
/// Kerberos strings are GeneralString and LDAP strings are OCTET STRING, so
/// these will mostly use `encode_as`.
impl PrimitiveContent for &'_ str {
    const TAG: Tag = Tag::UTF8_STRING;

    fn encoded_len(self) -> usize {
        self.len()
    }

    fn write_encoded<T: Target>(self, target: &mut T) {
        target.append_slice(self.as_bytes())
    }
}


//------------ Primitive -----------------------------------------------------

/// The encoder for a single primitive value.
pub struct Primitive<P> {
    tag: Tag,
    content: P,
}

impl<P: PrimitiveContent> Values for Primitive<P> {
    fn encoded_len(&self) -> usize {
        total_len(self.tag, self.content.encoded_len())
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        write_header(target, self.tag, self.content.encoded_len());
        self.content.write_encoded(target)
    }
}


//============ Tests =========================================================
