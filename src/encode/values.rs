//! Value encoders.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use bytes::{Bytes, BytesMut};
use crate::length::Length;
use crate::tag::Tag;
use super::target::Target;


//------------ Values --------------------------------------------------------

/// A value encoder.
///
/// A value encoder produces zero or more complete encoded values. Since a
/// constructed value needs the length of its content in its header before
/// the content itself, encoding happens in two passes. First, lengths are
/// collected bottom-up via [`encoded_len`][Self::encoded_len]. Then the
/// octets are written top-down via [`write_encoded`][Self::write_encoded].
pub trait Values {
    /// Returns the number of octets the encoder produces.
    fn encoded_len(&self) -> usize;

    /// Appends the encoded values to `target`.
    fn write_encoded<T: Target>(&self, target: &mut T);


    //--- Provided methods

    /// Wraps the values into a constructed value with the given tag.
    ///
    /// This is how explicitly tagged fields are encoded.
    fn explicit(self, tag: Tag) -> Constructed<Self>
    where Self: Sized {
        Constructed::new(tag, self)
    }

    /// Encodes into a new vec.
    fn to_vec(&self) -> Vec<u8> {
        let mut target = Vec::with_capacity(self.encoded_len());
        self.write_encoded(&mut target);
        target
    }

    /// Encodes into a new bytes value.
    fn to_bytes(&self) -> Bytes {
        let mut target = BytesMut::with_capacity(self.encoded_len());
        self.write_encoded(&mut target);
        target.freeze()
    }
}

impl<V: Values> Values for &'_ V {
    fn encoded_len(&self) -> usize {
        (**self).encoded_len()
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        (**self).write_encoded(target)
    }
}

/// An absent OPTIONAL field encodes as nothing.
impl<V: Values> Values for Option<V> {
    fn encoded_len(&self) -> usize {
        self.as_ref().map_or(0, Values::encoded_len)
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        if let Some(inner) = self {
            inner.write_encoded(target)
        }
    }
}


//--- Tuples
//
// A tuple encodes its elements one after another. This is how the
// components of a SEQUENCE are put together.

macro_rules! tuple_values {
    ( $( ( $( $name:ident . $idx:tt ),+ ) )* ) => {
        $(
            impl<$( $name: Values ),+> Values for ( $( $name, )+ ) {
                fn encoded_len(&self) -> usize {
                    0 $( + self.$idx.encoded_len() )+
                }

                fn write_encoded<T: Target>(&self, target: &mut T) {
                    $( self.$idx.write_encoded(target); )+
                }
            }
        )*
    }
}

// KDC-REQ-BODY has the most fields with twelve.
tuple_values! {
    (A.0)
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
    (A.0, B.1, C.2, D.3, E.4)
    (A.0, B.1, C.2, D.3, E.4, F.5)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10, L.11)
}


//------------ Constructed ---------------------------------------------------

/// A constructed value with definite length.
pub struct Constructed<V> {
    /// The tag with the constructed bit set.
    tag: Tag,

    /// The encoder for the content.
    inner: V,
}

impl<V> Constructed<V> {
    /// Creates a constructed value with the given tag and content.
    ///
    /// The constructed bit is set on `tag` if it isn’t already.
    pub fn new(tag: Tag, inner: V) -> Self {
        Constructed { tag: tag.into_constructed(), inner }
    }
}

impl<V: Values> Values for Constructed<V> {
    fn encoded_len(&self) -> usize {
        total_len(self.tag, self.inner.encoded_len())
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        write_header(target, self.tag, self.inner.encoded_len());
        self.inner.write_encoded(target)
    }
}


//------------ Iter ----------------------------------------------------------

/// The elements of a SEQUENCE OF.
///
/// This wraps an iterator over value encoders. As the elements are visited
/// twice, once for each pass, the iterator needs to be `Clone`.
pub struct Iter<I>(I);

/// Creates a value encoder from an iterator over value encoders.
pub fn iter<I>(iter: I) -> Iter<I> {
    Iter(iter)
}

impl<I> Values for Iter<I>
where I: Clone + Iterator, I::Item: Values {
    fn encoded_len(&self) -> usize {
        self.0.clone().map(|item| item.encoded_len()).sum()
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        self.0.clone().for_each(|item| item.write_encoded(target))
    }
}


//------------ Choice2 and Choice4 -------------------------------------------

/// The encoder of a CHOICE between two alternatives.
///
/// An `encode` method of an enum can return this type with a different
/// encoder type in each variant.
pub enum Choice2<A, B> {
    One(A),
    Two(B),
}

impl<A: Values, B: Values> Values for Choice2<A, B> {
    fn encoded_len(&self) -> usize {
        match self {
            Choice2::One(inner) => inner.encoded_len(),
            Choice2::Two(inner) => inner.encoded_len(),
        }
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        match self {
            Choice2::One(inner) => inner.write_encoded(target),
            Choice2::Two(inner) => inner.write_encoded(target),
        }
    }
}

/// The encoder of a CHOICE between four alternatives.
pub enum Choice4<A, B, C, D> {
    One(A),
    Two(B),
    Three(C),
    Four(D),
}

impl<A, B, C, D> Values for Choice4<A, B, C, D>
where A: Values, B: Values, C: Values, D: Values {
    fn encoded_len(&self) -> usize {
        match self {
            Choice4::One(inner) => inner.encoded_len(),
            Choice4::Two(inner) => inner.encoded_len(),
            Choice4::Three(inner) => inner.encoded_len(),
            Choice4::Four(inner) => inner.encoded_len(),
        }
    }

    fn write_encoded<T: Target>(&self, target: &mut T) {
        match self {
            Choice4::One(inner) => inner.write_encoded(target),
            Choice4::Two(inner) => inner.write_encoded(target),
            Choice4::Three(inner) => inner.write_encoded(target),
            Choice4::Four(inner) => inner.write_encoded(target),
        }
    }
}


//============ Functions =====================================================

/// Returns the encoder for a SEQUENCE with the given components.
pub fn sequence<V: Values>(inner: V) -> Constructed<V> {
    Constructed::new(Tag::SEQUENCE, inner)
}

/// Returns the encoder for an implicitly tagged SEQUENCE.
///
/// This is used for the application tags of Kerberos and LDAP messages.
pub fn sequence_as<V: Values>(tag: Tag, inner: V) -> Constructed<V> {
    Constructed::new(tag, inner)
}

/// Returns the total length of a value with the given content length.
pub fn total_len(tag: Tag, content_len: usize) -> usize {
    tag.encoded_len() + Length::new(content_len).encoded_len() + content_len
}

/// Writes identifier and length octets.
pub fn write_header<T: Target>(target: &mut T, tag: Tag, content_len: usize) {
    tag.write_encoded(target);
    Length::new(content_len).write_encoded(target)
}


//============ Tests =========================================================
