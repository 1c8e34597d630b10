//! The identifier octets of a BER encoded value.
//!
//! This is a private module. Its public items are re-exported by the parent.

use std::fmt;
use crate::encode::Target;


//------------ Tag -----------------------------------------------------------

/// The tag of a BER encoded value.
///
/// Each BER encoded value starts with a sequence of one or more octets called
/// the _identifier octets._ They encode the class of the tag, its number,
/// and whether the value uses primitive or constructed encoding. Unlike in
/// plain ASN.1, the `Tag` type includes the last bit: grammars dispatch on
/// the complete identifier, so `[0]` as an explicit wrapper and `[0]` as an
/// implicitly tagged OCTET STRING are different tags.
///
/// # Limitations
///
/// Only the low-tag-number form is supported, i.e., tag numbers between 0
/// and 30 that fit into a single identifier octet. None of the protocol
/// structures we decode need more.
//
//  The tag is stored as the single identifier octet.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Tag(u8);

impl Tag {
    /// The mask for checking the class.
    const CLASS_MASK: u8 = 0xc0;

    /// The bit marking constructed encoding.
    const CONSTRUCTED_MASK: u8 = 0x20;

    /// The mask for the tag number.
    ///
    /// If all five bits are set, the high-tag-number form is used.
    const NUMBER_MASK: u8 = 0x1f;

    /// The largest tag number of the low-tag-number form.
    pub const MAX_NUMBER: u8 = 0x1e;

    //--- Universal Tags
    //
    // See clause 8.4 of X.690.

    /// The tag for the BOOLEAN type, UNIVERSAL 1.
    pub const BOOLEAN: Self = Self::universal(1);

    /// The tag for the INTEGER type, UNIVERSAL 2.
    pub const INTEGER: Self = Self::universal(2);

    /// The tag for the BIT STRING type, UNIVERSAL 3.
    pub const BIT_STRING: Self = Self::universal(3);

    /// The tag for the OCTET STRING type, UNIVERSAL 4.
    pub const OCTET_STRING: Self = Self::universal(4);

    /// The tag for the NULL type, UNIVERSAL 5.
    pub const NULL: Self = Self::universal(5);

    /// The tag for the ENUMERATED type, UNIVERSAL 10.
    pub const ENUMERATED: Self = Self::universal(10);

    /// The tag for the UTF8String type, UNIVERSAL 12.
    pub const UTF8_STRING: Self = Self::universal(12);

    /// The tag for the SEQUENCE and SEQUENCE OF types, UNIVERSAL 16.
    ///
    /// This is always constructed.
    pub const SEQUENCE: Self = Self::new(Class::Universal, true, 16);

    /// The tag for the SET and SET OF types, UNIVERSAL 17.
    ///
    /// This is always constructed.
    pub const SET: Self = Self::new(Class::Universal, true, 17);

    /// The tag for the IA5String type, UNIVERSAL 22.
    pub const IA5_STRING: Self = Self::universal(22);

    /// The tag for the GeneralizedTime type, UNIVERSAL 24.
    pub const GENERALIZED_TIME: Self = Self::universal(24);

    /// The tag for the GeneralString type, UNIVERSAL 27.
    pub const GENERAL_STRING: Self = Self::universal(27);
}

impl Tag {
    /// Creates a tag from its class, encoding, and number.
    ///
    /// # Panics
    ///
    /// The function panics if `number` is greater than `Tag::MAX_NUMBER`.
    /// Since tags are almost always constants, this happens at compile
    /// time.
    pub const fn new(class: Class, constructed: bool, number: u8) -> Self {
        assert!(number <= Tag::MAX_NUMBER, "high tag numbers not supported");
        let first = if constructed {
            class.into_u8() | Tag::CONSTRUCTED_MASK
        }
        else {
            class.into_u8()
        };
        Tag(first | number)
    }

    /// Creates a primitive tag in the universal class.
    const fn universal(number: u8) -> Self {
        Self::new(Class::Universal, false, number)
    }

    /// Creates a constructed context specific tag.
    ///
    /// This is the tag of an explicitly tagged field `[number]`.
    pub const fn ctx(number: u8) -> Self {
        Self::new(Class::Context, true, number)
    }

    /// Creates a primitive context specific tag.
    ///
    /// This is the tag of an implicitly tagged primitive field.
    pub const fn ctx_primitive(number: u8) -> Self {
        Self::new(Class::Context, false, number)
    }

    /// Creates a constructed application tag.
    pub const fn application(number: u8) -> Self {
        Self::new(Class::Application, true, number)
    }

    /// Creates a primitive application tag.
    pub const fn application_primitive(number: u8) -> Self {
        Self::new(Class::Application, false, number)
    }

    /// Creates a tag from an identifier octet.
    ///
    /// Returns `None` if the octet announces the high-tag-number form.
    pub const fn from_octet(octet: u8) -> Option<Self> {
        if octet & Tag::NUMBER_MASK == Tag::NUMBER_MASK {
            None
        }
        else {
            Some(Tag(octet))
        }
    }

    /// Returns the identifier octet.
    pub const fn to_octet(self) -> u8 {
        self.0
    }

    /// Returns the class of the tag.
    pub const fn class(self) -> Class {
        Class::from_u8(self.0)
    }

    /// Returns whether the value is encoded in constructed form.
    pub const fn is_constructed(self) -> bool {
        self.0 & Tag::CONSTRUCTED_MASK != 0
    }

    /// Returns the number of the tag.
    pub const fn number(self) -> u8 {
        self.0 & Tag::NUMBER_MASK
    }

    /// Returns the same tag with constructed encoding.
    pub const fn into_constructed(self) -> Self {
        Tag(self.0 | Tag::CONSTRUCTED_MASK)
    }

    /// Returns the same tag with primitive encoding.
    pub const fn into_primitive(self) -> Self {
        Tag(self.0 & !Tag::CONSTRUCTED_MASK)
    }

    /// Returns the number of octets of the encoded form of the tag.
    pub const fn encoded_len(self) -> usize {
        1
    }

    /// Writes the identifier octet to a target.
    pub fn write_encoded<T: Target>(self, target: &mut T) {
        target.append_u8(self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.into_primitive() {
            Tag::BOOLEAN => write!(f, "BOOLEAN"),
            Tag::INTEGER => write!(f, "INTEGER"),
            Tag::BIT_STRING => write!(f, "BIT STRING"),
            Tag::OCTET_STRING => write!(f, "OCTET STRING"),
            Tag::NULL => write!(f, "NULL"),
            Tag::ENUMERATED => write!(f, "ENUMERATED"),
            Tag::UTF8_STRING => write!(f, "UTF8String"),
            tag if tag == Tag::SEQUENCE.into_primitive() => {
                write!(f, "SEQUENCE")
            }
            tag if tag == Tag::SET.into_primitive() => write!(f, "SET"),
            Tag::IA5_STRING => write!(f, "IA5String"),
            Tag::GENERALIZED_TIME => write!(f, "GeneralizedTime"),
            Tag::GENERAL_STRING => write!(f, "GeneralString"),
            tag => {
                match tag.class() {
                    Class::Universal => write!(f, "[UNIVERSAL ")?,
                    Class::Application => write!(f, "[APPLICATION ")?,
                    Class::Context => write!(f, "[")?,
                    Class::Private => write!(f, "[PRIVATE ")?,
                }
                write!(f, "{}]", tag.number())
            }
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({} - 0x{:02x})", self, self.0)
    }
}


//------------ Class ---------------------------------------------------------

/// The class of a tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Class {
    Universal,
    Application,
    Context,
    Private,
}

impl Class {
    const fn from_u8(octet: u8) -> Self {
        match octet & Tag::CLASS_MASK {
            0x00 => Self::Universal,
            0x40 => Self::Application,
            0x80 => Self::Context,
            _ => Self::Private
        }
    }

    const fn into_u8(self) -> u8 {
        match self {
            Self::Universal => 0x00,
            Self::Application => 0x40,
            Self::Context => 0x80,
            Self::Private => 0xC0,
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identifier_octets() {
        assert_eq!(Tag::SEQUENCE.to_octet(), 0x30);
        assert_eq!(Tag::INTEGER.to_octet(), 0x02);
        assert_eq!(Tag::ctx(0).to_octet(), 0xa0);
        assert_eq!(Tag::ctx(3).to_octet(), 0xa3);
        assert_eq!(Tag::ctx_primitive(0).to_octet(), 0x80);
        assert_eq!(Tag::application(1).to_octet(), 0x61);
        assert_eq!(Tag::application(10).to_octet(), 0x6a);
        assert_eq!(Tag::application_primitive(2).to_octet(), 0x42);
    }

    #[test]
    fn parts() {
        for (class, octet) in [
            (Class::Universal, 0x00), (Class::Application, 0x40),
            (Class::Context, 0x80), (Class::Private, 0xc0),
        ] {
            for number in [0, 1, 15, Tag::MAX_NUMBER] {
                let tag = Tag::new(class, true, number);
                assert_eq!(tag.class(), class);
                assert_eq!(tag.number(), number);
                assert!(tag.is_constructed());
                assert_eq!(tag.to_octet(), octet | 0x20 | number);
                assert!(!tag.into_primitive().is_constructed());
                assert_eq!(Tag::from_octet(tag.to_octet()), Some(tag));
            }
        }
    }

    #[test]
    fn high_tag_number_form() {
        assert_eq!(Tag::from_octet(0x1f), None);
        assert_eq!(Tag::from_octet(0xbf), None);
        assert_eq!(Tag::from_octet(0x1e), Some(Tag::new(
            Class::Universal, false, 30
        )));
    }

    #[test]
    fn display() {
        assert_eq!(Tag::SEQUENCE.to_string(), "SEQUENCE");
        assert_eq!(Tag::OCTET_STRING.to_string(), "OCTET STRING");
        assert_eq!(Tag::ctx(2).to_string(), "[2]");
        assert_eq!(Tag::application(1).to_string(), "[APPLICATION 1]");
    }
}
