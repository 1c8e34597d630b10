//! BER encoded integers.
//!
//! Protocol fields in Kerberos and LDAP are all small integers, so instead
//! of a big integer type, this module provides conversions between the
//! content octets of an INTEGER and Rust’s built-in integer types.
//!
//! # BER Encoding
//!
//! In BER, an INTEGER is encoded as a primitive value with the content octets
//! providing a variable-length, big-endian, two‘s complement byte sequence of
//! that integer. Thus, the most-significant bit of the first octet serves as
//! the sign bit. The content must be at least one octet long and must use
//! the smallest possible number of octets. The same applies to ENUMERATED.

use crate::decode::FieldError;
use crate::encode::{PrimitiveContent, Target};
use crate::tag::Tag;


//------------ Decoding ------------------------------------------------------

/// Checks that an integer is started correctly.
///
/// Specifically, checks that there is at least one octet and that the
/// first nine bits of a multi-octet integer are not all the same.
fn check_head(content: &[u8]) -> Result<(), FieldError> {
    match (content.first(), content.get(1).map(|x| x & 0x80 != 0)) {
        (None, _) => Err(FieldError::InvalidInteger),
        (Some(0), Some(false)) => Err(FieldError::InvalidInteger),
        (Some(0xFF), Some(true)) => Err(FieldError::InvalidInteger),
        _ => Ok(())
    }
}

/// Decodes the content octets of an INTEGER into an `i64`.
pub fn i64_from_content(content: &[u8]) -> Result<i64, FieldError> {
    check_head(content)?;
    if content.len() > 8 {
        return Err(FieldError::IntegerRange)
    }
    // Sign-extend from the first octet, then shift the rest in.
    let mut res = i64::from(content[0] as i8);
    for &octet in &content[1..] {
        res = (res << 8) | i64::from(octet);
    }
    Ok(res)
}

/// Decodes the content octets of an INTEGER into an `i32`.
pub fn i32_from_content(content: &[u8]) -> Result<i32, FieldError> {
    i32::try_from(
        i64_from_content(content)?
    ).map_err(|_| FieldError::IntegerRange)
}

/// Decodes the content octets of an INTEGER into a `u32`.
///
/// The integer must not be negative.
pub fn u32_from_content(content: &[u8]) -> Result<u32, FieldError> {
    u32::try_from(
        i64_from_content(content)?
    ).map_err(|_| FieldError::IntegerRange)
}


//------------ Encoding ------------------------------------------------------

/// Returns the minimal content octets of a two’s complement integer.
///
/// `octets` is the big-endian representation of the value.
fn minimal(octets: &[u8]) -> &[u8] {
    let mut start = 0;
    while start + 1 < octets.len() {
        let (first, second) = (octets[start], octets[start + 1]);
        if (first == 0 && second & 0x80 == 0)
            || (first == 0xFF && second & 0x80 != 0)
        {
            start += 1;
        }
        else {
            break
        }
    }
    &octets[start..]
}

macro_rules! signed_content {
    ( $type:ident ) => {
        impl PrimitiveContent for $type {
            const TAG: Tag = Tag::INTEGER;

            fn encoded_len(self) -> usize {
                minimal(&self.to_be_bytes()).len()
            }

            fn write_encoded<T: Target>(self, target: &mut T) {
                target.append_slice(minimal(&self.to_be_bytes()))
            }
        }
    }
}

// Unsigned values are widened so there is room for a zero sign octet.
macro_rules! unsigned_content {
    ( $type:ident, $wide:ident ) => {
        impl PrimitiveContent for $type {
            const TAG: Tag = Tag::INTEGER;

            fn encoded_len(self) -> usize {
                $wide::from(self).encoded_len()
            }

            fn write_encoded<T: Target>(self, target: &mut T) {
                $wide::from(self).write_encoded(target)
            }
        }
    }
}

signed_content!(i8);
signed_content!(i16);
signed_content!(i32);
signed_content!(i64);
signed_content!(i128);
unsigned_content!(u8, i16);
unsigned_content!(u16, i32);
unsigned_content!(u32, i64);
unsigned_content!(u64, i128);


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_signed() {
        assert_eq!(i32_from_content(b"\x00"), Ok(0));
        assert_eq!(i32_from_content(b"\x01"), Ok(1));
        assert_eq!(i32_from_content(b"\x7f"), Ok(127));
        assert_eq!(i32_from_content(b"\x00\x80"), Ok(128));
        assert_eq!(i32_from_content(b"\xff"), Ok(-1));
        assert_eq!(i32_from_content(b"\x80"), Ok(-128));
        assert_eq!(i32_from_content(b"\xff\x7f"), Ok(-129));
        assert_eq!(
            i32_from_content(b"\x7f\xff\xff\xff"), Ok(i32::MAX)
        );
        assert_eq!(
            i32_from_content(b"\x80\x00\x00\x00"), Ok(i32::MIN)
        );
    }

    #[test]
    fn decode_failures() {
        assert_eq!(i32_from_content(b""), Err(FieldError::InvalidInteger));
        assert_eq!(
            i32_from_content(b"\x00\x7f"), Err(FieldError::InvalidInteger)
        );
        assert_eq!(
            i32_from_content(b"\xff\x80"), Err(FieldError::InvalidInteger)
        );
        assert_eq!(
            i32_from_content(b"\x00\x80\x00\x00\x00"),
            Err(FieldError::IntegerRange)
        );
        assert_eq!(
            i64_from_content(b"\x01\x00\x00\x00\x00\x00\x00\x00\x00"),
            Err(FieldError::IntegerRange)
        );
        assert_eq!(u32_from_content(b"\xff"), Err(FieldError::IntegerRange));
        assert_eq!(
            u32_from_content(b"\x00\xff\xff\xff\xff"), Ok(u32::MAX)
        );
    }

    #[test]
    fn encode() {
        assert_eq!(0i32.encode_to_vec(), b"\x00");
        assert_eq!(127i32.encode_to_vec(), b"\x7f");
        assert_eq!(128i32.encode_to_vec(), b"\x00\x80");
        assert_eq!((-1i32).encode_to_vec(), b"\xff");
        assert_eq!((-129i32).encode_to_vec(), b"\xff\x7f");
        assert_eq!(0x8000_0000u32.encode_to_vec(), b"\x00\x80\x00\x00\x00");
        assert_eq!(u64::MAX.encode_to_vec(), b"\x00\xff\xff\xff\xff\xff\xff\xff\xff");
    }

    #[test]
    fn encode_decode() {
        for value in [0, 1, -1, 127, 128, -128, -129, 0x1234, i32::MAX, i32::MIN] {
            assert_eq!(i32_from_content(&value.encode_to_vec()), Ok(value));
        }
    }
}
