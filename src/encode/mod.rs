//! Encoding data in BER.
//!
//! This module provides means to encode data in BER. The decoder only
//! accepts definite length values, so this is all the encoder produces,
//! always in the minimal form DER requires.
//!
//! Encoding is done using helper types called _encoders_ that represent the
//! structure of the BER encoding. These types implement the trait
//! [`Values`]. A type that can be encoded as BER provides a method named
//! `encode` that produces a value of its encoder type representing the
//! value’s encoding. Message types do this via the [`Encode`] trait so that
//! a session codec can encode whatever messages it deals with.
//!
//! The trait [`PrimitiveContent`] helps with producing encoders for types
//! that use the primitive encoding.

pub use self::primitive::{PrimitiveContent, Primitive};
pub use self::target::Target;
pub use self::values::{
    Values, Choice2, Choice4, Constructed, Iter,
    iter, sequence, sequence_as, total_len, write_header,
};

mod primitive;
mod target;
mod values;


//------------ Encode --------------------------------------------------------

/// A message type that can be encoded.
pub trait Encode {
    /// Returns a value encoder for the message.
    fn encode(&self) -> impl Values + '_;

    /// Encodes the message into a bytes value.
    fn encode_to_bytes(&self) -> bytes::Bytes {
        self.encode().to_bytes()
    }
}
