//! Decoding BER encoded messages.
//!
//! Decoding is driven by a [`Grammar`][crate::grammar::Grammar] describing
//! the structure of a message. A [`Decoder`] takes the encoded data in
//! chunks as it arrives from the network, reads the header of each encoded
//! value, and looks up what to do with it in the grammar. Content of
//! primitive values is handed to the grammar’s actions as a [`Primitive`].
//!
//! Every problem with the data results in a [`DecodeError`] that ends
//! decoding for good. There is no attempt at recovery: the data of a
//! session that failed to decode can’t be trusted anymore.

pub use self::engine::{DecodeStatus, Decoder};
pub use self::error::{DecodeError, FieldError, Pos};
pub use self::header::Header;
pub use self::primitive::Primitive;

#[doc(hidden)]
pub use self::frame::{Dispatch, Frame, GrammarFrame};

mod engine;
mod error;
mod frame;
mod header;
mod primitive;
