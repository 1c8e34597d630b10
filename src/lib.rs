//! Grammar-driven streaming decoding of BER encoded protocol messages.
//!
//! This crate decodes the messages of protocols encoded in the Basic
//! Encoding Rules of [X.690] as they arrive over the network, in chunks of
//! any size. Instead of decoding by hand-written code, every message type
//! is described by a [grammar]: a table of transitions between states
//! triggered by the tags of the encoded values. The decoder in [`decode`]
//! walks the grammar while keeping track of the nested lengths and builds
//! the message as it goes. The same grammar can be used by any number of
//! decoders at the same time.
//!
//! Grammars are provided for the requests a Kerberos KDC receives in
//! [`kerberos`] and for binding to an LDAP server in [`ldap`]. Messages
//! can be encoded again via the [`encode`] module. The [`session`] module
//! packages a decoder and an encoder for use in a protocol server and
//! [`auth`] decides on anonymous binds.
//!
//! Only definite length values with tag numbers below 31 are supported.
//! This is all the supported protocols need.
//!
//! [X.690]: https://www.itu.int/rec/T-REC-X.690/

pub use self::config::DecoderConfig;
pub use self::length::Length;
pub use self::mode::Mode;
pub use self::tag::Tag;

pub mod auth;
pub mod config;
pub mod decode;
pub mod encode;
pub mod grammar;
pub mod int;
pub mod kerberos;
pub mod ldap;
pub mod mode;
pub mod session;
pub mod tag;

mod length;
