//! LDAP messages.
//!
//! This module covers the part of [RFC 4511] needed to authenticate a
//! client: the [`LdapMessage`] envelope with bind, unbind and abandon
//! requests, bind responses and controls. Bind names are parsed into a
//! [`Dn`] as defined in [RFC 4514] so that an
//! [`Authenticator`][crate::auth::Authenticator] can look at them.
//!
//! As with the Kerberos types, each type has its grammar in a static of the
//! type’s name in upper case. Use [`LDAP_MESSAGE`] to decode a stream of
//! messages.
//!
//! [RFC 4511]: https://tools.ietf.org/html/rfc4511
//! [RFC 4514]: https://tools.ietf.org/html/rfc4514

pub use self::dn::{Ava, Dn, DnError, Rdn};
pub use self::message::{
    BIND_REQUEST, BIND_RESPONSE, CONTROL, LDAP_MESSAGE,
    Authentication, BindRequest, BindRequestState, BindResponse,
    BindResponseState, Control, ControlState, LdapMessage, LdapMessageState,
    ProtocolOp,
};

mod dn;
mod message;
