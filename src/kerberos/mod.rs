//! Kerberos messages.
//!
//! This module contains the types and grammars for the Kerberos structures
//! a KDC needs to decode requests as defined in [RFC 4120] as well as the
//! data of the set/change password protocol from [RFC 3244].
//!
//! Each type comes with a grammar in a static of the type’s name in upper
//! case, e.g., [`ENCRYPTION_KEY`] for [`EncryptionKey`]. The grammars of
//! the larger structures refer to those of the smaller ones, so decoding a
//! [`KdcReq`] with a [`Decoder`][crate::decode::Decoder] using [`KDC_REQ`]
//! produces the complete request. All types implement
//! [`Encode`][crate::encode::Encode] for the way back.
//!
//! Kerberos doesn’t do any cryptography here. Encrypted parts are kept as
//! opaque octets.
//!
//! [RFC 4120]: https://tools.ietf.org/html/rfc4120
//! [RFC 3244]: https://tools.ietf.org/html/rfc3244

pub use self::changepw::{
    CHANGE_PASSWD_DATA, ChangePasswdData, ChangePasswdDataState,
};
pub use self::flags::KerberosFlags;
pub use self::kdc_req::{
    HOST_ADDRESS, KDC_REQ, KDC_REQ_BODY, PA_DATA,
    HostAddress, HostAddressState, KdcReq, KdcReqBody, KdcReqBodyState,
    KdcReqState, PaData, PaDataState,
};
pub use self::key::{
    ENCRYPTED_DATA, ENCRYPTION_KEY, EncryptedData, EncryptedDataState,
    EncryptionKey, EncryptionKeyState,
};
pub use self::principal::{PRINCIPAL_NAME, PrincipalName, PrincipalNameState};
pub use self::ticket::{TICKET, Ticket, TicketState};

mod changepw;
mod flags;
mod kdc_req;
mod key;
mod principal;
mod ticket;

use crate::decode::{FieldError, Primitive};


//------------ Constants -----------------------------------------------------

/// The protocol version number.
///
/// This is the only value allowed for `pvno` and `tkt-vno`.
pub const PVNO: i32 = 5;


//------------ MessageType ---------------------------------------------------

/// The type of a KDC request.
///
/// The value is both the number of the application tag of the request and
/// the value of its `msg-type` field.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MessageType {
    /// An initial authentication request.
    #[default]
    AsReq,

    /// A ticket granting service request.
    TgsReq,
}

impl MessageType {
    /// Returns the integer value of the message type.
    pub fn to_i32(self) -> i32 {
        match self {
            MessageType::AsReq => 10,
            MessageType::TgsReq => 12,
        }
    }

    /// Returns the message type for an integer value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            10 => Some(MessageType::AsReq),
            12 => Some(MessageType::TgsReq),
            _ => None
        }
    }
}


//------------ Helpers for actions -------------------------------------------

/// Decodes a protocol version number which must be 5.
fn check_pvno(prim: &Primitive) -> Result<(), FieldError> {
    if prim.to_i32()? == PVNO {
        Ok(())
    }
    else {
        Err(FieldError::Unexpected("protocol version must be 5"))
    }
}

/// Decodes a KerberosString.
///
/// This is a GeneralString restricted to IA5 characters.
fn kerberos_string(prim: &Primitive) -> Result<String, FieldError> {
    prim.to_ia5()
}
