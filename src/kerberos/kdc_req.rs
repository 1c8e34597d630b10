//! KDC requests.

use bytes::Bytes;
use once_cell::sync::Lazy;
use crate::encode::{
    Encode, PrimitiveContent, Values, iter, sequence, sequence_as
};
use crate::decode::{FieldError, Primitive};
use crate::grammar::{Action, Grammar};
use crate::states;
use crate::tag::Tag;
use super::flags::KerberosFlags;
use super::key::{ENCRYPTED_DATA, EncryptedData};
use super::principal::{PRINCIPAL_NAME, PrincipalName};
use super::ticket::{TICKET, Ticket};
use super::{MessageType, PVNO, check_pvno, kerberos_string};


//------------ PaData --------------------------------------------------------

/// Pre-authentication data.
///
/// ```text
/// PA-DATA         ::= SEQUENCE {
///         -- NOTE: first tag is [1], not [0]
///         padata-type     [1] Int32,
///         padata-value    [2] OCTET STRING
/// }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PaData {
    /// The type of the data.
    pub padata_type: i32,

    /// The data itself.
    pub padata_value: Bytes,
}

impl Encode for PaData {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.padata_type.encode().explicit(Tag::ctx(1)),
            (&self.padata_value).encode().explicit(Tag::ctx(2)),
        ))
    }
}

states! {
    /// The states of the [`PA_DATA`] grammar.
    pub enum PaDataState {
        Start, Seq, TypeTag, Type, ValueTag, Value,
    }
}

/// The grammar for [`PaData`].
pub static PA_DATA: Lazy<Grammar<PaData, PaDataState>> = Lazy::new(|| {
    use self::PaDataState::*;

    Grammar::<PaData, _>::builder("PA-DATA", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(Seq, Tag::ctx(1), TypeTag, Action::CheckNotEmpty)
        .transition(
            TypeTag, Tag::INTEGER, Type,
            Action::Set(|padata, prim| {
                padata.padata_type = prim.to_i32()?;
                Ok(())
            })
        )
        .transition(Type, Tag::ctx(2), ValueTag, Action::CheckNotEmpty)
        .transition(
            ValueTag, Tag::OCTET_STRING, Value,
            Action::Set(|padata, prim| {
                padata.padata_value = prim.to_bytes();
                Ok(())
            })
        )
        .accept(Value)
        .build()
});


//------------ HostAddress ---------------------------------------------------

/// The address of a host.
///
/// ```text
/// HostAddress     ::= SEQUENCE  {
///         addr-type       [0] Int32,
///         address         [1] OCTET STRING
/// }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HostAddress {
    /// The type of the address.
    pub addr_type: i32,

    /// The address octets.
    pub address: Bytes,
}

impl HostAddress {
    /// The address type of an IPv4 address.
    pub const IPV4: i32 = 2;

    /// The address type of an IPv6 address.
    pub const IPV6: i32 = 24;
}

impl Encode for HostAddress {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.addr_type.encode().explicit(Tag::ctx(0)),
            (&self.address).encode().explicit(Tag::ctx(1)),
        ))
    }
}

states! {
    /// The states of the [`HOST_ADDRESS`] grammar.
    pub enum HostAddressState {
        Start, Seq, TypeTag, Type, AddressTag, Address,
    }
}

/// The grammar for [`HostAddress`].
pub static HOST_ADDRESS: Lazy<
    Grammar<HostAddress, HostAddressState>
> = Lazy::new(|| {
    use self::HostAddressState::*;

    Grammar::<HostAddress, _>::builder("HostAddress", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(Seq, Tag::ctx(0), TypeTag, Action::CheckNotEmpty)
        .transition(
            TypeTag, Tag::INTEGER, Type,
            Action::Set(|addr, prim| {
                addr.addr_type = prim.to_i32()?;
                Ok(())
            })
        )
        .transition(Type, Tag::ctx(1), AddressTag, Action::CheckNotEmpty)
        .transition(
            AddressTag, Tag::OCTET_STRING, Address,
            Action::SetNonEmpty(|addr, prim| {
                addr.address = prim.to_bytes();
                Ok(())
            })
        )
        .accept(Address)
        .build()
});


//------------ KdcReqBody ----------------------------------------------------

/// The body of a KDC request.
///
/// ```text
/// KDC-REQ-BODY    ::= SEQUENCE {
///         kdc-options             [0] KDCOptions,
///         cname                   [1] PrincipalName OPTIONAL
///                                     -- Used only in AS-REQ --,
///         realm                   [2] Realm
///                                     -- Server's realm
///                                     -- Also client's in AS-REQ --,
///         sname                   [3] PrincipalName OPTIONAL,
///         from                    [4] KerberosTime OPTIONAL,
///         till                    [5] KerberosTime,
///         rtime                   [6] KerberosTime OPTIONAL,
///         nonce                   [7] UInt32,
///         etype                   [8] SEQUENCE OF Int32 -- EncryptionType
///                                     -- in preference order --,
///         addresses               [9] HostAddresses OPTIONAL,
///         enc-authorization-data  [10] EncryptedData OPTIONAL
///                                     -- AuthorizationData --,
///         additional-tickets      [11] SEQUENCE OF Ticket OPTIONAL
///                                        -- NOTE: not empty
/// }
/// ```
///
/// Times are kept in their encoded form `YYYYMMDDHHMMSSZ`. The optional
/// sequences are represented by empty vecs when absent. They are never
/// encoded empty and are rejected if they are empty on the wire. The
/// mandatory `etype` may be empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KdcReqBody {
    pub kdc_options: KerberosFlags,
    pub cname: Option<PrincipalName>,
    pub realm: String,
    pub sname: Option<PrincipalName>,
    pub from: Option<String>,
    pub till: String,
    pub rtime: Option<String>,
    pub nonce: u32,

    /// The requested encryption types in order of preference.
    pub etype: Vec<i32>,

    pub addresses: Vec<HostAddress>,
    pub enc_authorization_data: Option<EncryptedData>,
    pub additional_tickets: Vec<Ticket>,
}

/// Returns an encoder for a KerberosTime.
fn time(value: &str) -> impl Values + '_ {
    value.encode_as(Tag::GENERALIZED_TIME)
}

impl Encode for KdcReqBody {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.kdc_options.encode().explicit(Tag::ctx(0)),
            self.cname.as_ref().map(|name| {
                name.encode().explicit(Tag::ctx(1))
            }),
            self.realm.as_str().encode_as(
                Tag::GENERAL_STRING
            ).explicit(Tag::ctx(2)),
            self.sname.as_ref().map(|name| {
                name.encode().explicit(Tag::ctx(3))
            }),
            self.from.as_deref().map(|from| {
                time(from).explicit(Tag::ctx(4))
            }),
            time(&self.till).explicit(Tag::ctx(5)),
            self.rtime.as_deref().map(|rtime| {
                time(rtime).explicit(Tag::ctx(6))
            }),
            self.nonce.encode().explicit(Tag::ctx(7)),
            sequence(
                iter(self.etype.iter().map(|&etype| etype.encode()))
            ).explicit(Tag::ctx(8)),
            if self.addresses.is_empty() {
                None
            }
            else {
                Some(sequence(
                    iter(self.addresses.iter().map(HostAddress::encode))
                ).explicit(Tag::ctx(9)))
            },
            self.enc_authorization_data.as_ref().map(|data| {
                data.encode().explicit(Tag::ctx(10))
            }),
            if self.additional_tickets.is_empty() {
                None
            }
            else {
                Some(sequence(
                    iter(self.additional_tickets.iter().map(Ticket::encode))
                ).explicit(Tag::ctx(11)))
            },
        ))
    }
}

/// Decodes a KerberosTime.
fn kerberos_time(prim: &Primitive) -> Result<String, FieldError> {
    prim.to_generalized_time()
}

states! {
    /// The states of the [`KDC_REQ_BODY`] grammar.
    pub enum KdcReqBodyState {
        Start, Seq, OptionsTag, Options, Cname, RealmTag, Realm, Sname,
        FromTag, FromTime, TillTag, Till, RtimeTag, Rtime, NonceTag, Nonce,
        EtypeTag, EtypeSeq, Etype, AddressesTag, AddressesSeq, Addresses,
        EncAuthData, TicketsTag, TicketsSeq, Tickets,
    }
}

/// The grammar for [`KdcReqBody`].
pub static KDC_REQ_BODY: Lazy<
    Grammar<KdcReqBody, KdcReqBodyState>
> = Lazy::new(|| {
    use self::KdcReqBodyState::*;

    let mut builder = Grammar::<KdcReqBody, _>::builder(
        "KDC-REQ-BODY", Start
    )
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)

        // kdc-options
        .transition(Seq, Tag::ctx(0), OptionsTag, Action::CheckNotEmpty)
        .transition(
            OptionsTag, Tag::BIT_STRING, Options,
            Action::Set(|body, prim| {
                body.kdc_options = KerberosFlags::from_bits(
                    prim.to_bit_flags()?
                );
                Ok(())
            })
        )

        // cname
        .transition(
            Options, Tag::ctx(1), Cname,
            Action::enter(&PRINCIPAL_NAME, |body, name| {
                body.cname = Some(name);
                Ok(())
            })
        )

        // realm
        .transition(Options, Tag::ctx(2), RealmTag, Action::CheckNotEmpty)
        .transition(Cname, Tag::ctx(2), RealmTag, Action::CheckNotEmpty)
        .transition(
            RealmTag, Tag::GENERAL_STRING, Realm,
            Action::SetNonEmpty(|body, prim| {
                body.realm = kerberos_string(prim)?;
                Ok(())
            })
        )

        // sname
        .transition(
            Realm, Tag::ctx(3), Sname,
            Action::enter(&PRINCIPAL_NAME, |body, name| {
                body.sname = Some(name);
                Ok(())
            })
        )

        // from
        .transition(Realm, Tag::ctx(4), FromTag, Action::CheckNotEmpty)
        .transition(Sname, Tag::ctx(4), FromTag, Action::CheckNotEmpty)
        .transition(
            FromTag, Tag::GENERALIZED_TIME, FromTime,
            Action::Set(|body, prim| {
                body.from = Some(kerberos_time(prim)?);
                Ok(())
            })
        )

        // till
        .transition(Realm, Tag::ctx(5), TillTag, Action::CheckNotEmpty)
        .transition(Sname, Tag::ctx(5), TillTag, Action::CheckNotEmpty)
        .transition(FromTime, Tag::ctx(5), TillTag, Action::CheckNotEmpty)
        .transition(
            TillTag, Tag::GENERALIZED_TIME, Till,
            Action::Set(|body, prim| {
                body.till = kerberos_time(prim)?;
                Ok(())
            })
        )

        // rtime
        .transition(Till, Tag::ctx(6), RtimeTag, Action::CheckNotEmpty)
        .transition(
            RtimeTag, Tag::GENERALIZED_TIME, Rtime,
            Action::Set(|body, prim| {
                body.rtime = Some(kerberos_time(prim)?);
                Ok(())
            })
        )

        // nonce
        .transition(Till, Tag::ctx(7), NonceTag, Action::CheckNotEmpty)
        .transition(Rtime, Tag::ctx(7), NonceTag, Action::CheckNotEmpty)
        .transition(
            NonceTag, Tag::INTEGER, Nonce,
            Action::Set(|body, prim| {
                body.nonce = prim.to_u32()?;
                Ok(())
            })
        )

        // etype
        .transition(Nonce, Tag::ctx(8), EtypeTag, Action::CheckNotEmpty)
        .transition(EtypeTag, Tag::SEQUENCE, EtypeSeq, Action::Skip)
        .transition(
            EtypeSeq, Tag::INTEGER, Etype,
            Action::Set(|body, prim| {
                body.etype.push(prim.to_i32()?);
                Ok(())
            })
        )
        .transition(
            Etype, Tag::INTEGER, Etype,
            Action::Set(|body, prim| {
                body.etype.push(prim.to_i32()?);
                Ok(())
            })
        )

        // addresses
        .transition(
            AddressesTag, Tag::SEQUENCE, AddressesSeq, Action::CheckNotEmpty
        );
    for from in [EtypeSeq, Etype] {
        builder = builder.transition(
            from, Tag::ctx(9), AddressesTag, Action::CheckNotEmpty
        );
    }
    for from in [AddressesSeq, Addresses] {
        builder = builder.transition(
            from, Tag::SEQUENCE, Addresses,
            Action::delegate(&HOST_ADDRESS, |body, addr| {
                body.addresses.push(addr);
                Ok(())
            })
        );
    }

    // enc-authorization-data
    for from in [EtypeSeq, Etype, Addresses] {
        builder = builder.transition(
            from, Tag::ctx(10), EncAuthData,
            Action::enter(&ENCRYPTED_DATA, |body, data| {
                body.enc_authorization_data = Some(data);
                Ok(())
            })
        );
    }

    // additional-tickets
    for from in [EtypeSeq, Etype, Addresses, EncAuthData] {
        builder = builder.transition(
            from, Tag::ctx(11), TicketsTag, Action::CheckNotEmpty
        );
    }
    builder = builder.transition(
        TicketsTag, Tag::SEQUENCE, TicketsSeq, Action::CheckNotEmpty
    );
    for from in [TicketsSeq, Tickets] {
        builder = builder.transition(
            from, Ticket::TAG, Tickets,
            Action::delegate(&TICKET, |body, ticket| {
                body.additional_tickets.push(ticket);
                Ok(())
            })
        );
    }

    builder
        .accept(EtypeSeq)
        .accept(Etype)
        .accept(Addresses)
        .accept(EncAuthData)
        .accept(Tickets)
        .build()
});


//------------ KdcReq --------------------------------------------------------

/// A KDC request.
///
/// ```text
/// AS-REQ          ::= [APPLICATION 10] KDC-REQ
///
/// TGS-REQ         ::= [APPLICATION 12] KDC-REQ
///
/// KDC-REQ         ::= SEQUENCE {
///         -- NOTE: first tag is [1], not [0]
///         pvno            [1] INTEGER (5) ,
///         msg-type        [2] INTEGER (10 -- AS -- | 12 -- TGS --),
///         padata          [3] SEQUENCE OF PA-DATA OPTIONAL
///                             -- NOTE: not empty --,
///         req-body        [4] KDC-REQ-BODY
/// }
/// ```
///
/// The message type is determined by the application tag. The `msg-type`
/// field must agree with it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KdcReq {
    /// The type of the request.
    pub msg_type: MessageType,

    /// Pre-authentication data, empty if absent.
    pub padata: Vec<PaData>,

    /// The body of the request.
    pub req_body: KdcReqBody,
}

impl KdcReq {
    /// The application tag of an AS-REQ.
    pub const AS_REQ_TAG: Tag = Tag::application(10);

    /// The application tag of a TGS-REQ.
    pub const TGS_REQ_TAG: Tag = Tag::application(12);

    /// Returns the application tag for the request.
    pub fn tag(&self) -> Tag {
        match self.msg_type {
            MessageType::AsReq => Self::AS_REQ_TAG,
            MessageType::TgsReq => Self::TGS_REQ_TAG,
        }
    }
}

impl Encode for KdcReq {
    fn encode(&self) -> impl Values + '_ {
        sequence_as(self.tag(), sequence((
            PVNO.encode().explicit(Tag::ctx(1)),
            self.msg_type.to_i32().encode().explicit(Tag::ctx(2)),
            if self.padata.is_empty() {
                None
            }
            else {
                Some(sequence(
                    iter(self.padata.iter().map(PaData::encode))
                ).explicit(Tag::ctx(3)))
            },
            self.req_body.encode().explicit(Tag::ctx(4)),
        )))
    }
}

/// Checks the `msg-type` field against the expected message type.
fn check_msg_type(
    req: &mut KdcReq, prim: &Primitive, expected: MessageType
) -> Result<(), FieldError> {
    if MessageType::from_i32(prim.to_i32()?) != Some(expected) {
        return Err(FieldError::Unexpected(
            "message type doesn’t match application tag"
        ))
    }
    req.msg_type = expected;
    Ok(())
}

states! {
    /// The states of the [`KDC_REQ`] grammar.
    ///
    /// The states up to the message type exist separately for AS-REQ and
    /// TGS-REQ so that the message type can be checked against the
    /// application tag.
    pub enum KdcReqState {
        Start,
        AsApp, AsSeq, AsPvnoTag, AsPvno, AsTypeTag,
        TgsApp, TgsSeq, TgsPvnoTag, TgsPvno, TgsTypeTag,
        MsgType, PadataTag, PadataSeq, Padata, ReqBody,
    }
}

/// The grammar for [`KdcReq`].
///
/// This accepts both AS-REQ and TGS-REQ.
pub static KDC_REQ: Lazy<Grammar<KdcReq, KdcReqState>> = Lazy::new(|| {
    use self::KdcReqState::*;

    Grammar::<KdcReq, _>::builder("KDC-REQ", Start)
        // AS-REQ
        .transition(Start, KdcReq::AS_REQ_TAG, AsApp, Action::Init)
        .transition(AsApp, Tag::SEQUENCE, AsSeq, Action::CheckNotEmpty)
        .transition(AsSeq, Tag::ctx(1), AsPvnoTag, Action::CheckNotEmpty)
        .transition(
            AsPvnoTag, Tag::INTEGER, AsPvno,
            Action::Set(|_, prim| check_pvno(prim))
        )
        .transition(AsPvno, Tag::ctx(2), AsTypeTag, Action::CheckNotEmpty)
        .transition(
            AsTypeTag, Tag::INTEGER, MsgType,
            Action::Set(|req, prim| {
                check_msg_type(req, prim, MessageType::AsReq)
            })
        )

        // TGS-REQ
        .transition(Start, KdcReq::TGS_REQ_TAG, TgsApp, Action::Init)
        .transition(TgsApp, Tag::SEQUENCE, TgsSeq, Action::CheckNotEmpty)
        .transition(TgsSeq, Tag::ctx(1), TgsPvnoTag, Action::CheckNotEmpty)
        .transition(
            TgsPvnoTag, Tag::INTEGER, TgsPvno,
            Action::Set(|_, prim| check_pvno(prim))
        )
        .transition(TgsPvno, Tag::ctx(2), TgsTypeTag, Action::CheckNotEmpty)
        .transition(
            TgsTypeTag, Tag::INTEGER, MsgType,
            Action::Set(|req, prim| {
                check_msg_type(req, prim, MessageType::TgsReq)
            })
        )

        // padata
        .transition(MsgType, Tag::ctx(3), PadataTag, Action::CheckNotEmpty)
        .transition(
            PadataTag, Tag::SEQUENCE, PadataSeq, Action::CheckNotEmpty
        )
        .transition(
            PadataSeq, Tag::SEQUENCE, Padata,
            Action::delegate(&PA_DATA, |req, padata| {
                req.padata.push(padata);
                Ok(())
            })
        )
        .transition(
            Padata, Tag::SEQUENCE, Padata,
            Action::delegate(&PA_DATA, |req, padata| {
                req.padata.push(padata);
                Ok(())
            })
        )

        // req-body
        .transition(
            MsgType, Tag::ctx(4), ReqBody,
            Action::enter(&KDC_REQ_BODY, |req, body| {
                req.req_body = body;
                Ok(())
            })
        )
        .transition(
            Padata, Tag::ctx(4), ReqBody,
            Action::enter(&KDC_REQ_BODY, |req, body| {
                req.req_body = body;
                Ok(())
            })
        )
        .accept(ReqBody)
        .build()
});


//============ Tests =========================================================
