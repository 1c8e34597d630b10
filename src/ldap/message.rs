//! LDAP messages.

use bytes::Bytes;
use once_cell::sync::Lazy;
use crate::decode::{FieldError, Primitive};
use crate::encode::{
    Choice2, Choice4, Encode, PrimitiveContent, Values, iter, sequence,
    sequence_as,
};
use crate::grammar::{Action, Grammar};
use crate::states;
use crate::tag::Tag;
use super::dn::Dn;


//------------ LdapMessage ---------------------------------------------------

/// The envelope of all LDAP protocol operations.
///
/// ```text
/// LDAPMessage ::= SEQUENCE {
///      messageID       MessageID,
///      protocolOp      CHOICE { ... },
///      controls       [0] Controls OPTIONAL }
///
/// MessageID ::= INTEGER (0 ..  maxInt)
/// ```
///
/// An empty `controls` vec means the field is absent.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LdapMessage {
    /// The message ID.
    pub message_id: i32,

    /// The operation.
    pub protocol_op: ProtocolOp,

    /// The controls attached to the message.
    pub controls: Vec<Control>,
}

impl LdapMessage {
    /// Creates a new message without controls.
    pub fn new(message_id: i32, protocol_op: ProtocolOp) -> Self {
        LdapMessage { message_id, protocol_op, controls: Vec::new() }
    }
}

impl Encode for LdapMessage {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.message_id.encode(),
            self.protocol_op.encode(),
            (!self.controls.is_empty()).then(|| {
                sequence_as(
                    Tag::ctx(0),
                    iter(self.controls.iter().map(|control| control.encode()))
                )
            }),
        ))
    }
}


//------------ ProtocolOp ----------------------------------------------------

/// The protocol operations understood here.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ProtocolOp {
    /// A bind request.
    BindRequest(BindRequest),

    /// The response to a bind request.
    BindResponse(BindResponse),

    /// An unbind request.
    ///
    /// ```text
    /// UnbindRequest ::= [APPLICATION 2] NULL
    /// ```
    #[default]
    UnbindRequest,

    /// A request to abandon the operation with the given message ID.
    ///
    /// ```text
    /// AbandonRequest ::= [APPLICATION 16] MessageID
    /// ```
    AbandonRequest(i32),
}

impl ProtocolOp {
    /// The tag of an unbind request.
    pub const UNBIND_TAG: Tag = Tag::application_primitive(2);

    /// The tag of an abandon request.
    pub const ABANDON_TAG: Tag = Tag::application_primitive(16);
}

impl Encode for ProtocolOp {
    fn encode(&self) -> impl Values + '_ {
        match self {
            ProtocolOp::BindRequest(req) => Choice4::One(req.encode()),
            ProtocolOp::BindResponse(resp) => Choice4::Two(resp.encode()),
            ProtocolOp::UnbindRequest => {
                Choice4::Three(().encode_as(Self::UNBIND_TAG))
            }
            ProtocolOp::AbandonRequest(id) => {
                Choice4::Four((*id).encode_as(Self::ABANDON_TAG))
            }
        }
    }
}


//------------ BindRequest ---------------------------------------------------

/// A bind request.
///
/// ```text
/// BindRequest ::= [APPLICATION 0] SEQUENCE {
///      version                 INTEGER (1 ..  127),
///      name                    LDAPDN,
///      authentication          AuthenticationChoice }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BindRequest {
    /// The protocol version.
    pub version: u8,

    /// The name of the directory object the client wishes to bind as.
    pub name: Dn,

    /// The authentication information.
    pub authentication: Authentication,
}

impl BindRequest {
    /// The tag of a bind request.
    pub const TAG: Tag = Tag::application(0);

    /// Creates a version 3 simple bind request.
    pub fn simple(name: Dn, password: impl Into<Bytes>) -> Self {
        BindRequest {
            version: 3,
            name,
            authentication: Authentication::Simple(password.into()),
        }
    }

    /// Returns whether this is an anonymous bind.
    ///
    /// A bind is anonymous if it uses simple authentication with an empty
    /// password.
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self.authentication,
            Authentication::Simple(ref password) if password.is_empty()
        )
    }
}

impl Encode for BindRequest {
    fn encode(&self) -> impl Values + '_ {
        sequence_as(Self::TAG, (
            self.version.encode(),
            self.name.as_str().encode_as(Tag::OCTET_STRING),
            self.authentication.encode(),
        ))
    }
}


//------------ Authentication ------------------------------------------------

/// The authentication choice of a bind request.
///
/// ```text
/// AuthenticationChoice ::= CHOICE {
///      simple                  [0] OCTET STRING,
///      sasl                    [3] SaslCredentials,
///      ...  }
///
/// SaslCredentials ::= SEQUENCE {
///      mechanism               LDAPString,
///      credentials             OCTET STRING OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Authentication {
    /// Simple authentication with a password.
    Simple(Bytes),

    /// SASL authentication.
    Sasl {
        /// The name of the SASL mechanism.
        mechanism: String,

        /// The credentials, if the mechanism has any.
        credentials: Option<Bytes>,
    },
}

impl Authentication {
    /// The tag of simple authentication.
    pub const SIMPLE_TAG: Tag = Tag::ctx_primitive(0);

    /// The tag of SASL authentication.
    pub const SASL_TAG: Tag = Tag::ctx(3);

    fn encode(&self) -> impl Values + '_ {
        match self {
            Authentication::Simple(password) => {
                Choice2::One(password.encode_as(Self::SIMPLE_TAG))
            }
            Authentication::Sasl { mechanism, credentials } => {
                Choice2::Two(sequence_as(Self::SASL_TAG, (
                    mechanism.as_str().encode_as(Tag::OCTET_STRING),
                    credentials.as_ref().map(|creds| creds.encode()),
                )))
            }
        }
    }
}

impl Default for Authentication {
    fn default() -> Self {
        Authentication::Simple(Bytes::new())
    }
}

states! {
    /// The states of the [`BIND_REQUEST`] grammar.
    pub enum BindRequestState {
        Start, App, Version, Name, Simple, SaslSeq, Mechanism, Credentials,
    }
}

/// The grammar for [`BindRequest`].
///
/// The grammar starts with the application tag of the request, so it is
/// used via [`Action::delegate`].
pub static BIND_REQUEST: Lazy<
    Grammar<BindRequest, BindRequestState>
> = Lazy::new(|| {
    use self::BindRequestState::*;

    Grammar::<BindRequest, _>::builder("BindRequest", Start)
        .transition(Start, BindRequest::TAG, App, Action::Init)
        .transition(
            App, Tag::INTEGER, Version,
            Action::Set(|bind, prim| {
                match u8::try_from(prim.to_i32()?) {
                    Ok(version @ 1..=127) => {
                        bind.version = version;
                        Ok(())
                    }
                    _ => Err(FieldError::Unexpected(
                        "protocol version out of range"
                    ))
                }
            })
        )
        .transition(
            Version, Tag::OCTET_STRING, Name,
            Action::Set(|bind, prim| {
                bind.name = Dn::new(prim.to_utf8()?).map_err(|_| {
                    FieldError::Unexpected("invalid distinguished name")
                })?;
                Ok(())
            })
        )
        .transition(
            Name, Authentication::SIMPLE_TAG, Simple,
            Action::Set(|bind, prim| {
                bind.authentication = Authentication::Simple(prim.to_bytes());
                Ok(())
            })
        )
        .transition(
            Name, Authentication::SASL_TAG, SaslSeq, Action::CheckNotEmpty
        )
        .transition(
            SaslSeq, Tag::OCTET_STRING, Mechanism,
            Action::Set(|bind, prim| {
                bind.authentication = Authentication::Sasl {
                    mechanism: prim.to_utf8()?,
                    credentials: None,
                };
                Ok(())
            })
        )
        .transition(
            Mechanism, Tag::OCTET_STRING, Credentials,
            Action::Set(|bind, prim| {
                if let Authentication::Sasl {
                    ref mut credentials, ..
                } = bind.authentication {
                    *credentials = Some(prim.to_bytes());
                }
                Ok(())
            })
        )
        .accept(Simple)
        .accept(Mechanism)
        .accept(Credentials)
        .build()
});


//------------ BindResponse --------------------------------------------------

/// The response to a bind request.
///
/// ```text
/// BindResponse ::= [APPLICATION 1] SEQUENCE {
///      resultCode         ENUMERATED { ... },
///      matchedDN          LDAPDN,
///      diagnosticMessage  LDAPString,
///      referral           [3] Referral OPTIONAL,
///      serverSaslCreds    [7] OCTET STRING OPTIONAL }
/// ```
///
/// Referrals aren’t supported.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BindResponse {
    /// The result code.
    pub result_code: i32,

    /// The matched DN.
    pub matched_dn: String,

    /// A human readable diagnostic message.
    pub diagnostic_message: String,

    /// Credentials for mutual SASL authentication.
    pub server_sasl_creds: Option<Bytes>,
}

impl BindResponse {
    /// The tag of a bind response.
    pub const TAG: Tag = Tag::application(1);

    /// The tag of the server SASL credentials.
    pub const SASL_CREDS_TAG: Tag = Tag::ctx_primitive(7);

    //--- Result codes

    /// The bind succeeded.
    pub const SUCCESS: i32 = 0;

    /// The request was malformed.
    pub const PROTOCOL_ERROR: i32 = 2;

    /// The authentication method isn’t supported.
    pub const AUTH_METHOD_NOT_SUPPORTED: i32 = 7;

    /// Anonymous binds aren’t permitted for the name.
    pub const INAPPROPRIATE_AUTHENTICATION: i32 = 48;

    /// The name or password is wrong.
    pub const INVALID_CREDENTIALS: i32 = 49;

    /// The server refuses to process the bind.
    pub const UNWILLING_TO_PERFORM: i32 = 53;

    /// Creates a response with the given result code and message.
    pub fn new(
        result_code: i32, diagnostic_message: impl Into<String>
    ) -> Self {
        BindResponse {
            result_code,
            diagnostic_message: diagnostic_message.into(),
            .. Default::default()
        }
    }
}

impl Encode for BindResponse {
    fn encode(&self) -> impl Values + '_ {
        sequence_as(Self::TAG, (
            self.result_code.encode_as(Tag::ENUMERATED),
            self.matched_dn.as_str().encode_as(Tag::OCTET_STRING),
            self.diagnostic_message.as_str().encode_as(Tag::OCTET_STRING),
            self.server_sasl_creds.as_ref().map(|creds| {
                creds.encode_as(Self::SASL_CREDS_TAG)
            }),
        ))
    }
}

states! {
    /// The states of the [`BIND_RESPONSE`] grammar.
    pub enum BindResponseState {
        Start, App, ResultCode, MatchedDn, Diagnostic, SaslCreds,
    }
}

/// The grammar for [`BindResponse`].
pub static BIND_RESPONSE: Lazy<
    Grammar<BindResponse, BindResponseState>
> = Lazy::new(|| {
    use self::BindResponseState::*;

    Grammar::<BindResponse, _>::builder("BindResponse", Start)
        .transition(Start, BindResponse::TAG, App, Action::Init)
        .transition(
            App, Tag::ENUMERATED, ResultCode,
            Action::Set(|resp, prim| {
                resp.result_code = prim.to_enumerated()?;
                Ok(())
            })
        )
        .transition(
            ResultCode, Tag::OCTET_STRING, MatchedDn,
            Action::Set(|resp, prim| {
                resp.matched_dn = prim.to_utf8()?;
                Ok(())
            })
        )
        .transition(
            MatchedDn, Tag::OCTET_STRING, Diagnostic,
            Action::Set(|resp, prim| {
                resp.diagnostic_message = prim.to_utf8()?;
                Ok(())
            })
        )
        .transition(
            Diagnostic, BindResponse::SASL_CREDS_TAG, SaslCreds,
            Action::Set(|resp, prim| {
                resp.server_sasl_creds = Some(prim.to_bytes());
                Ok(())
            })
        )
        .accept(Diagnostic)
        .accept(SaslCreds)
        .build()
});


//------------ Control -------------------------------------------------------

/// A control extending an operation.
///
/// ```text
/// Control ::= SEQUENCE {
///      controlType             LDAPOID,
///      criticality             BOOLEAN DEFAULT FALSE,
///      controlValue            OCTET STRING OPTIONAL }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Control {
    /// The OID of the control in dotted decimal notation.
    pub control_type: String,

    /// Whether the operation must fail if the control isn’t supported.
    pub criticality: bool,

    /// The value of the control.
    pub control_value: Option<Bytes>,
}

impl Encode for Control {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.control_type.as_str().encode_as(Tag::OCTET_STRING),
            self.criticality.then(|| true.encode()),
            self.control_value.as_ref().map(|value| value.encode()),
        ))
    }
}

states! {
    /// The states of the [`CONTROL`] grammar.
    pub enum ControlState {
        Start, Seq, Type, Criticality, Value,
    }
}

fn control_value(
    control: &mut Control, prim: &Primitive
) -> Result<(), FieldError> {
    control.control_value = Some(prim.to_bytes());
    Ok(())
}

/// The grammar for [`Control`].
pub static CONTROL: Lazy<Grammar<Control, ControlState>> = Lazy::new(|| {
    use self::ControlState::*;

    Grammar::<Control, _>::builder("Control", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(
            Seq, Tag::OCTET_STRING, Type,
            Action::SetNonEmpty(|control, prim| {
                control.control_type = prim.to_utf8()?;
                Ok(())
            })
        )
        .transition(
            Type, Tag::BOOLEAN, Criticality,
            Action::Set(|control, prim| {
                control.criticality = prim.to_bool()?;
                Ok(())
            })
        )
        .transition(
            Type, Tag::OCTET_STRING, Value, Action::Set(control_value)
        )
        .transition(
            Criticality, Tag::OCTET_STRING, Value, Action::Set(control_value)
        )
        .accept(Type)
        .accept(Criticality)
        .accept(Value)
        .build()
});


//------------ The LDAPMessage Grammar ---------------------------------------

states! {
    /// The states of the [`LDAP_MESSAGE`] grammar.
    pub enum LdapMessageState {
        Start, Seq, MessageId, BindReq, BindResp, Unbind, Abandon, Controls,
    }
}

/// The grammar for [`LdapMessage`].
pub static LDAP_MESSAGE: Lazy<
    Grammar<LdapMessage, LdapMessageState>
> = Lazy::new(|| {
    use self::LdapMessageState::*;

    let mut builder = Grammar::<LdapMessage, _>::builder("LdapMessage", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(
            Seq, Tag::INTEGER, MessageId,
            Action::Set(|msg, prim| {
                msg.message_id = message_id(prim)?;
                Ok(())
            })
        )
        .transition(
            MessageId, BindRequest::TAG, BindReq,
            Action::delegate(&BIND_REQUEST, |msg, req| {
                msg.protocol_op = ProtocolOp::BindRequest(req);
                Ok(())
            })
        )
        .transition(
            MessageId, BindResponse::TAG, BindResp,
            Action::delegate(&BIND_RESPONSE, |msg, resp| {
                msg.protocol_op = ProtocolOp::BindResponse(resp);
                Ok(())
            })
        )
        .transition(
            MessageId, ProtocolOp::UNBIND_TAG, Unbind,
            Action::Set(|msg, prim| {
                prim.to_null()?;
                msg.protocol_op = ProtocolOp::UnbindRequest;
                Ok(())
            })
        )
        .transition(
            MessageId, ProtocolOp::ABANDON_TAG, Abandon,
            Action::Set(|msg, prim| {
                msg.protocol_op = ProtocolOp::AbandonRequest(
                    message_id(prim)?
                );
                Ok(())
            })
        );
    for op in [BindReq, BindResp, Unbind, Abandon] {
        builder = builder
            .transition(op, Tag::ctx(0), Controls, Action::Skip)
            .accept(op);
    }
    builder
        .transition(
            Controls, Tag::SEQUENCE, Controls,
            Action::delegate(&CONTROL, |msg, control| {
                msg.controls.push(control);
                Ok(())
            })
        )
        .accept(Controls)
        .build()
});

/// Decodes a message ID which must not be negative.
fn message_id(prim: &Primitive) -> Result<i32, FieldError> {
    let id = prim.to_i32()?;
    if id < 0 {
        return Err(FieldError::IntegerRange)
    }
    Ok(id)
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::decode::{Decoder, DecodeError, DecodeStatus, Pos};

    fn decode(data: &[u8]) -> DecodeStatus<LdapMessage> {
        Decoder::new(&LDAP_MESSAGE, DecoderConfig::default()).feed(data)
    }

    fn round_trip(msg: LdapMessage) {
        let encoded = msg.encode_to_bytes();
        assert_eq!(decode(&encoded), DecodeStatus::Completed(msg));
    }

    #[test]
    fn simple_bind() {
        let msg = LdapMessage::new(1, ProtocolOp::BindRequest(
            BindRequest::simple("cn=admin".parse().unwrap(), "secret")
        ));
        let encoded = msg.encode_to_bytes();
        assert_eq!(
            encoded.as_ref(),
            b"\x30\x1a\x02\x01\x01\x60\x15\x02\x01\x03\
              \x04\x08cn=admin\x80\x06secret"
        );
        let decoded = decode(&encoded).completed().unwrap();
        assert_eq!(decoded, msg);
        let ProtocolOp::BindRequest(bind) = decoded.protocol_op else {
            panic!("not a bind request")
        };
        assert_eq!(bind.name.get("CN"), Some("admin"));
        assert!(!bind.is_anonymous());
    }

    #[test]
    fn anonymous_bind() {
        let msg = LdapMessage::new(7, ProtocolOp::BindRequest(
            BindRequest::simple(Dn::root(), Bytes::new())
        ));
        let decoded = decode(&msg.encode_to_bytes()).completed().unwrap();
        match decoded.protocol_op {
            ProtocolOp::BindRequest(bind) => {
                assert!(bind.is_anonymous());
                assert!(bind.name.is_empty());
            }
            op => panic!("unexpected {:?}", op)
        }
    }

    #[test]
    fn sasl_bind_with_controls() {
        round_trip(LdapMessage {
            message_id: 2,
            protocol_op: ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: Dn::root(),
                authentication: Authentication::Sasl {
                    mechanism: "EXTERNAL".into(),
                    credentials: None,
                },
            }),
            controls: vec![
                Control {
                    control_type: "1.3.6.1.4.1.42.2.27.8.5.1".into(),
                    .. Default::default()
                },
                Control {
                    control_type: "2.16.840.1.113730.3.4.2".into(),
                    criticality: true,
                    control_value: Some(Bytes::from_static(b"\x01")),
                },
            ],
        });
        round_trip(LdapMessage::new(3, ProtocolOp::BindRequest(
            BindRequest {
                version: 3,
                name: "uid=bob,ou=people".parse().unwrap(),
                authentication: Authentication::Sasl {
                    mechanism: "GSSAPI".into(),
                    credentials: Some(Bytes::from_static(b"token")),
                },
            }
        )));
    }

    #[test]
    fn bind_response() {
        round_trip(LdapMessage::new(1, ProtocolOp::BindResponse(
            BindResponse::new(BindResponse::SUCCESS, "")
        )));
        round_trip(LdapMessage::new(1, ProtocolOp::BindResponse(
            BindResponse {
                result_code: BindResponse::INVALID_CREDENTIALS,
                matched_dn: "ou=system".into(),
                diagnostic_message: "nope".into(),
                server_sasl_creds: Some(Bytes::from_static(b"abc")),
            }
        )));
    }

    #[test]
    fn unbind_and_abandon() {
        let unbind = LdapMessage::new(3, ProtocolOp::UnbindRequest);
        assert_eq!(
            unbind.encode_to_bytes().as_ref(), b"\x30\x05\x02\x01\x03\x42\x00"
        );
        round_trip(unbind);

        let abandon = LdapMessage::new(4, ProtocolOp::AbandonRequest(2));
        assert_eq!(
            abandon.encode_to_bytes().as_ref(),
            b"\x30\x06\x02\x01\x04\x50\x01\x02"
        );
        round_trip(abandon);

        assert_eq!(
            decode(b"\x30\x06\x02\x01\x03\x42\x01\x00"),
            DecodeStatus::Failed(DecodeError::InvalidValue {
                grammar: "LdapMessage", state: "MessageId",
                tag: ProtocolOp::UNBIND_TAG, pos: Pos::from(7),
                error: FieldError::InvalidNull,
            })
        );
    }

    #[test]
    fn bad_version() {
        assert!(matches!(
            decode(
                b"\x30\x0c\x02\x01\x01\x60\x07\x02\x01\x00\x04\x00\x80\x00"
            ),
            DecodeStatus::Failed(DecodeError::InvalidValue {
                grammar: "BindRequest", state: "App",
                tag: Tag::INTEGER, error: FieldError::Unexpected(_), ..
            })
        ));
    }

    #[test]
    fn bad_name() {
        assert!(matches!(
            decode(
                b"\x30\x0e\x02\x01\x01\x60\x09\x02\x01\x03\x04\x02cn\x80\x00"
            ),
            DecodeStatus::Failed(DecodeError::InvalidValue {
                grammar: "BindRequest", state: "Version",
                tag: Tag::OCTET_STRING, error: FieldError::Unexpected(_), ..
            })
        ));
    }

    #[test]
    fn negative_message_id() {
        assert_eq!(
            decode(b"\x30\x05\x02\x01\xff\x42\x00"),
            DecodeStatus::Failed(DecodeError::InvalidValue {
                grammar: "LdapMessage", state: "Seq",
                tag: Tag::INTEGER, pos: Pos::from(4),
                error: FieldError::IntegerRange,
            })
        );
    }

    #[test]
    fn unsupported_operation() {
        // An empty search request.
        assert_eq!(
            decode(b"\x30\x05\x02\x01\x01\x63\x00"),
            DecodeStatus::Failed(DecodeError::UnexpectedTag {
                grammar: "LdapMessage", state: "MessageId",
                tag: Tag::application(3), pos: Pos::from(5),
            })
        );
    }

    #[test]
    fn missing_authentication() {
        assert_eq!(
            decode(b"\x30\x0a\x02\x01\x01\x60\x05\x02\x01\x03\x04\x00"),
            DecodeStatus::Failed(DecodeError::IncompleteValue {
                grammar: "BindRequest", state: "Name", pos: Pos::from(12),
            })
        );
    }
}
