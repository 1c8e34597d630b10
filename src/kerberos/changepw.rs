//! The data of a set/change password request.

use bytes::Bytes;
use once_cell::sync::Lazy;
use crate::encode::{Encode, PrimitiveContent, Values, sequence};
use crate::grammar::{Action, Grammar};
use crate::states;
use crate::tag::Tag;
use super::kerberos_string;
use super::principal::{PRINCIPAL_NAME, PrincipalName};


//------------ ChangePasswdData ----------------------------------------------

/// The data of a set/change password request.
///
/// ```text
/// ChangePasswdData ::=  SEQUENCE {
///         newpasswd[0]   OCTET STRING,
///         targname[1]    PrincipalName OPTIONAL,
///         targrealm[2]   Realm OPTIONAL
/// }
/// ```
///
/// This is the plain text carried in the KRB-PRIV part of a request. If
/// the target name and realm are absent, the password of the
/// authenticated principal is changed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangePasswdData {
    /// The new password.
    pub new_passwd: Bytes,

    /// The principal whose password should be set.
    pub targ_name: Option<PrincipalName>,

    /// The realm of the principal whose password should be set.
    pub targ_realm: Option<String>,
}

impl Encode for ChangePasswdData {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            (&self.new_passwd).encode().explicit(Tag::ctx(0)),
            self.targ_name.as_ref().map(|name| {
                name.encode().explicit(Tag::ctx(1))
            }),
            self.targ_realm.as_deref().map(|realm| {
                realm.encode_as(Tag::GENERAL_STRING).explicit(Tag::ctx(2))
            }),
        ))
    }
}

states! {
    /// The states of the [`CHANGE_PASSWD_DATA`] grammar.
    pub enum ChangePasswdDataState {
        Start, Seq, PasswdTag, Passwd, TargName, TargRealmTag, TargRealm,
    }
}

/// The grammar for [`ChangePasswdData`].
pub static CHANGE_PASSWD_DATA: Lazy<
    Grammar<ChangePasswdData, ChangePasswdDataState>
> = Lazy::new(|| {
    use self::ChangePasswdDataState::*;

    Grammar::<ChangePasswdData, _>::builder("ChangePasswdData", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(Seq, Tag::ctx(0), PasswdTag, Action::CheckNotEmpty)
        .transition(
            PasswdTag, Tag::OCTET_STRING, Passwd,
            Action::Set(|data, prim| {
                data.new_passwd = prim.to_bytes();
                Ok(())
            })
        )
        .transition(
            Passwd, Tag::ctx(1), TargName,
            Action::enter(&PRINCIPAL_NAME, |data, name| {
                data.targ_name = Some(name);
                Ok(())
            })
        )
        .transition(
            Passwd, Tag::ctx(2), TargRealmTag, Action::CheckNotEmpty
        )
        .transition(
            TargName, Tag::ctx(2), TargRealmTag, Action::CheckNotEmpty
        )
        .transition(
            TargRealmTag, Tag::GENERAL_STRING, TargRealm,
            Action::SetNonEmpty(|data, prim| {
                data.targ_realm = Some(kerberos_string(prim)?);
                Ok(())
            })
        )
        .accept(Passwd)
        .accept(TargName)
        .accept(TargRealm)
        .build()
});


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::decode::{Decoder, DecodeStatus};

    fn decode(data: &[u8]) -> DecodeStatus<ChangePasswdData> {
        Decoder::new(
            &CHANGE_PASSWD_DATA, DecoderConfig::default()
        ).feed(data)
    }

    #[test]
    fn password_only() {
        let data = ChangePasswdData {
            new_passwd: Bytes::from_static(b"hunter2"),
            .. Default::default()
        };
        let encoded = data.encode_to_bytes();
        assert_eq!(
            encoded.as_ref(),
            b"\x30\x0b\xa0\x09\x04\x07hunter2"
        );
        assert_eq!(decode(&encoded), DecodeStatus::Completed(data));
    }

    #[test]
    fn with_target() {
        let data = ChangePasswdData {
            new_passwd: Bytes::from_static(b"correct horse"),
            targ_name: Some(PrincipalName::new(
                PrincipalName::NT_PRINCIPAL, ["bob"]
            )),
            targ_realm: Some("EXAMPLE.COM".into()),
        };
        let encoded = data.encode_to_bytes();
        assert_eq!(decode(&encoded), DecodeStatus::Completed(data));

        let data = ChangePasswdData {
            new_passwd: Bytes::from_static(b"correct horse"),
            targ_name: None,
            targ_realm: Some("EXAMPLE.COM".into()),
        };
        let encoded = data.encode_to_bytes();
        assert_eq!(decode(&encoded), DecodeStatus::Completed(data));
    }
}
