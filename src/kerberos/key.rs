//! Keys and encrypted data.

use bytes::Bytes;
use once_cell::sync::Lazy;
use crate::encode::{Encode, PrimitiveContent, Values, sequence};
use crate::grammar::{Action, Grammar};
use crate::states;
use crate::tag::Tag;


//------------ EncryptionKey -------------------------------------------------

/// An encryption key.
///
/// ```text
/// EncryptionKey   ::= SEQUENCE {
///         keytype         [0] Int32,
///         keyvalue        [1] OCTET STRING
/// }
/// ```
///
/// The key value must not be empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncryptionKey {
    /// The encryption type of the key.
    pub key_type: i32,

    /// The octets of the key.
    pub key_value: Bytes,
}

impl EncryptionKey {
    /// Creates a new key.
    pub fn new(key_type: i32, key_value: impl Into<Bytes>) -> Self {
        EncryptionKey { key_type, key_value: key_value.into() }
    }
}

impl Encode for EncryptionKey {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.key_type.encode().explicit(Tag::ctx(0)),
            (&self.key_value).encode().explicit(Tag::ctx(1)),
        ))
    }
}

states! {
    /// The states of the [`ENCRYPTION_KEY`] grammar.
    pub enum EncryptionKeyState {
        Start, Seq, TypeTag, Type, ValueTag, Value,
    }
}

/// The grammar for [`EncryptionKey`].
pub static ENCRYPTION_KEY: Lazy<
    Grammar<EncryptionKey, EncryptionKeyState>
> = Lazy::new(|| {
    use self::EncryptionKeyState::*;

    Grammar::<EncryptionKey, _>::builder("EncryptionKey", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(Seq, Tag::ctx(0), TypeTag, Action::CheckNotEmpty)
        .transition(
            TypeTag, Tag::INTEGER, Type,
            Action::Set(|key, prim| {
                key.key_type = prim.to_i32()?;
                Ok(())
            })
        )
        .transition(Type, Tag::ctx(1), ValueTag, Action::CheckNotEmpty)
        .transition(
            ValueTag, Tag::OCTET_STRING, Value,
            Action::SetNonEmpty(|key, prim| {
                key.key_value = prim.to_bytes();
                Ok(())
            })
        )
        .accept(Value)
        .build()
});


//------------ EncryptedData -------------------------------------------------

/// Encrypted data.
///
/// ```text
/// EncryptedData   ::= SEQUENCE {
///         etype   [0] Int32 -- EncryptionType --,
///         kvno    [1] UInt32 OPTIONAL,
///         cipher  [2] OCTET STRING -- ciphertext
/// }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncryptedData {
    /// The encryption type.
    pub etype: i32,

    /// The version of the key used.
    pub kvno: Option<u32>,

    /// The cipher text.
    pub cipher: Bytes,
}

impl Encode for EncryptedData {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.etype.encode().explicit(Tag::ctx(0)),
            self.kvno.map(|kvno| kvno.encode().explicit(Tag::ctx(1))),
            (&self.cipher).encode().explicit(Tag::ctx(2)),
        ))
    }
}

states! {
    /// The states of the [`ENCRYPTED_DATA`] grammar.
    pub enum EncryptedDataState {
        Start, Seq, EtypeTag, Etype, KvnoTag, Kvno, CipherTag, Cipher,
    }
}

/// The grammar for [`EncryptedData`].
pub static ENCRYPTED_DATA: Lazy<
    Grammar<EncryptedData, EncryptedDataState>
> = Lazy::new(|| {
    use self::EncryptedDataState::*;

    Grammar::<EncryptedData, _>::builder("EncryptedData", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(Seq, Tag::ctx(0), EtypeTag, Action::CheckNotEmpty)
        .transition(
            EtypeTag, Tag::INTEGER, Etype,
            Action::Set(|data, prim| {
                data.etype = prim.to_i32()?;
                Ok(())
            })
        )
        .transition(Etype, Tag::ctx(1), KvnoTag, Action::CheckNotEmpty)
        .transition(
            KvnoTag, Tag::INTEGER, Kvno,
            Action::Set(|data, prim| {
                data.kvno = Some(prim.to_u32()?);
                Ok(())
            })
        )
        .transition(Etype, Tag::ctx(2), CipherTag, Action::CheckNotEmpty)
        .transition(Kvno, Tag::ctx(2), CipherTag, Action::CheckNotEmpty)
        .transition(
            CipherTag, Tag::OCTET_STRING, Cipher,
            Action::SetNonEmpty(|data, prim| {
                data.cipher = prim.to_bytes();
                Ok(())
            })
        )
        .accept(Cipher)
        .build()
});


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::decode::{Decoder, DecodeError, DecodeStatus, Pos};

    fn decode<C, S>(
        grammar: &'static Grammar<C, S>, data: &[u8]
    ) -> DecodeStatus<C>
    where C: Default + Send + 'static, S: crate::grammar::State {
        Decoder::new(grammar, DecoderConfig::default()).feed(data)
    }

    #[test]
    fn encryption_key() {
        let key = EncryptionKey::new(1, &b"\x01\x02"[..]);
        let encoded = key.encode_to_bytes();
        assert_eq!(
            encoded.as_ref(),
            b"\x30\x0b\xa0\x03\x02\x01\x01\xa1\x04\x04\x02\x01\x02"
        );
        assert_eq!(
            decode(&ENCRYPTION_KEY, &encoded),
            DecodeStatus::Completed(key)
        );
    }

    #[test]
    fn empty_key_value() {
        assert_eq!(
            decode(
                &ENCRYPTION_KEY,
                b"\x30\x09\xa0\x03\x02\x01\x01\xa1\x02\x04\x00"
            ),
            DecodeStatus::Failed(DecodeError::ZeroLengthField {
                grammar: "EncryptionKey", state: "ValueTag",
                tag: Tag::OCTET_STRING, pos: Pos::from(11),
            })
        );
        assert_eq!(
            decode(&ENCRYPTION_KEY, b"\x30\x07\xa0\x03\x02\x01\x01\xa1\x00"),
            DecodeStatus::Failed(DecodeError::ZeroLengthField {
                grammar: "EncryptionKey", state: "Type",
                tag: Tag::ctx(1), pos: Pos::from(7),
            })
        );
    }

    #[test]
    fn missing_key_value() {
        assert_eq!(
            decode(&ENCRYPTION_KEY, b"\x30\x05\xa0\x03\x02\x01\x01"),
            DecodeStatus::Failed(DecodeError::IncompleteValue {
                grammar: "EncryptionKey", state: "Type", pos: Pos::from(7),
            })
        );
    }

    #[test]
    fn encrypted_data() {
        let data = EncryptedData {
            etype: 18, kvno: Some(2), cipher: Bytes::from_static(b"secret")
        };
        let encoded = data.encode_to_bytes();
        assert_eq!(
            decode(&ENCRYPTED_DATA, &encoded),
            DecodeStatus::Completed(data)
        );

        let data = EncryptedData {
            etype: 23, kvno: None, cipher: Bytes::from_static(b"x")
        };
        let encoded = data.encode_to_bytes();
        assert_eq!(
            decode(&ENCRYPTED_DATA, &encoded),
            DecodeStatus::Completed(data)
        );
    }
}
