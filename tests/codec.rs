//! Decoding complete messages through session codecs.

use bergram::auth::{AnonymousAuthenticator, Authenticator};
use bergram::decode::{DecodeError, DecodeStatus, Decoder, Pos};
use bergram::encode::Encode;
use bergram::grammar::{Grammar, State};
use bergram::kerberos::{
    ENCRYPTION_KEY, KDC_REQ, EncryptionKey, HostAddress, KdcReq, KdcReqBody,
    KerberosFlags, MessageType, PaData, PrincipalName,
};
use bergram::ldap::{
    Authentication, BindRequest, Dn, LdapMessage, ProtocolOp,
};
use bergram::session::{CodecFactory, LdapCodecFactory, SessionCodec};
use bergram::{DecoderConfig, Tag};
use bytes::Bytes;
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;


fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Decodes `data` fed in chunks of the given sizes, repeated as necessary.
fn decode_chunked<M, S>(
    grammar: &Grammar<M, S>, data: &[u8], sizes: &[usize]
) -> Result<Vec<M>, DecodeError>
where M: Default + Send + 'static, S: State {
    let mut codec = SessionCodec::new(grammar, DecoderConfig::default());
    let mut res = Vec::new();
    let mut data = data;
    for &size in sizes.iter().cycle() {
        if data.is_empty() {
            break
        }
        let (head, tail) = data.split_at(size.clamp(1, data.len()));
        res.extend(codec.receive(head)?);
        data = tail;
    }
    res.extend(codec.close()?);
    Ok(res)
}

fn as_req() -> KdcReq {
    KdcReq {
        msg_type: MessageType::AsReq,
        padata: vec![PaData {
            padata_type: 2,
            padata_value: Bytes::from_static(b"\x30\x03\x02\x01\x01"),
        }],
        req_body: KdcReqBody {
            kdc_options: KerberosFlags::default()
                .with(KerberosFlags::FORWARDABLE),
            cname: Some(PrincipalName::new(
                PrincipalName::NT_PRINCIPAL, ["alice"]
            )),
            realm: "EXAMPLE.COM".into(),
            sname: Some(PrincipalName::new(
                PrincipalName::NT_SRV_INST, ["krbtgt", "EXAMPLE.COM"]
            )),
            till: "20370913024805Z".into(),
            nonce: 42,
            etype: vec![18, 17],
            addresses: vec![HostAddress {
                addr_type: HostAddress::IPV4,
                address: Bytes::from_static(b"\x0a\x00\x00\x01"),
            }],
            .. Default::default()
        },
    }
}


//------------ Strategies ----------------------------------------------------

prop_compose! {
    fn kdc_req()(
        tgs in any::<bool>(),
        padata in prop::collection::vec(
            (any::<i32>(), prop::collection::vec(any::<u8>(), 0..16)), 0..3
        ),
        cname in prop::option::of(
            prop::collection::vec("[a-z]{1,8}", 1..3)
        ),
        realm in "[A-Z]{1,10}(\\.[A-Z]{2,5})?",
        options in any::<u32>(),
        nonce in any::<u32>(),
        etype in prop::collection::vec(any::<i32>(), 0..5),
    ) -> KdcReq {
        KdcReq {
            msg_type: if tgs { MessageType::TgsReq } else { MessageType::AsReq },
            padata: padata.into_iter().map(|(padata_type, value)| {
                PaData { padata_type, padata_value: value.into() }
            }).collect(),
            req_body: KdcReqBody {
                kdc_options: KerberosFlags::from_bits(options),
                cname: cname.map(|components| {
                    PrincipalName::new(PrincipalName::NT_PRINCIPAL, components)
                }),
                sname: Some(PrincipalName::new(
                    PrincipalName::NT_SRV_INST, ["krbtgt", realm.as_str()]
                )),
                realm,
                till: "20370913024805Z".into(),
                nonce,
                etype,
                .. Default::default()
            },
        }
    }
}

fn ldap_message() -> impl Strategy<Value = LdapMessage> {
    let op = prop_oneof![
        Just(ProtocolOp::UnbindRequest),
        (0..=i32::MAX).prop_map(ProtocolOp::AbandonRequest),
        (
            prop::option::of("[a-z]{1,5}=[a-z0-9]{1,8}"),
            prop::collection::vec(any::<u8>(), 0..12),
        ).prop_map(|(name, password)| {
            let name = match name {
                Some(name) => name.parse().unwrap(),
                None => Dn::root(),
            };
            ProtocolOp::BindRequest(BindRequest::simple(name, password))
        }),
    ];
    (0..=i32::MAX, op).prop_map(|(message_id, protocol_op)| {
        LdapMessage::new(message_id, protocol_op)
    })
}


//------------ Properties ----------------------------------------------------

proptest! {
    #[test]
    fn kdc_req_chunk_invariance(
        req in kdc_req(),
        sizes in prop::collection::vec(1usize..24, 1..16),
    ) {
        let encoded = req.encode_to_bytes();
        prop_assert_eq!(
            decode_chunked(&KDC_REQ, &encoded, &sizes).unwrap(),
            vec![req]
        );
    }

    #[test]
    fn ldap_stream_chunk_invariance(
        messages in prop::collection::vec(ldap_message(), 1..8),
        sizes in prop::collection::vec(1usize..16, 1..16),
    ) {
        let mut data = Vec::new();
        for msg in &messages {
            data.extend_from_slice(&msg.encode_to_bytes());
        }
        let factory = LdapCodecFactory::default();
        prop_assert_eq!(
            decode_chunked(factory.grammar(), &data, &sizes).unwrap(),
            messages
        );
    }
}


//------------ Scenarios -----------------------------------------------------

#[test]
fn truncation_suspends_until_finish() {
    init_tracing();
    let encoded = as_req().encode_to_bytes();
    for len in 1..encoded.len() {
        let mut decoder = Decoder::new(&KDC_REQ, DecoderConfig::default());
        assert_eq!(decoder.feed(&encoded[..len]), DecodeStatus::Suspended);
        assert_eq!(
            decoder.finish(),
            Err(DecodeError::TruncatedInput { pos: Pos::from(len) })
        );
    }
}

#[test]
fn corrupted_application_tag() {
    init_tracing();
    let mut encoded = as_req().encode_to_bytes().to_vec();
    encoded[0] = 0x6b;
    assert_eq!(
        Decoder::new(&KDC_REQ, DecoderConfig::default()).feed(&encoded),
        DecodeStatus::Failed(DecodeError::UnexpectedTag {
            grammar: "KDC-REQ", state: "Start",
            tag: Tag::application(11), pos: Pos::from(0),
        })
    );
}

#[test]
fn encryption_key() {
    init_tracing();
    let key = EncryptionKey::new(1, &b"\x01\x02"[..]);
    let encoded = key.encode_to_bytes();
    assert_eq!(
        encoded.as_ref(),
        b"\x30\x0b\xa0\x03\x02\x01\x01\xa1\x04\x04\x02\x01\x02"
    );
    let decode = |data: &[u8]| {
        Decoder::new(&ENCRYPTION_KEY, DecoderConfig::default()).feed(data)
    };
    assert_eq!(decode(&encoded), DecodeStatus::Completed(key));

    // Inner length one octet too long and one too short.
    assert_eq!(
        decode(b"\x30\x0b\xa0\x04\x02\x01\x01\xa1\x04\x04\x02\x01\x02"),
        DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
            pos: Pos::from(7), remaining: 1, needed: 2,
        })
    );
    assert_eq!(
        decode(b"\x30\x0b\xa0\x02\x02\x01\x01\xa1\x04\x04\x02\x01\x02"),
        DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
            pos: Pos::from(4), remaining: 2, needed: 3,
        })
    );

    // Outer length one octet too long and one too short.
    assert_eq!(
        decode(b"\x30\x0c\xa0\x03\x02\x01\x01\xa1\x04\x04\x02\x01\x02"),
        DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
            pos: Pos::from(13), remaining: 1, needed: 2,
        })
    );
    assert_eq!(
        decode(b"\x30\x0a\xa0\x03\x02\x01\x01\xa1\x04\x04\x02\x01\x02"),
        DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
            pos: Pos::from(7), remaining: 5, needed: 6,
        })
    );

    // Empty key value.
    assert_eq!(
        decode(b"\x30\x09\xa0\x03\x02\x01\x01\xa1\x02\x04\x00"),
        DecodeStatus::Failed(DecodeError::ZeroLengthField {
            grammar: "EncryptionKey", state: "ValueTag",
            tag: Tag::OCTET_STRING, pos: Pos::from(11),
        })
    );
}

#[test]
fn anonymous_bind_flow() {
    init_tracing();
    let factory = LdapCodecFactory::default();
    let mut codec = factory.codec();
    let request = LdapMessage::new(1, ProtocolOp::BindRequest(
        BindRequest::simple(Dn::root(), Bytes::new())
    ));
    let named = LdapMessage::new(2, ProtocolOp::BindRequest(BindRequest {
        version: 3,
        name: "uid=admin,ou=system".parse().unwrap(),
        authentication: Authentication::Simple(Bytes::new()),
    }));
    let mut data = codec.encode(&request).to_vec();
    data.extend_from_slice(&codec.encode(&named));

    let authenticator = AnonymousAuthenticator::default();
    let results: Vec<_> = codec.receive(&data).unwrap().into_iter().map(|msg| {
        match msg.protocol_op {
            ProtocolOp::BindRequest(bind) => {
                authenticator.authenticate(&bind.name).is_ok()
            }
            op => panic!("unexpected {:?}", op),
        }
    }).collect();
    assert_eq!(results, [true, false]);
}
