//! Per-session codecs.
//!
//! A protocol server owns one [`SessionCodec`] per connection. The codec
//! wraps a [`Decoder`] for the protocol’s message grammar and turns the
//! chunks arriving on the connection into complete messages. Grammars are
//! shared between all sessions, so creating a codec is cheap. A
//! [`CodecFactory`] bundles grammar and configuration for a protocol and
//! hands out fresh codecs.

use std::sync::atomic::{AtomicU64, Ordering};
use bytes::Bytes;
use tracing::{debug, trace, warn};
use crate::config::DecoderConfig;
use crate::decode::{DecodeError, DecodeStatus, Decoder};
use crate::encode::Encode;
use crate::grammar::{Grammar, State};
use crate::kerberos::{
    CHANGE_PASSWD_DATA, KDC_REQ, ChangePasswdData, ChangePasswdDataState,
    KdcReq, KdcReqState,
};
use crate::ldap::{LDAP_MESSAGE, LdapMessage, LdapMessageState};


/// The ID of the next session.
static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);


//------------ SessionCodec --------------------------------------------------

/// The decoder and encoder for the messages of one session.
pub struct SessionCodec<'g, M, S> {
    /// The session ID for diagnostics.
    id: u64,

    /// The decoder for incoming messages.
    decoder: Decoder<'g, M, S>,
}

impl<'g, M, S> SessionCodec<'g, M, S>
where M: Default + Send + 'static, S: State {
    /// Creates a codec for a new session.
    pub fn new(grammar: &'g Grammar<M, S>, config: DecoderConfig) -> Self {
        let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, grammar = grammar.name(), "session opened");
        SessionCodec { id, decoder: Decoder::new(grammar, config) }
    }

    /// Returns the ID of the session.
    ///
    /// IDs are unique within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns a reference to the decoder.
    pub fn decoder(&self) -> &Decoder<'g, M, S> {
        &self.decoder
    }

    /// Processes data received from the peer.
    ///
    /// Returns all messages completed by the data, which may be none. If
    /// the data isn’t valid, returns the error instead. In this case the
    /// session should be closed as every further call fails, too.
    pub fn receive(&mut self, data: &[u8]) -> Result<Vec<M>, DecodeError> {
        let mut res = Vec::new();
        let mut status = self.decoder.feed(data);
        loop {
            match status {
                DecodeStatus::Suspended => return Ok(res),
                DecodeStatus::Completed(msg) => {
                    trace!(session = self.id, "message received");
                    res.push(msg)
                }
                DecodeStatus::Failed(err) => {
                    warn!(
                        session = self.id,
                        grammar = self.decoder.grammar().name(),
                        error = %err,
                        "invalid data received"
                    );
                    return Err(err)
                }
            }
            status = self.decoder.decode();
        }
    }

    /// Processes the end of the data from the peer.
    ///
    /// Returns the messages still completed by buffered data. Fails if the
    /// data ended in the middle of a message.
    pub fn close(&mut self) -> Result<Vec<M>, DecodeError> {
        let mut res = Vec::new();
        loop {
            match self.decoder.finish() {
                Ok(Some(msg)) => res.push(msg),
                Ok(None) => {
                    debug!(session = self.id, "session closed");
                    return Ok(res)
                }
                Err(err) => {
                    warn!(
                        session = self.id,
                        grammar = self.decoder.grammar().name(),
                        error = %err,
                        "session closed inside a message"
                    );
                    return Err(err)
                }
            }
        }
    }

    /// Encodes a message for sending to the peer.
    pub fn encode(&self, msg: &M) -> Bytes
    where M: Encode {
        msg.encode_to_bytes()
    }
}


//------------ CodecFactory --------------------------------------------------

/// Creates the codecs for the sessions of a protocol.
///
/// A factory is shared between all sessions of a server.
pub trait CodecFactory: Send + Sync {
    /// The type of the messages of the protocol.
    type Message: Default + Encode + Send + 'static;

    /// The state type of the message grammar.
    type State: State;

    /// Returns the grammar of the messages.
    fn grammar(&self) -> &'static Grammar<Self::Message, Self::State>;

    /// Returns the decoder configuration.
    fn config(&self) -> DecoderConfig;

    /// Creates a codec for a new session.
    fn codec(&self) -> SessionCodec<'static, Self::Message, Self::State> {
        SessionCodec::new(self.grammar(), self.config())
    }
}


//------------ KerberosCodecFactory ------------------------------------------

/// The codec factory for KDC requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct KerberosCodecFactory {
    config: DecoderConfig,
}

impl KerberosCodecFactory {
    /// Creates a factory using the given configuration.
    pub fn new(config: DecoderConfig) -> Self {
        KerberosCodecFactory { config }
    }
}

impl CodecFactory for KerberosCodecFactory {
    type Message = KdcReq;
    type State = KdcReqState;

    fn grammar(&self) -> &'static Grammar<KdcReq, KdcReqState> {
        &KDC_REQ
    }

    fn config(&self) -> DecoderConfig {
        self.config
    }
}


//------------ ChangePasswordCodecFactory ------------------------------------

/// The codec factory for the data of set/change password requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChangePasswordCodecFactory {
    config: DecoderConfig,
}

impl ChangePasswordCodecFactory {
    /// Creates a factory using the given configuration.
    pub fn new(config: DecoderConfig) -> Self {
        ChangePasswordCodecFactory { config }
    }
}

impl CodecFactory for ChangePasswordCodecFactory {
    type Message = ChangePasswdData;
    type State = ChangePasswdDataState;

    fn grammar(
        &self
    ) -> &'static Grammar<ChangePasswdData, ChangePasswdDataState> {
        &CHANGE_PASSWD_DATA
    }

    fn config(&self) -> DecoderConfig {
        self.config
    }
}


//------------ LdapCodecFactory ----------------------------------------------

/// The codec factory for LDAP messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct LdapCodecFactory {
    config: DecoderConfig,
}

impl LdapCodecFactory {
    /// Creates a factory using the given configuration.
    pub fn new(config: DecoderConfig) -> Self {
        LdapCodecFactory { config }
    }
}

impl CodecFactory for LdapCodecFactory {
    type Message = LdapMessage;
    type State = LdapMessageState;

    fn grammar(&self) -> &'static Grammar<LdapMessage, LdapMessageState> {
        &LDAP_MESSAGE
    }

    fn config(&self) -> DecoderConfig {
        self.config
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::Pos;
    use crate::ldap::ProtocolOp;

    fn messages() -> Vec<LdapMessage> {
        vec![
            LdapMessage::new(1, ProtocolOp::AbandonRequest(7)),
            LdapMessage::new(2, ProtocolOp::UnbindRequest),
        ]
    }

    #[test]
    fn receive_in_pieces() {
        let mut codec = LdapCodecFactory::default().codec();
        let mut data = Vec::new();
        for msg in messages() {
            data.extend_from_slice(&codec.encode(&msg));
        }
        // 30 06 02 01 01 50 01 07 | 30 05 02 01 02 42 00
        assert!(codec.receive(&data[..3]).unwrap().is_empty());
        assert_eq!(
            codec.receive(&data[3..10]).unwrap(),
            messages()[..1].to_vec()
        );
        assert_eq!(
            codec.receive(&data[10..]).unwrap(),
            messages()[1..].to_vec()
        );
        assert!(codec.close().unwrap().is_empty());
    }

    #[test]
    fn receive_all_at_once() {
        let mut codec = LdapCodecFactory::default().codec();
        let mut data = Vec::new();
        for msg in messages() {
            data.extend_from_slice(&codec.encode(&msg));
        }
        assert_eq!(codec.receive(&data).unwrap(), messages());
    }

    #[test]
    fn failure_poisons() {
        let mut codec = LdapCodecFactory::default().codec();
        let err = codec.receive(b"\x04\x00").unwrap_err();
        assert_eq!(err.pos(), Pos::from(0));
        assert_eq!(codec.receive(b"\x30\x05\x02\x01\x02\x42\x00"), Err(err));
    }

    #[test]
    fn close_inside_message() {
        let factory = ChangePasswordCodecFactory::default();
        let mut codec = factory.codec();
        let encoded = codec.encode(&ChangePasswdData {
            new_passwd: Bytes::from_static(b"hunter2"),
            .. Default::default()
        });
        assert!(codec.receive(&encoded[..5]).unwrap().is_empty());
        assert_eq!(
            codec.close(),
            Err(DecodeError::TruncatedInput { pos: Pos::from(5) })
        );
    }

    #[test]
    fn distinct_sessions() {
        let factory = KerberosCodecFactory::new(DecoderConfig::default());
        let one = factory.codec();
        let two = factory.codec();
        assert_ne!(one.id(), two.id());
        assert!(one.decoder().is_idle());
        assert_eq!(factory.grammar().name(), "KDC-REQ");
    }
}
