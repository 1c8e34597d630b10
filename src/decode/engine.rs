//! The streaming decoder.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use std::fmt;
use bytes::{Buf, BytesMut};
use smallvec::SmallVec;
use tracing::{debug, trace};
use crate::config::DecoderConfig;
use crate::grammar::{Grammar, State};
use super::error::{DecodeError, Pos};
use super::frame::{Dispatch, Frame, GrammarFrame};
use super::header::Header;
use super::primitive::Primitive;


//------------ DecodeStatus --------------------------------------------------

/// The outcome of feeding data into a decoder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodeStatus<C> {
    /// More data is needed to complete the current message.
    Suspended,

    /// A message has been completed.
    ///
    /// There may be more buffered data. Call [`Decoder::decode`] to
    /// continue with it.
    Completed(C),

    /// The data is not a valid message.
    ///
    /// The decoder is now unusable.
    Failed(DecodeError),
}

impl<C> DecodeStatus<C> {
    /// Returns whether the status is `Suspended`.
    pub fn is_suspended(&self) -> bool {
        matches!(self, DecodeStatus::Suspended)
    }

    /// Converts the status into the completed message if there is one.
    pub fn completed(self) -> Option<C> {
        match self {
            DecodeStatus::Completed(msg) => Some(msg),
            _ => None
        }
    }

    /// Converts the status into the error if there is one.
    pub fn failed(self) -> Option<DecodeError> {
        match self {
            DecodeStatus::Failed(err) => Some(err),
            _ => None
        }
    }
}


//------------ Decoder -------------------------------------------------------

/// A streaming decoder for messages described by a grammar.
///
/// The decoder accepts data in chunks of any size via [`feed`][Self::feed].
/// It buffers data only until it can make progress: a header is processed
/// as soon as it is complete, the content of a primitive value as soon as
/// all of it has arrived. Whatever the chunks, the same data always leads
/// to the same results.
///
/// For every constructed value that is currently open, the decoder keeps
/// track of how many octets of its content are still to come. Every
/// value’s total size is charged against the innermost of these budgets.
/// A value that doesn’t fit is an error.
///
/// Nested structures described by a grammar of their own are decoded in a
/// frame of their own. The decoder keeps a stack of these. When a frame’s
/// outermost value is complete, the frame is closed and its result handed
/// to the frame below. When the frame at the bottom of the stack is closed,
/// the message is complete.
///
/// Once an error has occurred, the decoder is poisoned and returns the
/// same error on every further call.
pub struct Decoder<'g, C, S> {
    /// The grammar for the messages.
    grammar: &'g Grammar<C, S>,

    /// The configuration.
    config: DecoderConfig,

    /// Data received but not yet processed.
    buf: BytesMut,

    /// The stream position of the start of `buf`.
    pos: Pos,

    /// The stack of open frames.
    frames: Vec<Entry<'g>>,

    /// The header of a primitive value whose content is still missing.
    value: Option<Header>,

    /// The error that poisoned the decoder.
    error: Option<DecodeError>,
}

/// An open frame on the decoder’s stack.
struct Entry<'g> {
    /// The frame.
    frame: Box<dyn Frame + 'g>,

    /// The remaining content lengths of the frame’s open values.
    budgets: SmallVec<[usize; 8]>,

    /// Whether the frame has seen its first header.
    started: bool,
}

impl<'g> Entry<'g> {
    fn new(frame: Box<dyn Frame + 'g>) -> Self {
        Entry { frame, budgets: SmallVec::new(), started: false }
    }
}

impl<'g, C, S> Decoder<'g, C, S>
where C: Default + Send + 'static, S: State {
    /// Creates a new decoder for the given grammar.
    pub fn new(grammar: &'g Grammar<C, S>, config: DecoderConfig) -> Self {
        Decoder {
            grammar,
            config,
            buf: BytesMut::new(),
            pos: Pos::default(),
            frames: Vec::new(),
            value: None,
            error: None,
        }
    }

    /// Returns the grammar of the decoder.
    pub fn grammar(&self) -> &'g Grammar<C, S> {
        self.grammar
    }

    /// Returns the stream position up to which data has been processed.
    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Returns the number of octets received but not yet processed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns whether the decoder is between messages.
    pub fn is_idle(&self) -> bool {
        self.frames.is_empty() && self.value.is_none()
    }

    /// Feeds more data into the decoder.
    ///
    /// Processes as much of the buffered data as possible and returns
    /// after the first completed message. Since data following that
    /// message stays buffered, you should call [`decode`][Self::decode]
    /// until it returns `Suspended` before feeding more data.
    pub fn feed(&mut self, data: &[u8]) -> DecodeStatus<C> {
        if self.error.is_none() {
            self.buf.extend_from_slice(data);
        }
        self.decode()
    }

    /// Continues decoding the buffered data.
    pub fn decode(&mut self) -> DecodeStatus<C> {
        if let Some(err) = self.error.as_ref() {
            return DecodeStatus::Failed(err.clone())
        }
        match self.run() {
            Ok(Some(msg)) => DecodeStatus::Completed(msg),
            Ok(None) => DecodeStatus::Suspended,
            Err(err) => {
                debug!(
                    grammar = self.grammar.name(),
                    error = %err,
                    "decoding failed"
                );
                self.error = Some(err.clone());
                DecodeStatus::Failed(err)
            }
        }
    }

    /// Signals the end of the stream.
    ///
    /// Returns a message still completed by buffered data, if any. Call the
    /// method again until it returns `Ok(None)` which means the stream
    /// ended cleanly between two messages. If the stream ends inside a
    /// message, the method fails with [`DecodeError::TruncatedInput`].
    pub fn finish(&mut self) -> Result<Option<C>, DecodeError> {
        match self.decode() {
            DecodeStatus::Completed(msg) => return Ok(Some(msg)),
            DecodeStatus::Failed(err) => return Err(err),
            DecodeStatus::Suspended => { }
        }
        if self.is_idle() && self.buf.is_empty() {
            return Ok(None)
        }
        let err = DecodeError::TruncatedInput {
            pos: self.pos + self.buf.len()
        };
        debug!(
            grammar = self.grammar.name(),
            error = %err,
            "stream ended inside a message"
        );
        self.error = Some(err.clone());
        Err(err)
    }

    /// Processes buffered data until a message is complete.
    fn run(&mut self) -> Result<Option<C>, DecodeError> {
        loop {
            if let Some(header) = self.value {
                if self.buf.len() < header.length() {
                    return Ok(None)
                }
                self.value = None;
                let start = self.pos;
                let content = self.buf.split_to(header.length()).freeze();
                self.pos = self.pos + header.length();
                self.top()?.frame.apply(
                    Primitive::new(header.tag(), content), start
                )?;
            }
            else {
                let header = match Header::take_from(
                    &self.buf, self.config.mode, self.config.max_length,
                    self.pos
                )? {
                    Some(header) => header,
                    None => return Ok(None)
                };
                self.process(header)?;
                if self.value.is_some() {
                    continue
                }
            }
            if let Some(msg) = self.close()? {
                return Ok(Some(msg))
            }
        }
    }

    /// Processes a header.
    fn process(&mut self, header: Header) -> Result<(), DecodeError> {
        let pos = self.pos;
        if self.frames.is_empty() {
            debug!(grammar = self.grammar.name(), %pos, "starting message");
            self.frames.push(Entry::new(
                Box::new(GrammarFrame::new(self.grammar))
            ));
        }

        let top = self.top()?;
        if let Some(remaining) = top.budgets.last_mut() {
            if header.total_len() > *remaining {
                return Err(DecodeError::NestedLengthMismatch {
                    pos, remaining: *remaining, needed: header.total_len()
                })
            }
            *remaining -= header.total_len();
        }
        self.buf.advance(header.header_len());
        self.pos = self.pos + header.header_len();

        loop {
            let top = self.top()?;
            top.started = true;
            match top.frame.dispatch(header, pos)? {
                Dispatch::Primitive => {
                    self.value = Some(header);
                }
                Dispatch::Constructed => {
                    top.budgets.push(header.length());
                }
                Dispatch::Enter(frame) => {
                    debug!(
                        grammar = frame.grammar(), %pos, "entering frame"
                    );
                    let mut entry = Entry::new(frame);
                    entry.budgets.push(header.length());
                    entry.started = true;
                    self.frames.push(entry);
                }
                Dispatch::Delegate(frame) => {
                    debug!(
                        grammar = frame.grammar(), %pos, "delegating frame"
                    );
                    self.frames.push(Entry::new(frame));
                    continue
                }
            }
            return Ok(())
        }
    }

    /// Closes all values and frames that are complete.
    ///
    /// Returns the message if the root frame was closed.
    fn close(&mut self) -> Result<Option<C>, DecodeError> {
        loop {
            let top = match self.frames.last_mut() {
                Some(top) => top,
                None => return Ok(None)
            };
            match top.budgets.last().copied() {
                Some(0) => {
                    top.budgets.pop();
                    trace!(
                        grammar = top.frame.grammar(),
                        state = top.frame.state(),
                        "value complete"
                    );
                    if !top.budgets.is_empty() {
                        continue
                    }
                }
                // No value fits into a single octet.
                Some(1) => {
                    return Err(DecodeError::NestedLengthMismatch {
                        pos: self.pos, remaining: 1, needed: 2
                    })
                }
                Some(_) => return Ok(None),
                None => {
                    if !top.started {
                        return Ok(None)
                    }
                }
            }

            let entry = match self.frames.pop() {
                Some(entry) => entry,
                None => return Ok(None)
            };
            let grammar = entry.frame.grammar();
            let value = entry.frame.finish(self.pos)?;
            match self.frames.last_mut() {
                Some(parent) => {
                    debug!(grammar, pos = %self.pos, "leaving frame");
                    parent.frame.adopt(value, self.pos)?;
                }
                None => {
                    debug!(grammar, pos = %self.pos, "message complete");
                    return match value.downcast::<C>() {
                        Ok(msg) => Ok(Some(*msg)),
                        Err(_) => unreachable!("root frame of wrong type"),
                    }
                }
            }
        }
    }

    /// Returns the innermost frame.
    fn top(&mut self) -> Result<&mut Entry<'g>, DecodeError> {
        match self.frames.last_mut() {
            Some(top) => Ok(top),
            None => Err(DecodeError::TruncatedInput { pos: self.pos })
        }
    }
}

impl<'g, C, S: State> fmt::Debug for Decoder<'g, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("grammar", &self.grammar.name())
            .field("config", &self.config)
            .field("pos", &self.pos)
            .field("buffered", &self.buf.len())
            .field("frames", &self.frames.len())
            .field("error", &self.error)
            .finish()
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use once_cell::sync::Lazy;
    use crate::grammar::Action;
    use crate::states;
    use crate::tag::Tag;

    // A pair of integers with an optional list of strings:
    //
    // Pair ::= SEQUENCE {
    //     first  [0] INTEGER,
    //     second [1] INTEGER OPTIONAL,
    //     names  [2] SEQUENCE OF Name OPTIONAL
    // }
    //
    // Name ::= SEQUENCE { value UTF8String }

    #[derive(Clone, Debug, Default, Eq, PartialEq)]
    struct Pair {
        first: i32,
        second: Option<i32>,
        names: Vec<String>,
    }

    #[derive(Clone, Debug, Default, Eq, PartialEq)]
    struct Name(String);

    states! {
        enum PairState {
            Start, Seq, FirstTag, First, SecondTag, Second, NamesTag,
            NamesSeq, Names,
        }
    }

    states! {
        enum NameState { Start, Seq, Value }
    }

    static NAME: Lazy<Grammar<Name, NameState>> = Lazy::new(|| {
        Grammar::builder("Name", NameState::Start)
            .transition(
                NameState::Start, Tag::SEQUENCE, NameState::Seq,
                Action::Init
            )
            .transition(
                NameState::Seq, Tag::UTF8_STRING, NameState::Value,
                Action::Set(|name: &mut Name, prim| {
                    name.0 = prim.to_utf8()?;
                    Ok(())
                })
            )
            .accept(NameState::Value)
            .build()
    });

    static PAIR: Lazy<Grammar<Pair, PairState>> = Lazy::new(|| {
        use self::PairState::*;

        Grammar::builder("Pair", Start)
            .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
            .transition(Seq, Tag::ctx(0), FirstTag, Action::CheckNotEmpty)
            .transition(
                FirstTag, Tag::INTEGER, First,
                Action::Set(|pair: &mut Pair, prim| {
                    pair.first = prim.to_i32()?;
                    Ok(())
                })
            )
            .transition(First, Tag::ctx(1), SecondTag, Action::CheckNotEmpty)
            .transition(
                SecondTag, Tag::INTEGER, Second,
                Action::Set(|pair: &mut Pair, prim| {
                    pair.second = Some(prim.to_i32()?);
                    Ok(())
                })
            )
            .transition(First, Tag::ctx(2), NamesTag, Action::CheckNotEmpty)
            .transition(Second, Tag::ctx(2), NamesTag, Action::CheckNotEmpty)
            .transition(NamesTag, Tag::SEQUENCE, NamesSeq, Action::Skip)
            .transition(
                NamesSeq, Tag::SEQUENCE, Names,
                Action::delegate(&NAME, |pair: &mut Pair, name: Name| {
                    pair.names.push(name.0);
                    Ok(())
                })
            )
            .transition(
                Names, Tag::SEQUENCE, Names,
                Action::delegate(&NAME, |pair: &mut Pair, name: Name| {
                    pair.names.push(name.0);
                    Ok(())
                })
            )
            .accept(First)
            .accept(Second)
            .accept(Names)
            .build()
    });

    const FULL: &[u8] = b"\
        \x30\x1a\
            \xa0\x03\x02\x01\x05\
            \xa1\x04\x02\x02\x01\x00\
            \xa2\x0d\
                \x30\x0b\
                    \x30\x03\x0c\x01a\
                    \x30\x04\x0c\x02bc";

    fn full() -> Pair {
        Pair {
            first: 5,
            second: Some(256),
            names: vec!["a".into(), "bc".into()],
        }
    }

    fn pair_decoder() -> Decoder<'static, Pair, PairState> {
        Decoder::new(&PAIR, DecoderConfig::default())
    }

    #[test]
    fn complete_message() {
        let mut decoder = pair_decoder();
        assert_eq!(decoder.feed(FULL), DecodeStatus::Completed(full()));
        assert!(decoder.is_idle());
        assert_eq!(decoder.pos(), Pos::from(FULL.len()));
        assert_eq!(decoder.finish(), Ok(None));
    }

    #[test]
    fn one_octet_at_a_time() {
        let mut decoder = pair_decoder();
        let (last, head) = FULL.split_last().unwrap();
        for octet in head {
            assert_eq!(
                decoder.feed(std::slice::from_ref(octet)),
                DecodeStatus::Suspended
            );
        }
        assert_eq!(
            decoder.feed(std::slice::from_ref(last)),
            DecodeStatus::Completed(full())
        );
    }

    #[test]
    fn optional_fields() {
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x05\xa0\x03\x02\x01\x05"),
            DecodeStatus::Completed(Pair { first: 5, .. Default::default() })
        );
    }

    #[test]
    fn back_to_back() {
        let mut data = FULL.to_vec();
        data.extend_from_slice(b"\x30\x05\xa0\x03\x02\x01\x07");
        let mut decoder = pair_decoder();
        assert_eq!(decoder.feed(&data), DecodeStatus::Completed(full()));
        assert_eq!(decoder.buffered(), 7);
        assert_eq!(
            decoder.decode().completed().map(|pair| pair.first), Some(7)
        );
        assert_eq!(decoder.decode(), DecodeStatus::Suspended);
    }

    #[test]
    fn missing_mandatory_field() {
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x00"),
            DecodeStatus::Failed(DecodeError::IncompleteValue {
                grammar: "Pair", state: "Seq", pos: Pos::from(2)
            })
        );
    }

    #[test]
    fn unexpected_tag_poisons() {
        let mut decoder = pair_decoder();
        let err = DecodeError::UnexpectedTag {
            grammar: "Pair", state: "Seq", tag: Tag::ctx(1),
            pos: Pos::from(2)
        };
        assert_eq!(
            decoder.feed(b"\x30\x05\xa1\x03\x02\x01\x05"),
            DecodeStatus::Failed(err.clone())
        );
        assert_eq!(decoder.feed(FULL), DecodeStatus::Failed(err.clone()));
        assert_eq!(decoder.finish(), Err(err));
    }

    #[test]
    fn length_overflow() {
        // The explicit tag claims one octet less than its content needs.
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x05\xa0\x02\x02\x01\x05"),
            DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
                pos: Pos::from(4), remaining: 2, needed: 3
            })
        );

        // The sequence claims one octet less than its content needs.
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x04\xa0\x03\x02\x01\x05"),
            DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
                pos: Pos::from(2), remaining: 4, needed: 5
            })
        );
    }

    #[test]
    fn length_shortfall() {
        // The explicit tag claims one octet more than its content has. The
        // single octet left can’t hold another value.
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x0a\xa0\x04\x02\x01\x05\xa1\x03"),
            DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
                pos: Pos::from(7), remaining: 1, needed: 2
            })
        );

        // The explicit tag claims two octets more, so the following value
        // doesn’t fit anymore.
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(
                b"\x30\x0b\xa0\x05\x02\x01\x05\xa1\x03\x02\x01\x06"
            ),
            DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
                pos: Pos::from(7), remaining: 2, needed: 5
            })
        );

        // The sequence claims one octet more than its content has. This is
        // noticed as soon as the last value is complete.
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x06\xa0\x03\x02\x01\x05"),
            DecodeStatus::Failed(DecodeError::NestedLengthMismatch {
                pos: Pos::from(7), remaining: 1, needed: 2
            })
        );
    }

    #[test]
    fn truncation() {
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(&FULL[..FULL.len() - 1]), DecodeStatus::Suspended
        );
        assert_eq!(
            decoder.finish(),
            Err(DecodeError::TruncatedInput {
                pos: Pos::from(FULL.len() - 1)
            })
        );

        let mut decoder = pair_decoder();
        assert_eq!(decoder.feed(b"\x30"), DecodeStatus::Suspended);
        assert!(decoder.is_idle());
        assert_eq!(
            decoder.finish(),
            Err(DecodeError::TruncatedInput { pos: Pos::from(1) })
        );
    }

    #[test]
    fn finish_drains_buffer() {
        let mut data = FULL.to_vec();
        data.extend_from_slice(FULL);
        let mut decoder = pair_decoder();
        assert_eq!(decoder.feed(&data), DecodeStatus::Completed(full()));
        assert_eq!(decoder.finish(), Ok(Some(full())));
        assert_eq!(decoder.finish(), Ok(None));
    }

    #[test]
    fn max_length() {
        let mut decoder = Decoder::new(
            &PAIR, DecoderConfig::default().with_max_length(16)
        );
        assert!(matches!(
            decoder.feed(b"\x30\x81\x80"),
            DecodeStatus::Failed(DecodeError::MalformedLength { .. })
        ));
    }

    #[test]
    fn invalid_value() {
        let mut decoder = pair_decoder();
        assert_eq!(
            decoder.feed(b"\x30\x06\xa0\x04\x02\x02\x00\x05"),
            DecodeStatus::Failed(DecodeError::InvalidValue {
                grammar: "Pair", state: "FirstTag", tag: Tag::INTEGER,
                pos: Pos::from(6),
                error: crate::decode::FieldError::InvalidInteger,
            })
        );
    }
}
