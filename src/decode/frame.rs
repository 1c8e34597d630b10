//! Parse frames.
//!
//! A frame is the part of the decoder that deals with one grammar: it holds
//! the grammar, the current state, and the container being built. The
//! decoder keeps a stack of frames, one for each nested structure currently
//! open. Since every grammar has its own container and state types, the
//! decoder only sees frames through the [`Frame`] trait.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use std::any::Any;
use tracing::trace;
use crate::grammar::{Action, Grammar, State, Transition};
use crate::tag::Tag;
use super::error::{DecodeError, Pos};
use super::header::Header;
use super::primitive::Primitive;


//------------ Dispatch ------------------------------------------------------

/// What the decoder has to do after a frame accepted a header.
pub enum Dispatch {
    /// Collect the content of the primitive value and call `Frame::apply`.
    Primitive,

    /// The content of the constructed value continues in the same frame.
    Constructed,

    /// The content of the constructed value is decoded by a new frame.
    Enter(Box<dyn Frame>),

    /// The value itself is decoded by a new frame.
    ///
    /// The decoder has to dispatch the same header again to the new frame.
    Delegate(Box<dyn Frame>),
}


//------------ Frame ---------------------------------------------------------

/// A grammar with its decoding state and container.
///
/// This trait is an implementation detail of the decoder and only public
/// because grammar links have to create frames.
pub trait Frame: Send {
    /// Returns the name of the grammar.
    fn grammar(&self) -> &'static str;

    /// Returns the name of the current state.
    fn state(&self) -> &'static str;

    /// Processes the header of a value starting at `pos`.
    fn dispatch(
        &mut self, header: Header, pos: Pos
    ) -> Result<Dispatch, DecodeError>;

    /// Applies the pending action to the complete primitive value.
    fn apply(
        &mut self, value: Primitive, pos: Pos
    ) -> Result<(), DecodeError>;

    /// Takes the value of a nested frame that just finished.
    fn adopt(
        &mut self, child: Box<dyn Any + Send>, pos: Pos
    ) -> Result<(), DecodeError>;

    /// Finishes the frame and returns its container.
    fn finish(
        self: Box<Self>, pos: Pos
    ) -> Result<Box<dyn Any + Send>, DecodeError>;
}


//------------ GrammarFrame --------------------------------------------------

/// The frame for a grammar with container type `C` and state type `S`.
pub struct GrammarFrame<'g, C, S> {
    /// The grammar.
    grammar: &'g Grammar<C, S>,

    /// The current state.
    state: S,

    /// The container.
    container: C,

    /// The transition whose action still needs to be applied.
    ///
    /// This is set while waiting for the content of a primitive value and
    /// while a nested frame is open. Alongside the transition, we keep the
    /// state it started from and the tag for error reporting.
    pending: Option<(S, Tag, &'g Transition<C, S>)>,
}

impl<'g, C: Default, S: State> GrammarFrame<'g, C, S> {
    /// Creates a new frame in the start state of the grammar.
    pub fn new(grammar: &'g Grammar<C, S>) -> Self {
        GrammarFrame {
            grammar,
            state: grammar.start(),
            container: C::default(),
            pending: None,
        }
    }

    /// Takes the pending transition.
    fn take_pending(
        &mut self, pos: Pos
    ) -> Result<(S, Tag, &'g Transition<C, S>), DecodeError> {
        self.pending.take().ok_or(DecodeError::IncompleteValue {
            grammar: self.grammar.name(),
            state: self.state.name(),
            pos
        })
    }
}

impl<'g, C, S> Frame for GrammarFrame<'g, C, S>
where C: Default + Send + 'static, S: State {
    fn grammar(&self) -> &'static str {
        self.grammar.name()
    }

    fn state(&self) -> &'static str {
        self.state.name()
    }

    fn dispatch(
        &mut self, header: Header, pos: Pos
    ) -> Result<Dispatch, DecodeError> {
        let tag = header.tag();
        let grammar = self.grammar;
        let transition = match grammar.lookup(self.state, tag) {
            Some(transition) => transition,
            None => {
                return Err(DecodeError::UnexpectedTag {
                    grammar: grammar.name(),
                    state: self.state.name(),
                    tag,
                    pos,
                })
            }
        };
        trace!(
            grammar = grammar.name(),
            from = self.state.name(),
            to = transition.next().name(),
            %tag,
            length = header.length(),
            %pos,
            "transition"
        );
        let from = self.state;
        self.state = transition.next();

        if !tag.is_constructed() {
            self.pending = Some((from, tag, transition));
            return Ok(Dispatch::Primitive)
        }

        let empty = header.length() == 0;
        let zero_length = || DecodeError::ZeroLengthField {
            grammar: grammar.name(), state: from.name(), tag, pos
        };
        match transition.action() {
            Action::Skip => Ok(Dispatch::Constructed),
            Action::Init => {
                self.container = C::default();
                Ok(Dispatch::Constructed)
            }
            Action::CheckNotEmpty => {
                if empty {
                    Err(zero_length())
                }
                else {
                    Ok(Dispatch::Constructed)
                }
            }
            Action::Enter(link) => {
                if empty {
                    return Err(zero_length())
                }
                self.pending = Some((from, tag, transition));
                Ok(Dispatch::Enter(link.open()))
            }
            Action::Delegate(link) => {
                self.pending = Some((from, tag, transition));
                Ok(Dispatch::Delegate(link.open()))
            }
            // The builder rejects setters on constructed values.
            Action::Set(_) | Action::SetNonEmpty(_) => {
                Err(DecodeError::UnexpectedTag {
                    grammar: grammar.name(), state: from.name(), tag, pos
                })
            }
        }
    }

    fn apply(
        &mut self, value: Primitive, pos: Pos
    ) -> Result<(), DecodeError> {
        let (from, tag, transition) = self.take_pending(pos)?;
        let res = match transition.action() {
            Action::Skip => Ok(()),
            Action::Init => {
                self.container = C::default();
                Ok(())
            }
            Action::CheckNotEmpty => value.check_not_empty(),
            Action::Set(set) => set(&mut self.container, &value),
            Action::SetNonEmpty(set) => {
                value.check_not_empty().and_then(|_| {
                    set(&mut self.container, &value)
                })
            }
            // The builder rejects nested grammars on primitive values.
            Action::Enter(_) | Action::Delegate(_) => {
                return Err(DecodeError::UnexpectedTag {
                    grammar: self.grammar.name(), state: from.name(), tag,
                    pos
                })
            }
        };
        res.map_err(|err| {
            DecodeError::field(
                err, self.grammar.name(), from.name(), tag, pos
            )
        })
    }

    fn adopt(
        &mut self, child: Box<dyn Any + Send>, pos: Pos
    ) -> Result<(), DecodeError> {
        let (from, tag, transition) = self.take_pending(pos)?;
        let link = match transition.action() {
            Action::Enter(link) | Action::Delegate(link) => link,
            _ => {
                return Err(DecodeError::IncompleteValue {
                    grammar: self.grammar.name(), state: from.name(), pos
                })
            }
        };
        link.close(&mut self.container, child).map_err(|err| {
            DecodeError::InvalidValue {
                grammar: self.grammar.name(),
                state: from.name(),
                tag,
                pos,
                error: err,
            }
        })
    }

    fn finish(
        self: Box<Self>, pos: Pos
    ) -> Result<Box<dyn Any + Send>, DecodeError> {
        if self.pending.is_some() || !self.grammar.is_accepting(self.state) {
            return Err(DecodeError::IncompleteValue {
                grammar: self.grammar.name(),
                state: self.state.name(),
                pos,
            })
        }
        Ok(Box::new(self.container))
    }
}
