//! Grammars describing the structure of messages.
//!
//! A [`Grammar`] is the complete transition table for one message type. The
//! decoder keeps the grammar in a current state and, for each encoded value
//! it reads, looks up the pair of that state and the value’s tag. The
//! resulting [`Transition`] names the next state and an [`Action`] to apply.
//! If there is no transition, the input doesn’t follow the grammar and
//! decoding fails.
//!
//! Grammars are built once via a [`GrammarBuilder`] and never change
//! afterwards. They don’t contain any decoding state, so a single grammar
//! can be used by any number of decoders at the same time. Typically, a
//! grammar lives in a static.
//!
//! Each grammar has its own enum of states. The [`states!`] macro defines
//! such an enum together with its [`State`] impl:
//!
//! ```
//! use bergram::states;
//!
//! states! {
//!     /// The states of the EncryptionKey grammar.
//!     pub enum KeyState {
//!         Start, Seq, TypeTag, Type, ValueTag, Value,
//!     }
//! }
//! ```
//!
//! Nested structures are decoded by a grammar of their own: a transition
//! with an [`Action::enter`] or [`Action::delegate`] action starts a new
//! frame with the other grammar and hands the decoded value back via a
//! callback once it is complete.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use smallvec::SmallVec;
use crate::decode::{FieldError, Frame, GrammarFrame, Primitive};
use crate::tag::Tag;


//------------ State ---------------------------------------------------------

/// A state of a grammar.
///
/// You will normally not implement this trait yourself but use the
/// [`states!`] macro.
pub trait State: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Returns the name of the state for diagnostics.
    fn name(self) -> &'static str;
}

/// Defines an enum of grammar states.
///
/// The macro takes an enum definition with unit variants only, adds the
/// derives necessary for the [`State`] trait and implements it.
#[macro_export]
macro_rules! states {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vattr:meta])* $variant:ident ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        $vis enum $name {
            $( $(#[$vattr])* $variant ),*
        }

        impl $crate::grammar::State for $name {
            fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),*
                }
            }
        }
    }
}


//------------ Setter --------------------------------------------------------

/// A function assigning a primitive value to a field of a container.
pub type Setter<C> = fn(&mut C, &Primitive) -> Result<(), FieldError>;

/// A function assigning a decoded nested value to a field of a container.
pub type Assign<C, D> = fn(&mut C, D) -> Result<(), FieldError>;


//------------ Action --------------------------------------------------------

/// The action applied when a transition is taken.
///
/// Actions never touch the grammar. They only operate on the container of
/// the frame the transition happened in and on the value that caused the
/// transition.
pub enum Action<C> {
    /// Don’t do anything besides changing state.
    Skip,

    /// Initializes the container.
    ///
    /// This is used on the outermost value of a structure and resets the
    /// container to its default.
    Init,

    /// Rejects values with a zero length.
    ///
    /// This is used on explicit tags of mandatory fields.
    CheckNotEmpty,

    /// Decodes a primitive value into a field of the container.
    Set(Setter<C>),

    /// Like `Set` but rejects empty values first.
    SetNonEmpty(Setter<C>),

    /// Decodes the content of a constructed value with a different grammar.
    ///
    /// The content of the value must be non-empty.
    Enter(Box<dyn Link<C>>),

    /// Decodes the value itself with a different grammar.
    ///
    /// This is used for the elements of a SEQUENCE OF where the element’s
    /// grammar starts with the element’s tag.
    Delegate(Box<dyn Link<C>>),
}

impl<C: 'static> Action<C> {
    /// Creates an action decoding the content with another grammar.
    pub fn enter<D, T>(
        grammar: &'static Grammar<D, T>,
        assign: Assign<C, D>,
    ) -> Self
    where D: Default + Send + 'static, T: State {
        Action::Enter(Box::new(Nested { grammar, assign }))
    }

    /// Creates an action decoding the value itself with another grammar.
    pub fn delegate<D, T>(
        grammar: &'static Grammar<D, T>,
        assign: Assign<C, D>,
    ) -> Self
    where D: Default + Send + 'static, T: State {
        Action::Delegate(Box::new(Nested { grammar, assign }))
    }
}

impl<C> Action<C> {
    /// Returns whether the action can be applied to a primitive value.
    fn allows_primitive(&self) -> bool {
        !matches!(self, Action::Enter(_) | Action::Delegate(_))
    }

    /// Returns whether the action can be applied to a constructed value.
    fn allows_constructed(&self) -> bool {
        !matches!(self, Action::Set(_) | Action::SetNonEmpty(_))
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Skip => f.write_str("Skip"),
            Action::Init => f.write_str("Init"),
            Action::CheckNotEmpty => f.write_str("CheckNotEmpty"),
            Action::Set(_) => f.write_str("Set"),
            Action::SetNonEmpty(_) => f.write_str("SetNonEmpty"),
            Action::Enter(link) => write!(f, "Enter({})", link.name()),
            Action::Delegate(link) => {
                write!(f, "Delegate({})", link.name())
            }
        }
    }
}


//------------ Link ----------------------------------------------------------

/// The connection between a grammar and the grammar of a nested structure.
///
/// This trait erases the container and state types of the nested grammar
/// so that actions of a grammar can refer to grammars of any type.
pub trait Link<C>: Send + Sync {
    /// Returns the name of the nested grammar.
    fn name(&self) -> &'static str;

    /// Creates a new frame for the nested grammar.
    #[doc(hidden)]
    fn open(&self) -> Box<dyn Frame>;

    /// Hands the value produced by the nested frame to the parent container.
    #[doc(hidden)]
    fn close(
        &self, parent: &mut C, child: Box<dyn Any + Send>
    ) -> Result<(), FieldError>;
}

/// The one implementation of `Link`.
struct Nested<C, D: 'static, T: 'static> {
    grammar: &'static Grammar<D, T>,
    assign: Assign<C, D>,
}

impl<C, D, T> Link<C> for Nested<C, D, T>
where D: Default + Send + 'static, T: State {
    fn name(&self) -> &'static str {
        self.grammar.name()
    }

    fn open(&self) -> Box<dyn Frame> {
        Box::new(GrammarFrame::new(self.grammar))
    }

    fn close(
        &self, parent: &mut C, child: Box<dyn Any + Send>
    ) -> Result<(), FieldError> {
        match child.downcast::<D>() {
            Ok(child) => (self.assign)(parent, *child),
            Err(_) => Err(FieldError::Unexpected("nested value of wrong type"))
        }
    }
}


//------------ Transition ----------------------------------------------------

/// A transition of a grammar.
#[derive(Debug)]
pub struct Transition<C, S> {
    /// The state after the transition.
    next: S,

    /// The action to apply.
    action: Action<C>,
}

impl<C, S: Copy> Transition<C, S> {
    /// Returns the state after the transition.
    pub fn next(&self) -> S {
        self.next
    }

    /// Returns the action of the transition.
    pub fn action(&self) -> &Action<C> {
        &self.action
    }
}


//------------ Grammar -------------------------------------------------------

/// The transition table for one message type.
pub struct Grammar<C, S> {
    /// The name of the grammar.
    ///
    /// This is the name of the ASN.1 type and only used for diagnostics.
    name: &'static str,

    /// The state a new frame starts in.
    start: S,

    /// The states a frame can end in.
    accept: SmallVec<[S; 4]>,

    /// The transitions keyed by current state and tag.
    transitions: HashMap<(S, Tag), Transition<C, S>>,
}

impl<C, S: State> Grammar<C, S> {
    /// Starts building a new grammar.
    pub fn builder(name: &'static str, start: S) -> GrammarBuilder<C, S> {
        GrammarBuilder {
            grammar: Grammar {
                name, start,
                accept: SmallVec::new(),
                transitions: HashMap::new(),
            }
        }
    }

    /// Returns the name of the grammar.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the start state.
    pub fn start(&self) -> S {
        self.start
    }

    /// Looks up the transition for a state and tag.
    pub fn lookup(&self, state: S, tag: Tag) -> Option<&Transition<C, S>> {
        self.transitions.get(&(state, tag))
    }

    /// Returns whether a frame may end in the given state.
    pub fn is_accepting(&self, state: S) -> bool {
        self.accept.contains(&state)
    }

    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns whether the grammar has no transitions at all.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<C, S: fmt::Debug> fmt::Debug for Grammar<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("accept", &self.accept)
            .field("transitions", &self.transitions.len())
            .finish()
    }
}


//------------ GrammarBuilder ------------------------------------------------

/// Builds a grammar.
///
/// Transitions are added one by one in the order of the ASN.1 definition.
/// Since grammars are built from constants when a program starts, mistakes
/// in the definition are programming errors and lead to panics.
pub struct GrammarBuilder<C, S> {
    grammar: Grammar<C, S>,
}

impl<C, S: State> GrammarBuilder<C, S> {
    /// Adds a transition.
    ///
    /// # Panics
    ///
    /// The method panics if there already is a transition for `from` and
    /// `tag`, if a `Set` action is used with a constructed tag, or if a
    /// nested grammar is used with a primitive tag.
    pub fn transition(
        mut self, from: S, tag: Tag, next: S, action: Action<C>
    ) -> Self {
        if tag.is_constructed() {
            assert!(
                action.allows_constructed(),
                "{}: {:?} can’t decode constructed {}",
                self.grammar.name, action, tag
            );
        }
        else {
            assert!(
                action.allows_primitive(),
                "{}: {:?} can’t decode primitive {}",
                self.grammar.name, action, tag
            );
        }
        let old = self.grammar.transitions.insert(
            (from, tag), Transition { next, action }
        );
        assert!(
            old.is_none(),
            "{}: duplicate transition for {:?} and {}",
            self.grammar.name, from, tag
        );
        self
    }

    /// Marks a state as one a frame can end in.
    pub fn accept(mut self, state: S) -> Self {
        if !self.grammar.accept.contains(&state) {
            self.grammar.accept.push(state)
        }
        self
    }

    /// Finishes building.
    pub fn build(self) -> Grammar<C, S> {
        self.grammar
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    states! {
        enum TestState { Start, Seq, Value }
    }

    #[derive(Default)]
    struct Value(i32);

    fn grammar() -> Grammar<Value, TestState> {
        Grammar::builder("Test", TestState::Start)
            .transition(
                TestState::Start, Tag::SEQUENCE, TestState::Seq,
                Action::Init
            )
            .transition(
                TestState::Seq, Tag::INTEGER, TestState::Value,
                Action::Set(|value: &mut Value, prim| {
                    value.0 = prim.to_i32()?;
                    Ok(())
                })
            )
            .accept(TestState::Value)
            .build()
    }

    #[test]
    fn lookup() {
        let grammar = grammar();
        assert_eq!(grammar.len(), 2);
        assert_eq!(grammar.start(), TestState::Start);
        assert_eq!(
            grammar.lookup(TestState::Start, Tag::SEQUENCE).unwrap().next(),
            TestState::Seq
        );
        assert!(grammar.lookup(TestState::Start, Tag::INTEGER).is_none());
        assert!(grammar.lookup(TestState::Seq, Tag::SEQUENCE).is_none());
        assert!(grammar.is_accepting(TestState::Value));
        assert!(!grammar.is_accepting(TestState::Seq));
        assert_eq!(TestState::Seq.name(), "Seq");
    }

    #[test]
    #[should_panic]
    fn duplicate_transition() {
        let _ = Grammar::<Value, _>::builder("Test", TestState::Start)
            .transition(
                TestState::Start, Tag::SEQUENCE, TestState::Seq, Action::Init
            )
            .transition(
                TestState::Start, Tag::SEQUENCE, TestState::Value,
                Action::Skip
            );
    }

    #[test]
    #[should_panic]
    fn set_on_constructed() {
        let _ = Grammar::<Value, _>::builder("Test", TestState::Start)
            .transition(
                TestState::Start, Tag::SEQUENCE, TestState::Seq,
                Action::Set(|_, _| Ok(()))
            );
    }
}
