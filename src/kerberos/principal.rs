//! Principal names.

use std::fmt;
use once_cell::sync::Lazy;
use crate::encode::{Encode, PrimitiveContent, Values, iter, sequence};
use crate::grammar::{Action, Grammar};
use crate::states;
use crate::tag::Tag;
use super::kerberos_string;


//------------ PrincipalName -------------------------------------------------

/// The name of a principal.
///
/// ```text
/// PrincipalName   ::= SEQUENCE {
///         name-type       [0] Int32,
///         name-string     [1] SEQUENCE OF KerberosString
/// }
/// ```
///
/// A name has at least one component and none of them can be empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrincipalName {
    /// The type of the name.
    pub name_type: i32,

    /// The components of the name.
    pub name_string: Vec<String>,
}

impl PrincipalName {
    /// The name of a user.
    pub const NT_PRINCIPAL: i32 = 1;

    /// The name of a service and instance, such as `krbtgt/EXAMPLE.COM`.
    pub const NT_SRV_INST: i32 = 2;

    /// A service with the host name as instance.
    pub const NT_SRV_HST: i32 = 3;

    /// An enterprise name.
    pub const NT_ENTERPRISE: i32 = 10;

    /// Creates a new name from its type and components.
    pub fn new<I, S>(name_type: i32, components: I) -> Self
    where I: IntoIterator<Item = S>, S: Into<String> {
        PrincipalName {
            name_type,
            name_string: components.into_iter().map(Into::into).collect()
        }
    }
}

impl Encode for PrincipalName {
    fn encode(&self) -> impl Values + '_ {
        sequence((
            self.name_type.encode().explicit(Tag::ctx(0)),
            sequence(
                iter(self.name_string.iter().map(|component| {
                    component.as_str().encode_as(Tag::GENERAL_STRING)
                }))
            ).explicit(Tag::ctx(1)),
        ))
    }
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut components = self.name_string.iter();
        if let Some(first) = components.next() {
            f.write_str(first)?;
            for component in components {
                write!(f, "/{}", component)?;
            }
        }
        Ok(())
    }
}

states! {
    /// The states of the [`PRINCIPAL_NAME`] grammar.
    pub enum PrincipalNameState {
        Start, Seq, TypeTag, Type, StringTag, StringSeq, Component,
    }
}

/// The grammar for [`PrincipalName`].
pub static PRINCIPAL_NAME: Lazy<
    Grammar<PrincipalName, PrincipalNameState>
> = Lazy::new(|| {
    use self::PrincipalNameState::*;

    Grammar::<PrincipalName, _>::builder("PrincipalName", Start)
        .transition(Start, Tag::SEQUENCE, Seq, Action::Init)
        .transition(Seq, Tag::ctx(0), TypeTag, Action::CheckNotEmpty)
        .transition(
            TypeTag, Tag::INTEGER, Type,
            Action::Set(|name, prim| {
                name.name_type = prim.to_i32()?;
                Ok(())
            })
        )
        .transition(Type, Tag::ctx(1), StringTag, Action::CheckNotEmpty)
        .transition(
            StringTag, Tag::SEQUENCE, StringSeq, Action::CheckNotEmpty
        )
        .transition(
            StringSeq, Tag::GENERAL_STRING, Component,
            Action::SetNonEmpty(|name, prim| {
                name.name_string.push(kerberos_string(prim)?);
                Ok(())
            })
        )
        .transition(
            Component, Tag::GENERAL_STRING, Component,
            Action::SetNonEmpty(|name, prim| {
                name.name_string.push(kerberos_string(prim)?);
                Ok(())
            })
        )
        .accept(Component)
        .build()
});


//============ Tests =========================================================
