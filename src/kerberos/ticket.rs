//! Tickets.

use once_cell::sync::Lazy;
use crate::encode::{Encode, PrimitiveContent, Values, sequence, sequence_as};
use crate::grammar::{Action, Grammar};
use crate::states;
use crate::tag::Tag;
use super::key::{ENCRYPTED_DATA, EncryptedData};
use super::principal::{PRINCIPAL_NAME, PrincipalName};
use super::{PVNO, check_pvno, kerberos_string};


//------------ Ticket --------------------------------------------------------

/// A ticket.
///
/// ```text
/// Ticket          ::= [APPLICATION 1] SEQUENCE {
///         tkt-vno         [0] INTEGER (5),
///         realm           [1] Realm,
///         sname           [2] PrincipalName,
///         enc-part        [3] EncryptedData -- EncTicketPart
/// }
/// ```
///
/// Since the ticket version number can only be 5, it isn’t kept.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ticket {
    /// The realm that issued the ticket.
    pub realm: String,

    /// The name of the server.
    pub sname: PrincipalName,

    /// The encrypted part of the ticket.
    pub enc_part: EncryptedData,
}

impl Ticket {
    /// The application tag of a ticket.
    pub const TAG: Tag = Tag::application(1);
}

impl Encode for Ticket {
    fn encode(&self) -> impl Values + '_ {
        sequence_as(Self::TAG, sequence((
            PVNO.encode().explicit(Tag::ctx(0)),
            self.realm.as_str().encode_as(
                Tag::GENERAL_STRING
            ).explicit(Tag::ctx(1)),
            self.sname.encode().explicit(Tag::ctx(2)),
            self.enc_part.encode().explicit(Tag::ctx(3)),
        )))
    }
}

states! {
    /// The states of the [`TICKET`] grammar.
    pub enum TicketState {
        Start, App, Seq, VnoTag, Vno, RealmTag, Realm, Sname, EncPart,
    }
}

/// The grammar for [`Ticket`].
pub static TICKET: Lazy<Grammar<Ticket, TicketState>> = Lazy::new(|| {
    use self::TicketState::*;

    Grammar::<Ticket, _>::builder("Ticket", Start)
        .transition(Start, Ticket::TAG, App, Action::Init)
        .transition(App, Tag::SEQUENCE, Seq, Action::CheckNotEmpty)
        .transition(Seq, Tag::ctx(0), VnoTag, Action::CheckNotEmpty)
        .transition(
            VnoTag, Tag::INTEGER, Vno,
            Action::Set(|_, prim| check_pvno(prim))
        )
        .transition(Vno, Tag::ctx(1), RealmTag, Action::CheckNotEmpty)
        .transition(
            RealmTag, Tag::GENERAL_STRING, Realm,
            Action::SetNonEmpty(|ticket, prim| {
                ticket.realm = kerberos_string(prim)?;
                Ok(())
            })
        )
        .transition(
            Realm, Tag::ctx(2), Sname,
            Action::enter(&PRINCIPAL_NAME, |ticket, sname| {
                ticket.sname = sname;
                Ok(())
            })
        )
        .transition(
            Sname, Tag::ctx(3), EncPart,
            Action::enter(&ENCRYPTED_DATA, |ticket, enc_part| {
                ticket.enc_part = enc_part;
                Ok(())
            })
        )
        .accept(EncPart)
        .build()
});


//============ Tests =========================================================
