//! Deciding whether a bind is permitted.
//!
//! Once a bind request has been decoded, the server hands its name to an
//! [`Authenticator`] which either returns the [`Principal`] the session is
//! bound as or refuses with [`AccessDenied`]. The only authenticator
//! provided here is the [`AnonymousAuthenticator`].

use thiserror::Error;
use tracing::debug;
use crate::ldap::Dn;


//------------ Principal -----------------------------------------------------

/// The identity a session is bound as.
///
/// Only anonymous binds are decided here. Named principals come with the
/// authenticators that check credentials.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Principal {
    /// The anonymous user.
    Anonymous,
}

impl Principal {
    /// Returns whether this is the anonymous user.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }
}


//------------ Authenticator -------------------------------------------------

/// Something that decides whether a bind is permitted.
pub trait Authenticator: Send + Sync {
    /// Decides whether binding as `name` is permitted.
    fn authenticate(&self, name: &Dn) -> Result<Principal, AccessDenied>;
}


//------------ AnonymousAuthenticator ----------------------------------------

/// The authenticator for anonymous binds.
///
/// Binding with the empty name is always permitted since that’s how
/// clients read the root DSE. Binding with any other name is only permitted
/// if the service allows anonymous access. Either way, the session is bound
/// as [`Principal::Anonymous`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct AnonymousAuthenticator {
    /// Whether anonymous access is allowed for any name.
    pub allow_anonymous: bool,
}

impl AnonymousAuthenticator {
    /// Creates a new authenticator.
    pub fn new(allow_anonymous: bool) -> Self {
        AnonymousAuthenticator { allow_anonymous }
    }
}

impl Authenticator for AnonymousAuthenticator {
    fn authenticate(&self, name: &Dn) -> Result<Principal, AccessDenied> {
        if self.allow_anonymous || name.is_empty() {
            debug!(%name, "anonymous bind permitted");
            Ok(Principal::Anonymous)
        }
        else {
            debug!(%name, "anonymous bind refused");
            Err(AccessDenied { name: name.clone() })
        }
    }
}


//------------ AccessDenied --------------------------------------------------

/// A bind was refused.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("anonymous bind not permitted for '{name}'")]
pub struct AccessDenied {
    /// The name of the refused bind.
    pub name: Dn,
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn root_dse_always_permitted() {
        for allow in [false, true] {
            let principal = AnonymousAuthenticator::new(allow).authenticate(
                &Dn::root()
            ).unwrap();
            assert!(principal.is_anonymous());
        }
    }

    #[test]
    fn named_bind() {
        let name: Dn = "uid=admin,ou=system".parse().unwrap();
        assert_eq!(
            AnonymousAuthenticator::new(true).authenticate(&name),
            Ok(Principal::Anonymous)
        );
        let err = AnonymousAuthenticator::default().authenticate(
            &name
        ).unwrap_err();
        assert_eq!(err.name, name);
        assert_eq!(
            err.to_string(),
            "anonymous bind not permitted for 'uid=admin,ou=system'"
        );
    }
}
