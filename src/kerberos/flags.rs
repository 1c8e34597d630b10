//! Kerberos flags.

use std::fmt;
use crate::encode::{PrimitiveContent, Target};
use crate::tag::Tag;


//------------ KerberosFlags -------------------------------------------------

/// A set of Kerberos flags.
///
/// KerberosFlags are a BIT STRING of at least 32 bits where bit zero is the
/// leftmost bit. We keep the first 32 bits in a `u32` with bit zero as the
/// most significant bit and always encode exactly 32 bits.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct KerberosFlags(u32);

impl KerberosFlags {
    /// The ticket may be forwarded.
    pub const FORWARDABLE: u32 = 1;

    /// The ticket has been forwarded.
    pub const FORWARDED: u32 = 2;

    /// The ticket may be used to get proxy tickets.
    pub const PROXIABLE: u32 = 3;

    /// The ticket is a proxy ticket.
    pub const PROXY: u32 = 4;

    /// Postdated tickets may be issued from this ticket.
    pub const ALLOW_POSTDATE: u32 = 5;

    /// The ticket is postdated.
    pub const POSTDATED: u32 = 6;

    /// The ticket is renewable.
    pub const RENEWABLE: u32 = 8;

    /// Hardware authentication is required.
    pub const OPT_HARDWARE_AUTH: u32 = 11;

    /// Don’t check the transited field.
    pub const DISABLE_TRANSITED_CHECK: u32 = 26;

    /// A renewable ticket is acceptable instead of a shorter lifetime.
    pub const RENEWABLE_OK: u32 = 27;

    /// Encrypt the ticket in the session key of the additional ticket.
    pub const ENC_TKT_IN_SKEY: u32 = 28;

    /// The request is for a renewal.
    pub const RENEW: u32 = 30;

    /// The request is to validate a postdated ticket.
    pub const VALIDATE: u32 = 31;

    /// Creates flags from their bits.
    pub fn from_bits(bits: u32) -> Self {
        KerberosFlags(bits)
    }

    /// Returns the bits of the flags.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns whether the given flag is set.
    ///
    /// Flags beyond 31 are never set.
    pub fn is_set(self, flag: u32) -> bool {
        flag < 32 && self.0 & (0x8000_0000 >> flag) != 0
    }

    /// Returns the flags with the given flag set.
    pub fn with(self, flag: u32) -> Self {
        if flag < 32 {
            KerberosFlags(self.0 | (0x8000_0000 >> flag))
        }
        else {
            self
        }
    }
}

impl PrimitiveContent for KerberosFlags {
    const TAG: Tag = Tag::BIT_STRING;

    fn encoded_len(self) -> usize {
        5
    }

    fn write_encoded<T: Target>(self, target: &mut T) {
        // No unused bits in the final octet.
        target.append_u8(0);
        target.append_slice(&self.0.to_be_bytes())
    }
}

impl fmt::Debug for KerberosFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KerberosFlags(0x{:08x})", self.0)
    }
}


//============ Tests =========================================================
