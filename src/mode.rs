//! The encoding rules used when decoding.

/// The BER encoding rules to enforce.
///
/// Protocol peers are supposed to send DER but many don’t bother with
/// minimal length encodings. The mode decides how picky the decoder is.
/// Indefinite length values are rejected in either mode.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Basic Encoding Rules.
    ///
    /// Length octets may use more octets than necessary.
    #[default]
    Ber,

    /// Distinguished Encoding Rules.
    ///
    /// Definite lengths must be encoded in the minimum number of octets.
    Der,
}

impl Mode {
    /// Returns whether this mode requires minimal encodings.
    pub fn is_restricted(self) -> bool {
        matches!(self, Mode::Der)
    }
}
