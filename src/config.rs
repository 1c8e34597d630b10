//! Configuration of decoders.

use crate::mode::Mode;


//------------ DecoderConfig -------------------------------------------------

/// The configuration of a decoder.
///
/// With the `serde` feature enabled, the configuration can be deserialized
/// as part of a server’s configuration file. Missing fields take their
/// default values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct DecoderConfig {
    /// The encoding rules to enforce.
    pub mode: Mode,

    /// The largest declared length of any single value.
    ///
    /// A value announcing more content than this is rejected as soon as its
    /// header has been read.
    pub max_length: usize,
}

impl DecoderConfig {
    /// The default for the maximum length: one mebibyte.
    pub const DEFAULT_MAX_LENGTH: usize = 1 << 20;

    /// Creates a configuration for the given mode with default limits.
    pub fn new(mode: Mode) -> Self {
        DecoderConfig { mode, max_length: Self::DEFAULT_MAX_LENGTH }
    }

    /// Returns the configuration with a different maximum length.
    pub fn with_max_length(self, max_length: usize) -> Self {
        DecoderConfig { max_length, ..self }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::new(Mode::Ber)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.mode, Mode::Ber);
        assert_eq!(config.max_length, 1 << 20);
        assert_eq!(
            DecoderConfig::new(Mode::Der).with_max_length(10),
            DecoderConfig { mode: Mode::Der, max_length: 10 }
        );
    }
}
