//! Tagged results for the `envx:` and `envelope:` string formats.
//!
//! Callers need to tell three cases apart: the string is not ours at all
//! (treat it as plaintext), it is ours but broken, or it parsed.

use crate::errors::{EnvxError, Result};

/// Outcome of recognising one of our string formats.
#[derive(Debug)]
pub enum Parsed<T> {
    /// The input does not carry this format's prefix.
    NotThisFormat,
    /// The prefix matched but the rest did not.
    Malformed(EnvxError),
    /// The input parsed cleanly.
    Valid(T),
}

impl<T> Parsed<T> {
    /// Collapse into a `Result`, using `foreign` for `NotThisFormat`.
    pub fn into_result(self, foreign: impl FnOnce() -> EnvxError) -> Result<T> {
        match self {
            Parsed::NotThisFormat => Err(foreign()),
            Parsed::Malformed(err) => Err(err),
            Parsed::Valid(value) => Ok(value),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Parsed::Valid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_result_maps_each_case() {
        let foreign: Parsed<u8> = Parsed::NotThisFormat;
        assert!(matches!(
            foreign.into_result(|| EnvxError::NotAnEncryptedValue),
            Err(EnvxError::NotAnEncryptedValue)
        ));

        let broken: Parsed<u8> = Parsed::Malformed(EnvxError::InvalidFormat("x".into()));
        assert!(matches!(
            broken.into_result(|| EnvxError::NotAnEncryptedValue),
            Err(EnvxError::InvalidFormat(_))
        ));

        let ok = Parsed::Valid(3u8);
        assert!(ok.is_valid());
        assert_eq!(ok.into_result(|| EnvxError::NotAnEncryptedValue).unwrap(), 3);
    }
}
