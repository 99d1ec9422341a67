//! Per-secret envelope encryption and the `envx:` value format.
//!
//! A value is encrypted under a fresh data key which is then sealed
//! under the master key:
//!
//! ```text
//! envx:<base64 wrapped DEK>:<base64 ciphertext>
//! ```
//!
//! The ciphertext binds the secret's name as associated data, so a value
//! copied from one variable to another no longer decrypts.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use super::keys::{DataEncryptionKey, MasterKey};
use crate::errors::{EnvxError, Result};
use crate::format::Parsed;

/// Literal prefix of every encrypted value.
pub const VALUE_PREFIX: &str = "envx:";

/// An encrypted secret as stored in a file: both halves base64-encoded.
///
/// Parsing is structural only; base64 is checked when decrypting, so an
/// empty segment parses fine and then fails to decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    pub wrapped_dek: String,
    pub ciphertext: String,
}

impl EncryptedValue {
    /// Recognise an `envx:` value without failing on foreign strings.
    pub fn detect(s: &str) -> Parsed<Self> {
        let Some(rest) = s.strip_prefix(VALUE_PREFIX) else {
            return Parsed::NotThisFormat;
        };

        let Some((wrapped_dek, ciphertext)) = rest.split_once(':') else {
            return Parsed::Malformed(EnvxError::MalformedValue(
                "missing ':' between wrapped key and ciphertext".into(),
            ));
        };

        if ciphertext.contains(':') {
            return Parsed::Malformed(EnvxError::MalformedValue(
                "too many ':' separators".into(),
            ));
        }

        Parsed::Valid(Self {
            wrapped_dek: wrapped_dek.to_string(),
            ciphertext: ciphertext.to_string(),
        })
    }

    /// Parse an `envx:` value.  Anything that is not exactly that shape is
    /// `NotAnEncryptedValue`, never a decryption error.
    pub fn parse(s: &str) -> Result<Self> {
        match Self::detect(s) {
            Parsed::Valid(value) => Ok(value),
            Parsed::NotThisFormat | Parsed::Malformed(_) => Err(EnvxError::NotAnEncryptedValue),
        }
    }
}

impl fmt::Display for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{VALUE_PREFIX}{}:{}", self.wrapped_dek, self.ciphertext)
    }
}

impl FromStr for EncryptedValue {
    type Err = EnvxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whether `s` should be decrypted rather than used as plaintext.
pub fn is_encrypted(s: &str) -> bool {
    EncryptedValue::detect(s).is_valid()
}

/// Encrypt `plaintext` for the secret `name`.
///
/// Every call draws a new DEK and new nonces, so encrypting the same
/// input twice never yields the same output.
pub fn encrypt(master_key: &MasterKey, plaintext: &[u8], name: &str) -> Result<EncryptedValue> {
    let dek = DataEncryptionKey::generate();

    let ciphertext = dek.seal(plaintext, name)?;
    let wrapped_dek = master_key.wrap_dek(&dek)?;

    Ok(EncryptedValue {
        wrapped_dek: BASE64.encode(wrapped_dek),
        ciphertext: BASE64.encode(ciphertext),
    })
}

/// Decrypt `value`, which must have been encrypted for the same `name`.
pub fn decrypt(master_key: &MasterKey, value: &EncryptedValue, name: &str) -> Result<Vec<u8>> {
    let wrapped_dek = BASE64
        .decode(&value.wrapped_dek)
        .map_err(|e| EnvxError::MalformedValue(format!("wrapped key: {e}")))?;
    let ciphertext = BASE64
        .decode(&value.ciphertext)
        .map_err(|e| EnvxError::MalformedValue(format!("ciphertext: {e}")))?;

    let dek = master_key
        .unwrap_dek(&wrapped_dek)
        .map_err(|e| EnvxError::DecryptionFailed(format!("unwrap data key: {e}")))?;

    dek.open(&ciphertext, name)
        .map_err(|e| EnvxError::DecryptionFailed(format!("open '{name}': {e}")))
}

/// Decrypt `raw` if it is an `envx:` value, otherwise return it unchanged.
///
/// A string that carries the prefix but is malformed is an error rather
/// than being passed through.
pub fn reveal(master_key: &MasterKey, raw: &str, name: &str) -> Result<Zeroizing<String>> {
    match EncryptedValue::detect(raw) {
        Parsed::NotThisFormat => Ok(Zeroizing::new(raw.to_string())),
        Parsed::Malformed(err) => Err(err),
        Parsed::Valid(value) => {
            let bytes = decrypt(master_key, &value, name)?;
            let text = String::from_utf8(bytes).map_err(|_| {
                EnvxError::MalformedValue(format!("decrypted '{name}' is not valid UTF-8"))
            })?;
            Ok(Zeroizing::new(text))
        }
    }
}
