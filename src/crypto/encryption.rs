//! AES-GCM authenticated encryption with associated data.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `open` splits the nonce back out
//! before decrypting.  The AES variant (128/192/256) is picked from the
//! key length.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{self, Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};

use crate::errors::{EnvxError, Result};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Associated data used where nothing is bound (key wrapping).
pub const NO_AAD: &[u8] = &[];

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Encrypt `plaintext` under `key`, binding `aad` to the output.
///
/// `key` must be 16, 24, or 32 bytes.  Returns nonce || ciphertext.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => seal_with::<Aes128Gcm>(key, plaintext, aad),
        24 => seal_with::<Aes192Gcm>(key, plaintext, aad),
        32 => seal_with::<Aes256Gcm>(key, plaintext, aad),
        n => Err(EnvxError::InvalidKeySize(n)),
    }
}

/// Decrypt data that was produced by `seal` with the same `key` and `aad`.
///
/// Fails with `CiphertextTooShort` when there is not even a nonce, and
/// with `AuthenticationFailed` when the tag does not verify.  No partial
/// plaintext is ever returned.
pub fn open(key: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => open_with::<Aes128Gcm>(key, sealed, aad),
        24 => open_with::<Aes192Gcm>(key, sealed, aad),
        32 => open_with::<Aes256Gcm>(key, sealed, aad),
        n => Err(EnvxError::InvalidKeySize(n)),
    }
}

fn seal_with<C>(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).map_err(|_| EnvxError::InvalidKeySize(key.len()))?;

    let nonce = C::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| EnvxError::EncryptionFailed(format!("encryption error: {e}")))?;

    // Prepend the nonce so the caller only needs to store one blob.
    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn open_with<C>(key: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).map_err(|_| EnvxError::InvalidKeySize(key.len()))?;

    if sealed.len() < NONCE_LEN {
        return Err(EnvxError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = aead::Nonce::<C>::from_slice(nonce_bytes);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| EnvxError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip_all_key_sizes() {
        for len in [16usize, 24, 32] {
            let key = vec![0x5Au8; len];
            let sealed = seal(&key, b"hello", b"ctx").unwrap();
            assert_eq!(open(&key, &sealed, b"ctx").unwrap(), b"hello");
        }
    }

    #[test]
    fn sealed_output_carries_nonce_and_tag() {
        let key = [0u8; 32];
        let sealed = seal(&key, b"abc", NO_AAD).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 3 + 16);
    }

    #[test]
    fn invalid_key_size_is_rejected() {
        let err = seal(&[0u8; 15], b"x", NO_AAD).unwrap_err();
        assert!(matches!(err, EnvxError::InvalidKeySize(15)));

        let err = open(&[0u8; 33], &[0u8; 40], NO_AAD).unwrap_err();
        assert!(matches!(err, EnvxError::InvalidKeySize(33)));
    }

    #[test]
    fn short_input_is_distinguished_from_bad_tag() {
        let key = [1u8; 32];
        let err = open(&key, b"short", NO_AAD).unwrap_err();
        assert!(matches!(err, EnvxError::CiphertextTooShort));

        let err = open(&key, &[0u8; NONCE_LEN + 16], NO_AAD).unwrap_err();
        assert!(matches!(err, EnvxError::AuthenticationFailed));
    }

    #[test]
    fn nonce_only_input_fails_authentication() {
        let key = [1u8; 32];
        let err = open(&key, &[0u8; NONCE_LEN], NO_AAD).unwrap_err();
        assert!(matches!(err, EnvxError::AuthenticationFailed));
    }

    #[test]
    fn wrong_aad_fails() {
        let key = [7u8; 32];
        let sealed = seal(&key, b"secret", b"context").unwrap();
        let err = open(&key, &sealed, b"wrong-context").unwrap_err();
        assert!(matches!(err, EnvxError::AuthenticationFailed));
    }

    #[test]
    fn tampered_nonce_fails() {
        let key = [7u8; 32];
        let mut sealed = seal(&key, b"secret", NO_AAD).unwrap();
        sealed[0] ^= 0xFF;
        assert!(open(&key, &sealed, NO_AAD).is_err());
    }
}
