//! The key hierarchy: identity → master key → per-secret data keys.
//!
//! The master key is derived once from a long-term identity with
//! HMAC-SHA256 keyed by the identity's serialized private form.  Each
//! encryption then uses a freshly generated data encryption key (DEK)
//! which is itself sealed under the master key.

use std::sync::OnceLock;

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::encryption::{open, seal};
use crate::errors::{EnvxError, Result};

/// Length of the master key and of every DEK (256 bits).
pub const KEY_LEN: usize = 32;

/// Domain separation string mixed into master key derivation.
const MASTER_KEY_DOMAIN: &[u8] = b"envx-master-key-derivation";

/// The capability the key hierarchy needs from an asymmetric identity.
///
/// The core never performs key exchange itself; it only needs a stable
/// secret serialization to derive from, and a public recipient string
/// to show to users.
pub trait Identity: Send + Sync {
    /// The serialized private form of this identity.
    fn secret_string(&self) -> Zeroizing<String>;

    /// The public recipient string derived from this identity.
    fn recipient(&self) -> String;
}

/// A 32-byte master key that is zeroed when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Seal a DEK under this master key (no associated data).
    pub fn wrap_dek(&self, dek: &DataEncryptionKey) -> Result<Vec<u8>> {
        seal(&self.bytes, dek.as_bytes(), &[])
    }

    /// Recover a DEK sealed by `wrap_dek`.
    pub fn unwrap_dek(&self, wrapped: &[u8]) -> Result<DataEncryptionKey> {
        let bytes = Zeroizing::new(open(&self.bytes, wrapped, &[])?);
        DataEncryptionKey::from_slice(&bytes)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// Derive the master key for `identity`.
///
/// Same identity, same key.  Fails with `KeyUnavailable` when no
/// identity is supplied.
pub fn derive_master_key(identity: Option<&dyn Identity>) -> Result<MasterKey> {
    let identity = identity.ok_or(EnvxError::KeyUnavailable)?;
    let secret = identity.secret_string();

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| EnvxError::IdentityError(format!("HMAC init failed: {e}")))?;
    mac.update(MASTER_KEY_DOMAIN);
    let mut digest = mac.finalize().into_bytes();

    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&digest[..KEY_LEN]);
    let key = MasterKey::new(bytes);
    bytes.zeroize();
    digest.as_mut_slice().zeroize();
    Ok(key)
}

/// A single-use data encryption key, zeroed when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DataEncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl DataEncryptionKey {
    /// Generate 32 fresh random bytes from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Rebuild a DEK from unwrapped bytes; anything but 32 bytes is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            EnvxError::DecryptionFailed(format!(
                "unwrapped data key has {} bytes, expected {KEY_LEN}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Seal `plaintext` bound to the secret `name`.
    pub fn seal(&self, plaintext: &[u8], name: &str) -> Result<Vec<u8>> {
        seal(&self.bytes, plaintext, name.as_bytes())
    }

    /// Open a ciphertext that was sealed for the secret `name`.
    pub fn open(&self, ciphertext: &[u8], name: &str) -> Result<Vec<u8>> {
        open(&self.bytes, ciphertext, name.as_bytes())
    }
}

/// Holds a workspace identity and hands out its master key.
///
/// The key is derived on first access and cached for the lifetime of
/// the strategy; it is never written anywhere.
pub struct KeyStrategy {
    identity: Option<Box<dyn Identity>>,
    master_key: OnceLock<MasterKey>,
}

impl KeyStrategy {
    pub fn new(identity: Option<Box<dyn Identity>>) -> Self {
        Self {
            identity,
            master_key: OnceLock::new(),
        }
    }

    /// Public recipient of the held identity, if any.
    pub fn recipient(&self) -> Option<String> {
        self.identity.as_ref().map(|id| id.recipient())
    }

    /// The master key, derived on first call.
    pub fn master_key(&self) -> Result<&MasterKey> {
        if let Some(key) = self.master_key.get() {
            return Ok(key);
        }
        let key = derive_master_key(self.identity.as_deref())?;
        // A racing caller may have won; both derived the same bytes.
        Ok(self.master_key.get_or_init(|| key))
    }
}
