//! Self-contained, time-boxed secret bundles for automated agents.
//!
//! An agent envelope carries a scoped subset of secrets encrypted under a
//! random session key.  The session key is sealed under a key derived
//! from an `unwrap_secret` that travels inside the bundle, so the bundle
//! decrypts without any long-term key.  Possession is access: the only
//! limits are `expires_at` and the size of `scope`.
//!
//! ```text
//! wrap_key            = SHA-256(unwrap_secret || "envx-envelope-v1")
//! wrapped_session_key = AEAD(wrap_key, session_key, aad = none)
//! encrypted_secrets[n] = AEAD(session_key, value, aad = n)
//! ```
//!
//! Expiry is only observed on access; nothing revokes a bundle early.

mod wire;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::encryption::{open, seal, NO_AAD};
use crate::errors::{EnvxError, Result};

pub use wire::{TOKEN_PREFIX, TOKEN_VERSION};

/// Info string hashed together with the unwrap secret.
const WRAP_KEY_INFO: &[u8] = b"envx-envelope-v1";

/// Length of the embedded unwrap secret.
pub const UNWRAP_SECRET_LEN: usize = 16;

/// Length of the ephemeral session key.
pub const SESSION_KEY_LEN: usize = 32;

/// A sealed, scoped bundle of secrets.  Immutable once created.
#[derive(Clone, PartialEq, Eq)]
pub struct AgentEnvelope {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub scope: Vec<String>,
    pub unwrap_secret: Vec<u8>,
    pub wrapped_session_key: Vec<u8>,
    pub encrypted_secrets: BTreeMap<String, Vec<u8>>,
}

/// Lifecycle state of an envelope at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Valid,
    Expired,
}

impl EnvelopeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeStatus::Valid => "valid",
            EnvelopeStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only metadata about an envelope.  Computing it decrypts nothing.
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub scope: Vec<String>,
    pub status: EnvelopeStatus,
    pub keys_included: usize,
}

impl AgentEnvelope {
    /// Seal the `scope` subset of `secrets` into a new envelope valid for `ttl`.
    ///
    /// A negative `ttl` yields an envelope that is already expired.
    pub fn create(secrets: &HashMap<String, String>, scope: &[String], ttl: Duration) -> Result<Self> {
        if secrets.is_empty() {
            return Err(EnvxError::EmptySecrets);
        }
        if scope.is_empty() {
            return Err(EnvxError::EmptyScope);
        }
        if let Some(missing) = scope.iter().find(|name| !secrets.contains_key(*name)) {
            return Err(EnvxError::ScopeKeyMissing(missing.clone()));
        }

        let mut session_key = Zeroizing::new([0u8; SESSION_KEY_LEN]);
        rand::rng().fill_bytes(session_key.as_mut_slice());

        let mut unwrap_secret = vec![0u8; UNWRAP_SECRET_LEN];
        rand::rng().fill_bytes(&mut unwrap_secret);

        let wrap_key = derive_wrap_key(&unwrap_secret);
        let wrapped_session_key = seal(wrap_key.as_slice(), session_key.as_slice(), NO_AAD)?;

        let mut encrypted_secrets = BTreeMap::new();
        for name in scope {
            let plaintext = &secrets[name];
            let ciphertext = seal(session_key.as_slice(), plaintext.as_bytes(), name.as_bytes())?;
            encrypted_secrets.insert(name.clone(), ciphertext);
        }

        // Whole seconds, so the serialized token carries the exact instants.
        let created_at = Utc::now().trunc_subsecs(0);
        let expires_at = created_at
            .checked_add_signed(ttl)
            .ok_or_else(|| EnvxError::InvalidFormat(format!("ttl {ttl} is out of range")))?;

        Ok(Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            created_at,
            expires_at,
            scope: scope.to_vec(),
            unwrap_secret,
            wrapped_session_key,
            encrypted_secrets,
        })
    }

    /// Whether the envelope is expired at `now`.  The expiry instant itself
    /// already counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> EnvelopeStatus {
        if self.is_expired_at(now) {
            EnvelopeStatus::Expired
        } else {
            EnvelopeStatus::Valid
        }
    }

    /// Decrypt every included secret.
    pub fn unwrap(&self) -> Result<HashMap<String, String>> {
        self.unwrap_at(Utc::now())
    }

    /// Decrypt every included secret as of `now`.
    ///
    /// Expiry is checked before any cryptography.  One bad entry fails the
    /// whole unwrap.
    pub fn unwrap_at(&self, now: DateTime<Utc>) -> Result<HashMap<String, String>> {
        if self.is_expired_at(now) {
            return Err(EnvxError::Expired(self.expires_at));
        }

        let wrap_key = derive_wrap_key(&self.unwrap_secret);
        let session_key = Zeroizing::new(
            open(wrap_key.as_slice(), &self.wrapped_session_key, NO_AAD)
                .map_err(|e| EnvxError::DecryptionFailed(format!("session key: {e}")))?,
        );

        let mut secrets = HashMap::with_capacity(self.encrypted_secrets.len());
        for (name, ciphertext) in &self.encrypted_secrets {
            let plaintext = open(&session_key, ciphertext, name.as_bytes())
                .map_err(|e| EnvxError::DecryptionFailed(format!("'{name}': {e}")))?;
            let value = String::from_utf8(plaintext).map_err(|_| {
                EnvxError::DecryptionFailed(format!("'{name}' is not valid UTF-8"))
            })?;
            secrets.insert(name.clone(), value);
        }

        Ok(secrets)
    }

    /// Metadata view; safe to show to callers who must not see values.
    pub fn inspect(&self) -> EnvelopeInfo {
        self.inspect_at(Utc::now())
    }

    pub fn inspect_at(&self, now: DateTime<Utc>) -> EnvelopeInfo {
        EnvelopeInfo {
            session_id: self.session_id.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            scope: self.scope.clone(),
            status: self.status_at(now),
            keys_included: self.encrypted_secrets.len(),
        }
    }
}

// Keep the unwrap secret and ciphertexts out of debug output.
impl fmt::Debug for AgentEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEnvelope")
            .field("session_id", &self.session_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("keys_included", &self.encrypted_secrets.len())
            .finish_non_exhaustive()
    }
}

/// Parse a token and return its metadata without decrypting anything.
pub fn inspect_token(token: &str) -> Result<EnvelopeInfo> {
    Ok(AgentEnvelope::parse(token)?.inspect())
}

fn derive_wrap_key(unwrap_secret: &[u8]) -> Zeroizing<[u8; SESSION_KEY_LEN]> {
    let mut hasher = Sha256::new();
    hasher.update(unwrap_secret);
    hasher.update(WRAP_KEY_INFO);
    Zeroizing::new(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn scope(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_only_encrypts_scoped_keys() {
        let env = AgentEnvelope::create(
            &secrets(&[("A", "1"), ("B", "2")]),
            &scope(&["A"]),
            Duration::hours(1),
        )
        .unwrap();

        assert_eq!(env.encrypted_secrets.len(), 1);
        assert!(env.encrypted_secrets.contains_key("A"));
        assert_eq!(env.unwrap_secret.len(), UNWRAP_SECRET_LEN);
        assert_eq!(env.expires_at - env.created_at, Duration::hours(1));
        assert!(uuid::Uuid::parse_str(&env.session_id).is_ok());
    }

    #[test]
    fn precondition_errors() {
        let one = secrets(&[("A", "1")]);
        assert!(matches!(
            AgentEnvelope::create(&HashMap::new(), &scope(&["A"]), Duration::hours(1)),
            Err(EnvxError::EmptySecrets)
        ));
        assert!(matches!(
            AgentEnvelope::create(&one, &[], Duration::hours(1)),
            Err(EnvxError::EmptyScope)
        ));
        match AgentEnvelope::create(&one, &scope(&["B"]), Duration::hours(1)) {
            Err(EnvxError::ScopeKeyMissing(name)) => assert_eq!(name, "B"),
            other => panic!("expected ScopeKeyMissing, got {other:?}"),
        }
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let env =
            AgentEnvelope::create(&secrets(&[("A", "1")]), &scope(&["A"]), Duration::minutes(5))
                .unwrap();

        let before = env.expires_at - Duration::seconds(1);
        assert_eq!(env.status_at(before), EnvelopeStatus::Valid);
        assert!(env.unwrap_at(before).is_ok());

        assert_eq!(env.status_at(env.expires_at), EnvelopeStatus::Expired);
        assert!(matches!(
            env.unwrap_at(env.expires_at),
            Err(EnvxError::Expired(_))
        ));
    }

    #[test]
    fn tampered_secret_fails_whole_unwrap() {
        let mut env = AgentEnvelope::create(
            &secrets(&[("A", "1"), ("B", "2")]),
            &scope(&["A", "B"]),
            Duration::hours(1),
        )
        .unwrap();
        if let Some(ct) = env.encrypted_secrets.get_mut("B") {
            let last = ct.len() - 1;
            ct[last] ^= 0x01;
        }
        assert!(matches!(env.unwrap(), Err(EnvxError::DecryptionFailed(_))));
    }

    #[test]
    fn swapped_entries_fail_name_binding() {
        let mut env = AgentEnvelope::create(
            &secrets(&[("A", "1"), ("B", "2")]),
            &scope(&["A", "B"]),
            Duration::hours(1),
        )
        .unwrap();
        let a = env.encrypted_secrets.remove("A").unwrap();
        let b = env.encrypted_secrets.remove("B").unwrap();
        env.encrypted_secrets.insert("A".into(), b);
        env.encrypted_secrets.insert("B".into(), a);
        assert!(env.unwrap().is_err());
    }

    #[test]
    fn wrong_unwrap_secret_fails() {
        let mut env =
            AgentEnvelope::create(&secrets(&[("A", "1")]), &scope(&["A"]), Duration::hours(1))
                .unwrap();
        env.unwrap_secret[0] ^= 0xFF;
        assert!(matches!(env.unwrap(), Err(EnvxError::DecryptionFailed(_))));
    }

    #[test]
    fn debug_output_hides_key_material() {
        let env =
            AgentEnvelope::create(&secrets(&[("A", "1")]), &scope(&["A"]), Duration::hours(1))
                .unwrap();
        let dbg = format!("{env:?}");
        assert!(dbg.contains(&env.session_id));
        assert!(!dbg.contains("unwrap_secret"));
    }

    #[test]
    fn wrap_key_is_deterministic_per_secret() {
        let a = derive_wrap_key(b"0123456789abcdef");
        let b = derive_wrap_key(b"0123456789abcdef");
        let c = derive_wrap_key(b"fedcba9876543210");
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }
}
